use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Pack every regular file of a directory into a ramdisk image
    Pack {
        /// Source directory
        #[arg(long, short)]
        source: PathBuf,

        /// Output image
        #[arg(long, short)]
        output: PathBuf,
    },

    /// List the mount directory of an image
    List {
        #[arg(long, short)]
        image: PathBuf,
    },

    /// Print a file of an image to stdout
    Cat {
        #[arg(long, short)]
        image: PathBuf,

        name: String,
    },
}
