mod cli;

use std::fs;
use std::io::{self, Write};

use clap::Parser;
use cli::{Cli, Command};

fn main() -> io::Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::Pack { source, output } => {
            println!("source={source:?}\noutput={output:?}");
            let image = initrd_packer::pack_dir(&source)?;
            fs::write(&output, &image)?;
            log::info!("wrote {} bytes", image.len());
        }
        Command::List { image } => {
            let image = fs::read(image)?;
            for (name, stat) in initrd_packer::list(&image)? {
                println!(
                    "{:>6} {:?} {:o} {:>10} {name}",
                    stat.inode,
                    stat.mode,
                    stat.permission.bits(),
                    stat.size
                );
            }
        }
        Command::Cat { image, name } => {
            let image = fs::read(image)?;
            let data = initrd_packer::cat(&image, &name)?;
            io::stdout().write_all(&data)?;
        }
    }

    Ok(())
}
