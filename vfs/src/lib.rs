#![no_std]

extern crate alloc;

mod dirent;
mod error;
mod fd;
mod node;
mod stat;

pub use self::{
    dirent::{DirEntry, DirEntryType},
    error::Error,
    fd::{Access, DescriptorTable, FdTable},
    node::{Capability, FsNode},
    stat::{Permission, Stat},
};
