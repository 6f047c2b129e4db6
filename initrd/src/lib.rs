#![no_std]

extern crate alloc;

/* initrd 的整体架构，自上而下 */

// 节点句柄层：向目录树层暴露读写与目录查找能力
mod node;

// 文件系统层：节点表、目录树的搭建以及自举
mod fs;

// 目录项遍历
mod dir;

// 内存数据结构层：归档、索引节点与目录项的布局
pub mod layout;

// 块存储层：数据块与索引块的分配
mod block;

mod config;
mod error;

pub use self::{
    block::{BlockArena, BlockRef},
    config::Config,
    dir::DirEntries,
    error::BootstrapError,
    fs::Initrd,
    layout::{Archive, DirEntry, FileNode, InodeId, NodeKind, block_size_at_index},
    node::Inode,
};

use vfs::DescriptorTable;

pub const BLOCK_SIZE: usize = 1024;

pub type DataBlock = [u8; BLOCK_SIZE];

/// 加载归档、登记标准流，返回挂载点
pub fn init(
    archive: &[u8],
    config: Config,
    fds: &mut dyn DescriptorTable,
) -> Result<Inode, BootstrapError> {
    Initrd::load(archive, config)?.mount(fds)
}
