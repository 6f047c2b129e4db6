//! # 节点能力
//!
//! 目录树层只通过 [`FsNode`] 与具体文件系统交互。
//! 目录节点提供 `readdir`/`finddir`，文件节点提供 `read`/`write`，
//! 一个节点不会同时提供两组能力。

use alloc::sync::Arc;

use enumflags2::{BitFlags, bitflags};

use crate::{DirEntry, Error, Stat};

#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Read = 0b0001,
    Write = 0b0010,
    ReadDir = 0b0100,
    FindDir = 0b1000,
}

impl Capability {
    #[inline]
    pub fn file() -> BitFlags<Capability> {
        Capability::Read | Capability::Write
    }

    #[inline]
    pub fn directory() -> BitFlags<Capability> {
        Capability::ReadDir | Capability::FindDir
    }
}

pub trait FsNode: Send + Sync {
    fn id(&self) -> u64;

    fn capabilities(&self) -> BitFlags<Capability>;

    fn stat(&self) -> Result<Stat, Error>;

    /// 从`offset`开始读满`buf`，越过文件末尾的部分被截去
    #[allow(unused_variables)]
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<usize, Error> {
        Err(Error::Unsupported)
    }

    /// 覆写已有的数据，不会改变文件长度
    #[allow(unused_variables)]
    fn write(&self, offset: usize, buf: &[u8]) -> Result<usize, Error> {
        Err(Error::Unsupported)
    }

    /// 第`index`个目录项
    #[allow(unused_variables)]
    fn readdir(&self, index: usize) -> Result<DirEntry, Error> {
        Err(Error::Unsupported)
    }

    #[allow(unused_variables)]
    fn finddir(&self, name: &str) -> Result<Arc<dyn FsNode>, Error> {
        Err(Error::Unsupported)
    }
}
