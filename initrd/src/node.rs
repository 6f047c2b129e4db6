//! # 节点句柄层
//!
//! [`Inode`] 是对文件系统中某个节点的共享引用，
//! 通过 [`FsNode`] 向目录树层暴露读写与目录查找能力。
//! 所有句柄共用一把锁。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use enumflags2::BitFlags;
use spin::Mutex;
use vfs::{Capability, DirEntry, Error, FsNode, Stat};

use crate::{Initrd, InodeId};

#[derive(Clone)]
pub struct Inode {
    id: InodeId,
    fs: Arc<Mutex<Initrd>>,
}

impl Inode {
    #[inline]
    pub fn new(id: InodeId, fs: Arc<Mutex<Initrd>>) -> Self {
        Self { id, fs }
    }

    #[inline]
    pub fn inode_id(&self) -> InodeId {
        self.id
    }

    /// 同一文件系统中的另一个节点
    #[inline]
    pub fn sibling(&self, id: InodeId) -> Self {
        Self::new(id, self.fs.clone())
    }

    /// 在锁内访问整个文件系统
    pub fn with_fs<V>(&self, f: impl FnOnce(&mut Initrd) -> V) -> V {
        f(&mut self.fs.lock())
    }

    /// 按名字查找子节点
    pub fn find(&self, name: &str) -> Result<Self, Error> {
        let id = self.fs.lock().find_by_name(self.id, name)?;
        Ok(self.sibling(id))
    }

    /// 列出目录下所有非空槽目录项的名字
    pub fn ls(&self) -> Result<Vec<String>, Error> {
        let fs = self.fs.lock();
        let mut names = Vec::new();
        for dirent in fs.entries(self.id)? {
            let dirent = dirent?;
            if !dirent.is_vacant() {
                names.push(String::from(dirent.name()));
            }
        }
        Ok(names)
    }

    /// 读出文件的全部内容
    pub fn read_all(&self) -> Result<Vec<u8>, Error> {
        let fs = self.fs.lock();
        let length = fs.node(self.id)?.length as usize;
        let mut buf = vec![0; length];
        let read = fs.read(self.id, 0, &mut buf)?;
        buf.truncate(read);
        Ok(buf)
    }

    /// 节点不存在时返回 [`Error::NotFound`]，缺少能力时返回 [`Error::Unsupported`]
    fn require(&self, capability: Capability) -> Result<(), Error> {
        let capabilities = self.fs.lock().node(self.id)?.capabilities();
        if capabilities.contains(capability) {
            Ok(())
        } else {
            Err(Error::Unsupported)
        }
    }
}

impl FsNode for Inode {
    #[inline]
    fn id(&self) -> u64 {
        u32::from(self.id).into()
    }

    fn capabilities(&self) -> BitFlags<Capability> {
        self.fs
            .lock()
            .node(self.id)
            .map(|node| node.capabilities())
            .unwrap_or_default()
    }

    fn stat(&self) -> Result<Stat, Error> {
        self.fs.lock().stat(self.id)
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<usize, Error> {
        self.require(Capability::Read)?;
        self.fs.lock().read(self.id, offset, buf)
    }

    fn write(&self, offset: usize, buf: &[u8]) -> Result<usize, Error> {
        self.require(Capability::Write)?;
        self.fs.lock().write(self.id, offset, buf)
    }

    fn readdir(&self, index: usize) -> Result<DirEntry, Error> {
        self.require(Capability::ReadDir)?;
        let dirent = self.fs.lock().read_entry_at(self.id, index)?;
        Ok(dirent.into())
    }

    fn finddir(&self, name: &str) -> Result<Arc<dyn FsNode>, Error> {
        self.require(Capability::FindDir)?;
        Ok(Arc::new(self.find(name)?))
    }
}

impl core::fmt::Debug for Inode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Inode").field("id", &self.id).finish()
    }
}
