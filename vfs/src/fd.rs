//! # 文件描述符层
//!
//! 表中的描述符表示带有特定读写属性的I/O资源。
//! 文件系统在自举时通过 [`DescriptorTable`] 登记三个标准流。

use alloc::sync::Arc;
use alloc::vec::Vec;

use enumflags2::{BitFlags, bitflags};

use crate::{Error, FsNode};

#[bitflags]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read = 0b01,
    Write = 0b10,
}

pub trait DescriptorTable {
    /// 打开节点并返回描述符
    fn open(&mut self, node: Arc<dyn FsNode>, access: BitFlags<Access>) -> Result<usize, Error>;
}

/// 容量固定的描述符表，描述符取最小的空位
pub struct FdTable {
    slots: Vec<Option<OpenFile>>,
    capacity: usize,
}

pub struct OpenFile {
    pub node: Arc<dyn FsNode>,
    pub access: BitFlags<Access>,
}

impl FdTable {
    #[inline]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            capacity,
        }
    }

    #[inline]
    pub fn get(&self, fd: usize) -> Option<&OpenFile> {
        self.slots.get(fd).and_then(Option::as_ref)
    }

    pub fn close(&mut self, fd: usize) -> Option<OpenFile> {
        self.slots.get_mut(fd).and_then(Option::take)
    }

    /// 已打开的描述符个数
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DescriptorTable for FdTable {
    fn open(&mut self, node: Arc<dyn FsNode>, access: BitFlags<Access>) -> Result<usize, Error> {
        let file = Some(OpenFile { node, access });

        if let Some(fd) = self.slots.iter().position(Option::is_none) {
            self.slots[fd] = file;
            return Ok(fd);
        }

        if self.slots.len() == self.capacity {
            return Err(Error::NoSpace);
        }

        self.slots.push(file);
        Ok(self.slots.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Capability, Stat};

    struct Null;

    impl FsNode for Null {
        fn id(&self) -> u64 {
            0
        }

        fn capabilities(&self) -> BitFlags<Capability> {
            BitFlags::empty()
        }

        fn stat(&self) -> Result<Stat, Error> {
            Err(Error::Unsupported)
        }
    }

    #[test]
    fn lowest_free_slot() {
        let mut fds = FdTable::new(2);
        assert_eq!(fds.open(Arc::new(Null), Access::Read.into()), Ok(0));
        assert_eq!(fds.open(Arc::new(Null), Access::Write.into()), Ok(1));
        assert_eq!(
            fds.open(Arc::new(Null), BitFlags::all()),
            Err(Error::NoSpace)
        );

        assert!(fds.close(0).is_some());
        assert!(fds.close(0).is_none());
        assert_eq!(fds.len(), 1);
        assert_eq!(fds.open(Arc::new(Null), BitFlags::all()), Ok(0));
        assert_eq!(fds.get(0).map(|file| file.access), Some(BitFlags::all()));
    }
}
