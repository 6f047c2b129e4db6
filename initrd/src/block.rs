//! # 块存储层
//!
//! 节点的数据块与索引块都存放在 [`BlockArena`] 中，通过 [`BlockRef`] 访问，
//! 每次访问都会检查编号的有效性。块在分配时清零，之后不再释放。
//!
//! 索引块连续存储小端序的**块编号**，编号`0`表示空槽。

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::num::NonZeroU32;

use vfs::Error;

use crate::{BLOCK_SIZE, DataBlock};

/// 索引块的编号容量
pub const INDIRECT_COUNT: usize = BLOCK_SIZE / BlockRef::SIZE;

/// 块编号，从1开始
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct BlockRef(NonZeroU32);

impl BlockRef {
    /// 编号在索引块中占用的字节数
    pub const SIZE: usize = 4;

    #[inline]
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0.get()
    }

    #[inline]
    fn position(self) -> usize {
        self.raw() as usize - 1
    }
}

#[derive(Debug)]
pub struct BlockArena {
    blocks: Vec<Box<DataBlock>>,
    capacity: usize,
}

impl BlockArena {
    #[inline]
    pub fn new(capacity: usize) -> Self {
        Self {
            blocks: Vec::new(),
            capacity: capacity.min(u32::MAX as usize),
        }
    }

    /// 已分配的块数
    #[inline]
    pub fn allocated(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 分配一个清零的块
    pub fn alloc(&mut self) -> Result<BlockRef, Error> {
        if self.blocks.len() >= self.capacity {
            log::warn!("block arena exhausted ({} blocks)", self.capacity);
            return Err(Error::NoSpace);
        }

        self.blocks.push(Box::new([0; BLOCK_SIZE]));
        u32::try_from(self.blocks.len())
            .ok()
            .and_then(BlockRef::from_raw)
            .ok_or(Error::NoSpace)
    }

    pub fn get(&self, block: BlockRef) -> Result<&DataBlock, Error> {
        self.blocks
            .get(block.position())
            .map(|data| &**data)
            .ok_or(Error::InvalidBlock)
    }

    pub fn get_mut(&mut self, block: BlockRef) -> Result<&mut DataBlock, Error> {
        self.blocks
            .get_mut(block.position())
            .map(|data| &mut **data)
            .ok_or(Error::InvalidBlock)
    }

    #[inline]
    pub fn map<V>(&self, block: BlockRef, f: impl FnOnce(&DataBlock) -> V) -> Result<V, Error> {
        self.get(block).map(f)
    }

    #[inline]
    pub fn map_mut<V>(
        &mut self,
        block: BlockRef,
        f: impl FnOnce(&mut DataBlock) -> V,
    ) -> Result<V, Error> {
        self.get_mut(block).map(f)
    }

    /// 读取索引块`table`的第`slot`个编号
    pub fn read_ref(&self, table: BlockRef, slot: usize) -> Result<Option<BlockRef>, Error> {
        if slot >= INDIRECT_COUNT {
            return Err(Error::OutOfRange);
        }

        self.map(table, |data| {
            let start = slot * BlockRef::SIZE;
            let mut raw = [0; BlockRef::SIZE];
            raw.copy_from_slice(&data[start..start + BlockRef::SIZE]);
            BlockRef::from_raw(u32::from_le_bytes(raw))
        })
    }

    pub fn write_ref(&mut self, table: BlockRef, slot: usize, block: BlockRef) -> Result<(), Error> {
        if slot >= INDIRECT_COUNT {
            return Err(Error::OutOfRange);
        }

        self.map_mut(table, |data| {
            let start = slot * BlockRef::SIZE;
            data[start..start + BlockRef::SIZE].copy_from_slice(&block.raw().to_le_bytes());
        })
    }

    /// 取出索引块`table`第`slot`个编号指向的下一级索引块，没有就分配
    pub fn ensure_child(&mut self, table: BlockRef, slot: usize) -> Result<BlockRef, Error> {
        if let Some(child) = self.read_ref(table, slot)? {
            return Ok(child);
        }

        let child = self.alloc()?;
        self.write_ref(table, slot, child)?;
        Ok(child)
    }
}
