//! 间接索引块
//! - 一级：整个块连续存储**块编号**，每个编号都指向一个**数据块**
//! - 二级：整个块连续存储**块编号**，每个编号都指向一个一级索引块
//! - 三级：整个块连续存储**块编号**，每个编号都指向一个二级索引块
//!
//! 目录的空间用于存放子项的目录项；
//! 文件的空间用于存放它的数据。
//!
//! ## 块索引编码
//!
//! - x+1 级块索引模 x 级块的**可编号数量**，可得**最后**一块 x 的内部索引
//! - x+1 级块索引除以 x 级块的**可编号数量**，可得 x 级块的位置
//!
//! 索引块只在第一次被寻址时分配。

use alloc::string::String;

use derive_more::{From, Into};
use enumflags2::BitFlags;
use vfs::{Capability, DirEntryType, Error, Permission, Stat};

use crate::BLOCK_SIZE;
use crate::block::{BlockArena, BlockRef, INDIRECT_COUNT};

/// 直接索引块可编号数量
pub const DIRECT_COUNT: usize = 12;
/// 一级索引块可编号数量
pub const INDIRECT1_COUNT: usize = INDIRECT_COUNT;
/// 二级索引块可编号数量
pub const INDIRECT2_COUNT: usize = INDIRECT_COUNT.pow(2);
/// 三级索引块可编号数量
pub const INDIRECT3_COUNT: usize = INDIRECT_COUNT.pow(3);
/// 直接索引时的编号容量
const DIRECT_CAP: usize = DIRECT_COUNT;
/// 用上一级索引时的编号容量
const INDIRECT1_CAP: usize = DIRECT_CAP + INDIRECT1_COUNT;
/// 用上二级索引时的编号容量
const INDIRECT2_CAP: usize = INDIRECT1_CAP + INDIRECT2_COUNT;
/// 用上三级索引时的编号容量，也是节点能编号的块数上限
pub const INDIRECT3_CAP: usize = INDIRECT2_CAP + INDIRECT3_COUNT;

/// 节点在节点表中的位置
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct InodeId(u32);

impl InodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub enum NodeKind {
    #[default]
    File,
    Directory,
}

/// 逻辑块的编号所在的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSlot {
    /// 节点的第几个直接索引
    Direct(usize),
    /// 一级索引块`table`中的第`slot`个编号
    Indirect { table: BlockRef, slot: usize },
}

#[derive(Debug)]
pub struct FileNode {
    pub id: InodeId,
    pub name: String,
    /// 字节长度，读写的边界
    pub length: u32,
    pub kind: NodeKind,
    pub permission: BitFlags<Permission>,
    pub uid: u32,
    pub gid: u32,
    /// 直接索引块
    direct: [Option<BlockRef>; DIRECT_COUNT],
    /// 指向一个一级索引块
    indirect1: Option<BlockRef>,
    /// 指向一个二级索引块
    indirect2: Option<BlockRef>,
    /// 指向一个三级索引块
    indirect3: Option<BlockRef>,
}

impl FileNode {
    pub fn new(id: InodeId, name: &str, kind: NodeKind, permission: BitFlags<Permission>) -> Self {
        Self {
            id,
            name: String::from(name),
            length: 0,
            kind,
            permission,
            uid: 0,
            gid: 0,
            direct: [None; DIRECT_COUNT],
            indirect1: None,
            indirect2: None,
            indirect3: None,
        }
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn capabilities(&self) -> BitFlags<Capability> {
        match self.kind {
            NodeKind::File => Capability::file(),
            NodeKind::Directory => Capability::directory(),
        }
    }

    /// 节点拥有的数据块数
    #[inline]
    pub fn block_count(&self) -> usize {
        Self::count_data_block(self.length)
    }

    pub fn stat(&self) -> Stat {
        Stat {
            inode: u32::from(self.id).into(),
            mode: self.kind.into(),
            permission: self.permission,
            uid: self.uid,
            gid: self.gid,
            block_size: BLOCK_SIZE as u64,
            blocks: Self::count_total_block(self.length) as u64,
            size: self.length.into(),
        }
    }

    /// 逻辑块`block_index`的编号，不分配任何块。
    ///
    /// 索引块尚未分配时返回空。
    pub fn block_ref(
        &self,
        block_index: usize,
        arena: &BlockArena,
    ) -> Result<Option<BlockRef>, Error> {
        if block_index < DIRECT_CAP {
            return Ok(self.direct[block_index]);
        }

        let (table, slot) = if block_index < INDIRECT1_CAP {
            // 剔去直接索引的部分
            (self.indirect1, block_index - DIRECT_CAP)
        } else if block_index < INDIRECT2_CAP {
            // 剔去使用了一级索引的部分
            let index = block_index - INDIRECT1_CAP;
            let indirect1 = match self.indirect2 {
                Some(indirect2) => arena.read_ref(indirect2, index / INDIRECT1_COUNT)?,
                None => None,
            };
            (indirect1, index % INDIRECT1_COUNT)
        } else if block_index < INDIRECT3_CAP {
            // 剔去使用了二级索引的部分
            let index = block_index - INDIRECT2_CAP;
            let indirect2 = match self.indirect3 {
                Some(indirect3) => arena.read_ref(indirect3, index / INDIRECT2_COUNT)?,
                None => None,
            };
            let indirect1 = match indirect2 {
                Some(indirect2) => {
                    arena.read_ref(indirect2, index % INDIRECT2_COUNT / INDIRECT1_COUNT)?
                }
                None => None,
            };
            (indirect1, index % INDIRECT1_COUNT)
        } else {
            return Err(Error::OutOfRange);
        };

        match table {
            Some(table) => arena.read_ref(table, slot),
            None => Ok(None),
        }
    }

    /// 找到逻辑块`block_index`的编号所在的位置，途经的索引块若未分配则分配并清零
    pub fn resolve_block(
        &mut self,
        block_index: usize,
        arena: &mut BlockArena,
    ) -> Result<BlockSlot, Error> {
        if block_index < DIRECT_CAP {
            return Ok(BlockSlot::Direct(block_index));
        }

        if block_index < INDIRECT1_CAP {
            let indirect1 = Self::ensure_table(&mut self.indirect1, arena)?;
            return Ok(BlockSlot::Indirect {
                table: indirect1,
                slot: block_index - DIRECT_CAP,
            });
        }

        if block_index < INDIRECT2_CAP {
            let index = block_index - INDIRECT1_CAP;

            // 数量上二级索引有 INDIRECT_COUNT 个 INDIRECT1_COUNT
            let indirect2 = Self::ensure_table(&mut self.indirect2, arena)?;
            let indirect1 = arena.ensure_child(indirect2, index / INDIRECT1_COUNT)?;
            return Ok(BlockSlot::Indirect {
                table: indirect1,
                slot: index % INDIRECT1_COUNT,
            });
        }

        if block_index < INDIRECT3_CAP {
            let index = block_index - INDIRECT2_CAP;

            let indirect3 = Self::ensure_table(&mut self.indirect3, arena)?;
            let indirect2 = arena.ensure_child(indirect3, index / INDIRECT2_COUNT)?;
            let indirect1 =
                arena.ensure_child(indirect2, index % INDIRECT2_COUNT / INDIRECT1_COUNT)?;
            // 视三级索引块的单元为一级索引块，
            // 取模 INDIRECT1_COUNT 即可得到 index 所指向一级索引块内的位置
            return Ok(BlockSlot::Indirect {
                table: indirect1,
                slot: index % INDIRECT1_COUNT,
            });
        }

        Err(Error::OutOfRange)
    }

    pub fn slot_ref(&self, slot: BlockSlot, arena: &BlockArena) -> Result<Option<BlockRef>, Error> {
        match slot {
            BlockSlot::Direct(index) => Ok(self.direct[index]),
            BlockSlot::Indirect { table, slot } => arena.read_ref(table, slot),
        }
    }

    pub fn set_slot(
        &mut self,
        slot: BlockSlot,
        block: BlockRef,
        arena: &mut BlockArena,
    ) -> Result<(), Error> {
        match slot {
            BlockSlot::Direct(index) => {
                self.direct[index] = Some(block);
                Ok(())
            }
            BlockSlot::Indirect { table, slot } => arena.write_ref(table, slot, block),
        }
    }

    /// 逻辑块`block_index`对应的数据块，未分配就分配
    pub fn data_block(
        &mut self,
        block_index: usize,
        arena: &mut BlockArena,
    ) -> Result<BlockRef, Error> {
        let slot = self.resolve_block(block_index, arena)?;
        if let Some(block) = self.slot_ref(slot, arena)? {
            return Ok(block);
        }

        let block = arena.alloc()?;
        self.set_slot(slot, block, arena)?;
        Ok(block)
    }

    /// 把长度增长到`larger_length`，并分配覆盖新长度的数据块。
    ///
    /// 分配失败时，长度停留在已分配的块所能覆盖的位置。
    pub fn expand_to(&mut self, larger_length: u32, arena: &mut BlockArena) -> Result<(), Error> {
        if larger_length <= self.length {
            return Ok(());
        }

        let new_total_blocks = Self::count_data_block(larger_length);
        for block_index in self.block_count()..new_total_blocks {
            self.data_block(block_index, arena)?;
            let covered = ((block_index + 1) * BLOCK_SIZE) as u64;
            self.length = covered.min(u64::from(larger_length)) as u32;
        }
        self.length = larger_length;

        Ok(())
    }

    /// 从`offset`读出数据填充`buf`，越过长度的部分截去
    pub fn read_at(&self, offset: usize, buf: &mut [u8], arena: &BlockArena) -> Result<usize, Error> {
        let length = self.length as usize;

        if offset > length {
            return Ok(0);
        }

        let size = buf.len().min(length - offset);
        if size == 0 {
            return Ok(0);
        }

        let starting_block = offset / BLOCK_SIZE;
        // 减一：读到恰好填满一块时不应进入下一块，size 非零故不会下溢
        let ending_block = (offset + size - 1) / BLOCK_SIZE;

        let mut read_size = 0;
        for block_index in starting_block..=ending_block {
            let block_read_size =
                block_size_at_index(length, block_index, offset).min(size - read_size);
            // 只有起始块需要按块内偏移缩进
            let start = if block_index == starting_block {
                offset % BLOCK_SIZE
            } else {
                0
            };
            let dest = &mut buf[read_size..read_size + block_read_size];

            match self.block_ref(block_index, arena)? {
                Some(block) => arena.map(block, |data_block| {
                    dest.copy_from_slice(&data_block[start..start + block_read_size])
                })?,
                None => {
                    log::warn!("inode {:?}: block {block_index} is a hole", self.id);
                    dest.fill(0);
                }
            }

            read_size += block_read_size;
        }

        Ok(read_size)
    }

    /// 把`buf`写到`offset`处，只覆写已有长度之内的部分，不改变长度
    pub fn write_at(
        &mut self,
        offset: usize,
        buf: &[u8],
        arena: &mut BlockArena,
    ) -> Result<usize, Error> {
        let length = self.length as usize;

        if offset > length {
            return Ok(0);
        }

        let size = buf.len().min(length - offset);

        let starting_block = offset / BLOCK_SIZE;
        // NOTE: 与读不同，这里没有减一，恰好落在块边界时会多算一块，
        //       那一块的写入量为0，不会被寻址
        let ending_block = (offset + size) / BLOCK_SIZE;

        let mut written_size = 0;
        for block_index in starting_block..=ending_block {
            let block_write_size =
                block_size_at_index(length, block_index, offset).min(size - written_size);
            if block_write_size == 0 {
                continue;
            }

            let start = if block_index == starting_block {
                offset % BLOCK_SIZE
            } else {
                0
            };
            let src = &buf[written_size..written_size + block_write_size];

            let block = self.data_block(block_index, arena)?;
            arena.map_mut(block, |data_block| {
                data_block[start..start + block_write_size].copy_from_slice(src)
            })?;

            written_size += block_write_size;
        }

        Ok(written_size)
    }

    /// 计算容纳指定数据量需要多少个**数据块**
    #[inline]
    pub fn count_data_block(size: u32) -> usize {
        (size as usize).div_ceil(BLOCK_SIZE)
    }

    /// 计算容纳指定数据量需要多少个 **数据块** 和 **索引块**
    pub fn count_total_block(size: u32) -> usize {
        let data_blocks = Self::count_data_block(size);
        let mut total = data_blocks;

        // 超出直接索引，使用一级索引块
        if data_blocks > DIRECT_CAP {
            total += 1;
        }

        // 超出一级索引，使用二级索引块及其下的一级索引块
        if data_blocks > INDIRECT1_CAP {
            let blocks = (data_blocks - INDIRECT1_CAP).min(INDIRECT2_COUNT);
            total += 1 + blocks.div_ceil(INDIRECT1_COUNT);
        }

        // 超出二级索引，使用三级索引块及其下的二级、一级索引块
        if data_blocks > INDIRECT2_CAP {
            let blocks = data_blocks - INDIRECT2_CAP;
            total += 1 + blocks.div_ceil(INDIRECT2_COUNT) + blocks.div_ceil(INDIRECT1_COUNT);
        }

        total
    }
}

impl FileNode {
    fn ensure_table(table: &mut Option<BlockRef>, arena: &mut BlockArena) -> Result<BlockRef, Error> {
        if let Some(table) = *table {
            return Ok(table);
        }

        let new_table = arena.alloc()?;
        *table = Some(new_table);
        Ok(new_table)
    }
}

/// 长度为`total_length`的节点中，第`index`块从`base_offset`起的有效字节数。
///
/// 起始块要扣去`base_offset`在块内的偏移，其余块按整块计，
/// 末块只计到`total_length`为止。
pub fn block_size_at_index(total_length: usize, index: usize, base_offset: usize) -> usize {
    let block_start = index.saturating_mul(BLOCK_SIZE);
    let start = block_start.max(base_offset);
    let end = block_start.saturating_add(BLOCK_SIZE).min(total_length);
    end.saturating_sub(start)
}

impl From<NodeKind> for DirEntryType {
    #[inline]
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Directory => Self::Directory,
            NodeKind::File => Self::Regular,
        }
    }
}
