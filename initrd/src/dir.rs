//! # 目录项遍历
//!
//! 目录项在目录节点的数据块内串成链表，没有索引，
//! 按位置访问只能从第0项重新走起。[`DirEntries`] 是惰性、有限、
//! 可以重新开始的遍历：每次调用 [`Initrd::entries`](crate::Initrd::entries)
//! 都从头开始。

use vfs::Error;

use crate::BlockArena;
use crate::layout::{DirEntry, FileNode};

pub struct DirEntries<'a> {
    node: &'a FileNode,
    arena: &'a BlockArena,
    /// 当前块的逻辑索引
    block: usize,
    /// 块内偏移
    cursor: usize,
    /// 已产出的目录项个数
    yielded: usize,
    /// 最多产出的目录项个数，超出就视为目录损坏
    limit: usize,
    done: bool,
}

impl<'a> DirEntries<'a> {
    pub(crate) fn new(node: &'a FileNode, arena: &'a BlockArena, limit: usize) -> Self {
        Self {
            node,
            arena,
            block: 0,
            cursor: 0,
            yielded: 0,
            limit,
            done: false,
        }
    }

    fn advance(&mut self) -> Result<Option<DirEntry>, Error> {
        while self.block < self.node.block_count() {
            let Some(block) = self.node.block_ref(self.block, self.arena)? else {
                log::error!("directory {:?} has a hole at block {}", self.node.id, self.block);
                return Err(Error::CorruptDirectory);
            };

            let cursor = self.cursor;
            match self.arena.map(block, |data| DirEntry::decode(data, cursor))?? {
                Some(dirent) => {
                    if self.yielded == self.limit {
                        log::error!(
                            "directory {:?} exceeds {} entries, giving up",
                            self.node.id,
                            self.limit
                        );
                        return Err(Error::CorruptDirectory);
                    }

                    self.cursor += dirent.record_length() as usize;
                    self.yielded += 1;
                    return Ok(Some(dirent));
                }
                // 本块的目录项已经用尽，转入下一块
                None => {
                    self.block += 1;
                    self.cursor = 0;
                }
            }
        }

        Ok(None)
    }
}

impl Iterator for DirEntries<'_> {
    type Item = Result<DirEntry, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let item = self.advance().transpose();
        if !matches!(item, Some(Ok(_))) {
            self.done = true;
        }
        item
    }
}
