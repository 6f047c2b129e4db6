//! # 内存数据结构层
//!
//! 归档的布局：
//! 归档头 | 文件头表 | 文件数据

mod archive;
pub use archive::{Archive, ArchiveHeader, FileHeader, NAME_WIDTH, RESERVED_NAMES};

mod inode;
pub use inode::{
    BlockSlot, DIRECT_COUNT, FileNode, INDIRECT1_COUNT, INDIRECT2_COUNT, INDIRECT3_CAP,
    INDIRECT3_COUNT, InodeId, NodeKind, block_size_at_index,
};

/// 目录项，存放在目录节点的数据块中
mod dir_entry;
pub use dir_entry::{DirEntry, HEADER_SIZE, NAME_MAX_LEN};
