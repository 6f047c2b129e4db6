//! Constants and limits used by initrd

use enumflags2::BitFlags;
use vfs::Permission;

#[derive(Debug, Clone)]
pub struct Config {
    /// 块存储区最多容纳的块数（数据块与索引块）
    pub max_blocks: usize,
    /// 节点表容量
    pub max_nodes: usize,
    /// 遍历单个目录时最多解码的目录项个数，超出即视为目录损坏
    pub max_dir_entries: usize,
    /// 归档文件的权限位
    pub file_permission: BitFlags<Permission>,
    /// stdin、stdout、stderr 的长度
    pub stdio_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // 64 MiB
            max_blocks: 0x10000,
            max_nodes: 0x8000,
            max_dir_entries: 0x8000,
            file_permission: Permission::from_mode(0o664),
            stdio_size: 1024,
        }
    }
}
