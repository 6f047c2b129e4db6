use enumflags2::{BitFlags, bitflags};

use crate::DirEntryType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub inode: u64,
    pub mode: DirEntryType,
    pub permission: BitFlags<Permission>,
    pub uid: u32,
    pub gid: u32,
    /// Optimal I/O block size
    pub block_size: u64,
    /// Occupying blocks
    pub blocks: u64,
    /// File size
    pub size: u64,
}

/// 权限位，只存储不检查
#[rustfmt::skip]
#[bitflags]
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    OtherExec  = 0o001,
    OtherWrite = 0o002,
    OtherRead  = 0o004,
    GroupExec  = 0o010,
    GroupWrite = 0o020,
    GroupRead  = 0o040,
    UserExec   = 0o100,
    UserWrite  = 0o200,
    UserRead   = 0o400,
}

impl Permission {
    /// 将八进制的权限位转换为标志集，多余的位被舍弃
    #[inline]
    pub fn from_mode(mode: u16) -> BitFlags<Permission> {
        BitFlags::from_bits_truncate(mode)
    }
}
