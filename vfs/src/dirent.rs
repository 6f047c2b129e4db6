use alloc::string::String;

/// 交给目录树层的目录项，名字的所有权归调用者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Inode number
    pub inode: u64,
    pub ty: DirEntryType,
    pub name: String,
}

/// 目录项类型，取值与 ext2 的 `file_type` 字段一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DirEntryType {
    Unknown = 0,
    #[default]
    Regular = 1,
    Directory = 2,
    Char = 3,
    Block = 4,
    Fifo = 5,
    Socket = 6,
    SymLink = 7,
}

impl TryFrom<u8> for DirEntryType {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Ok(match raw {
            0 => Self::Unknown,
            1 => Self::Regular,
            2 => Self::Directory,
            3 => Self::Char,
            4 => Self::Block,
            5 => Self::Fifo,
            6 => Self::Socket,
            7 => Self::SymLink,
            raw => return Err(raw),
        })
    }
}

impl From<DirEntryType> for u8 {
    #[inline]
    fn from(ty: DirEntryType) -> Self {
        ty as u8
    }
}
