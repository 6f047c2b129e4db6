//! 目录项的字节布局
//!
//! `inode:u32 | record_length:u16 | name_length:u8 | entry_type:u8 | name`
//!
//! 目录项在块内首尾相接，下一项位于当前项起始处之后`record_length`字节。
//! `record_length`为0的位置是块内的哨兵，表示本块没有更多目录项。
//! 目录项不会跨块。

use alloc::string::String;
use alloc::vec::Vec;

use binrw::io::Cursor;
use binrw::{BinRead, BinWrite, binrw};
use vfs::{DirEntryType, Error};

use crate::layout::InodeId;
use crate::{BLOCK_SIZE, DataBlock};

/// 目录项头部大小，名字紧随其后
pub const HEADER_SIZE: usize = 8;
/// 名字的最大长度
pub const NAME_MAX_LEN: usize = u8::MAX as usize;

#[binrw]
#[brw(little)]
struct RawDirEntry {
    inode: u32,
    record_length: u16,
    #[br(temp)]
    #[bw(calc = name.len() as u8)]
    name_length: u8,
    entry_type: u8,
    #[br(count = name_length)]
    name: Vec<u8>,
}

/// 解码后的目录项，名字由调用者持有
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    inode: InodeId,
    record_length: u16,
    ty: DirEntryType,
    name: String,
}

impl DirEntry {
    pub fn new(name: &str, inode: InodeId, ty: DirEntryType) -> Result<Self, Error> {
        Self::check_name(name)?;

        Ok(Self {
            inode,
            record_length: Self::record_length_for(name.len()),
            ty,
            name: String::from(name),
        })
    }

    /// 空名字会被解码成空槽，因此不能登记
    pub fn check_name(name: &str) -> Result<(), Error> {
        if name.is_empty() {
            return Err(Error::InvalidName);
        }
        if name.len() > NAME_MAX_LEN {
            return Err(Error::NameTooLong);
        }
        Ok(())
    }

    /// 空槽：没有名字的目录项，只占一个头部
    pub fn vacant() -> Self {
        Self {
            inode: InodeId::default(),
            record_length: HEADER_SIZE as u16,
            ty: DirEntryType::Unknown,
            name: String::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn inode(&self) -> InodeId {
        self.inode
    }

    #[inline]
    pub fn ty(&self) -> DirEntryType {
        self.ty
    }

    #[inline]
    pub fn record_length(&self) -> u16 {
        self.record_length
    }

    #[inline]
    pub fn is_vacant(&self) -> bool {
        self.name.is_empty()
    }

    /// 头部加名字，向上对齐到4字节
    #[inline]
    fn record_length_for(name_len: usize) -> u16 {
        (HEADER_SIZE + name_len).next_multiple_of(4) as u16
    }

    /// 解码块内`cursor`处的目录项。
    ///
    /// 遇到哨兵，或块尾已放不下一个头部时返回空。
    pub fn decode(block: &DataBlock, cursor: usize) -> Result<Option<Self>, Error> {
        let Some(header) = block.get(cursor..cursor + HEADER_SIZE) else {
            return Ok(None);
        };
        if u16::from_le_bytes([header[4], header[5]]) == 0 {
            return Ok(None);
        }

        let raw = RawDirEntry::read(&mut Cursor::new(&block[cursor..])).map_err(|err| {
            log::error!("undecodable dirent at {cursor}: {err:?}");
            Error::CorruptDirectory
        })?;

        let record_length = raw.record_length as usize;
        if record_length < HEADER_SIZE + raw.name.len() || cursor + record_length > BLOCK_SIZE {
            log::error!("dirent at {cursor} has bad record length {record_length}");
            return Err(Error::CorruptDirectory);
        }

        let ty = DirEntryType::try_from(raw.entry_type).map_err(|ty| {
            log::error!("dirent at {cursor} has unknown type {ty}");
            Error::CorruptDirectory
        })?;
        let name = String::from_utf8(raw.name).map_err(|_| Error::CorruptDirectory)?;

        Ok(Some(Self {
            inode: raw.inode.into(),
            record_length: raw.record_length,
            ty,
            name,
        }))
    }

    /// 把目录项写到块内`cursor`处，放不下时返回[`Error::NoSpace`]
    pub fn encode(&self, block: &mut DataBlock, cursor: usize) -> Result<(), Error> {
        let dest = block
            .get_mut(cursor..cursor + self.record_length as usize)
            .ok_or(Error::NoSpace)?;

        let raw = RawDirEntry {
            inode: self.inode.into(),
            record_length: self.record_length,
            entry_type: self.ty.into(),
            name: self.name.as_bytes().to_vec(),
        };
        let mut writer = Cursor::new(Vec::with_capacity(dest.len()));
        raw.write(&mut writer).map_err(|err| {
            log::error!("failed to encode dirent {:?}: {err:?}", self.name);
            Error::CorruptDirectory
        })?;
        let bytes = writer.into_inner();

        dest.fill(0);
        dest[..bytes.len()].copy_from_slice(&bytes);
        Ok(())
    }

    /// 块内哨兵所在的偏移，即追加新目录项的位置
    pub fn block_end(block: &DataBlock) -> Result<usize, Error> {
        let mut cursor = 0;
        while let Some(dirent) = Self::decode(block, cursor)? {
            cursor += dirent.record_length as usize;
        }
        Ok(cursor)
    }
}

impl From<DirEntry> for vfs::DirEntry {
    fn from(dirent: DirEntry) -> Self {
        Self {
            inode: u32::from(dirent.inode).into(),
            ty: dirent.ty,
            name: dirent.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_layout() {
        let mut block = [0; BLOCK_SIZE];
        let dirent = DirEntry::new("stdin", InodeId::from(3), DirEntryType::Regular).unwrap();
        dirent.encode(&mut block, 0).unwrap();

        assert_eq!(&block[..4], &3u32.to_le_bytes());
        assert_eq!(&block[4..6], &16u16.to_le_bytes());
        assert_eq!(block[6], 5);
        assert_eq!(block[7], DirEntryType::Regular as u8);
        assert_eq!(&block[8..13], b"stdin");
        // 下一项的位置是哨兵
        assert_eq!(&block[16..24], &[0; 8]);

        assert_eq!(DirEntry::decode(&block, 0), Ok(Some(dirent)));
        assert_eq!(DirEntry::decode(&block, 16), Ok(None));
        assert_eq!(DirEntry::block_end(&block), Ok(16));
    }

    #[test]
    fn tail_without_room_for_header() {
        let block = [0xFF; BLOCK_SIZE];
        assert_eq!(DirEntry::decode(&block, BLOCK_SIZE - 4), Ok(None));
    }

    #[test]
    fn corrupt_record_length() {
        let mut block = [0; BLOCK_SIZE];
        DirEntry::new("etc", InodeId::from(1), DirEntryType::Directory)
            .unwrap()
            .encode(&mut block, 0)
            .unwrap();

        // 记录长度短于头部加名字
        block[4..6].copy_from_slice(&4u16.to_le_bytes());
        assert_eq!(DirEntry::decode(&block, 0), Err(Error::CorruptDirectory));

        // 记录越出块尾
        let cursor = BLOCK_SIZE - 24;
        DirEntry::new("etc", InodeId::from(1), DirEntryType::Directory)
            .unwrap()
            .encode(&mut block, cursor)
            .unwrap();
        block[cursor + 4..cursor + 6].copy_from_slice(&32u16.to_le_bytes());
        assert_eq!(DirEntry::decode(&block, cursor), Err(Error::CorruptDirectory));
    }

    #[test]
    fn name_too_long() {
        let name = "x".repeat(NAME_MAX_LEN + 1);
        assert_eq!(
            DirEntry::new(&name, InodeId::from(0), DirEntryType::Regular),
            Err(Error::NameTooLong)
        );
    }

    #[test]
    fn empty_name() {
        assert_eq!(
            DirEntry::new("", InodeId::from(0), DirEntryType::Regular),
            Err(Error::InvalidName)
        );
        assert!(DirEntry::vacant().is_vacant());
    }

    #[test]
    fn encode_past_block_end() {
        let mut block = [0; BLOCK_SIZE];
        let dirent = DirEntry::new("abc", InodeId::from(0), DirEntryType::Regular).unwrap();
        assert_eq!(dirent.encode(&mut block, BLOCK_SIZE - 4), Err(Error::NoSpace));
    }
}
