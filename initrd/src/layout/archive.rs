//! 归档（ramdisk 镜像）的布局，小端序、无填充：
//!
//! ```text
//! ArchiveHeader { file_count: u32 }
//! FileHeader[file_count] { name: [u8; NAME_WIDTH], payload_offset: u32, length: u32 }
//! 文件数据，由 payload_offset 指向
//! ```
//!
//! 磁盘上的`payload_offset`相对于归档起始处。

use alloc::vec::Vec;
use core::ops::Range;

use binrw::io::Cursor;
use binrw::{BinRead, BinWrite, binrw};

use crate::BootstrapError;

/// 文件名字段的宽度，不足部分以NUL填充
pub const NAME_WIDTH: usize = 64;

/// 挂载点下由自举创建的目录项，归档文件不能使用
pub const RESERVED_NAMES: [&str; 4] = [".", "..", "dev", "etc"];

#[inline]
fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.iter().any(|&reserved| reserved == name)
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveHeader {
    pub file_count: u32,
}

impl ArchiveHeader {
    pub const SIZE: usize = 4;
}

#[binrw]
#[brw(little)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    name: [u8; NAME_WIDTH],
    pub payload_offset: u32,
    pub length: u32,
}

impl FileHeader {
    pub const SIZE: usize = NAME_WIDTH + 8;

    /// 名字放不进名字字段、含有NUL或是保留名时返回空
    pub fn new(name: &str, payload_offset: u32, length: u32) -> Option<Self> {
        let bytes = name.as_bytes();
        if bytes.is_empty()
            || bytes.len() > NAME_WIDTH
            || bytes.contains(&0)
            || is_reserved(name)
        {
            return None;
        }

        let mut field = [0; NAME_WIDTH];
        field[..bytes.len()].copy_from_slice(bytes);
        Some(Self {
            name: field,
            payload_offset,
            length,
        })
    }

    pub fn name(&self) -> Option<&str> {
        let len = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(NAME_WIDTH);
        match core::str::from_utf8(&self.name[..len]) {
            Ok(name) if !name.is_empty() && !is_reserved(name) => Some(name),
            _ => None,
        }
    }

    /// 数据在归档中的范围
    #[inline]
    pub fn payload_range(&self) -> Range<usize> {
        let start = self.payload_offset as usize;
        start..start + self.length as usize
    }
}

/// 解析过的归档，借用整个镜像
#[derive(Debug)]
pub struct Archive<'a> {
    image: &'a [u8],
    headers: Vec<FileHeader>,
}

impl<'a> Archive<'a> {
    /// 解析头部表并检查每个文件的名字与数据范围
    pub fn parse(image: &'a [u8]) -> Result<Self, BootstrapError> {
        if image.len() < ArchiveHeader::SIZE {
            return Err(BootstrapError::Truncated);
        }

        let mut reader = Cursor::new(image);
        let header = ArchiveHeader::read(&mut reader)?;
        let file_count = header.file_count as usize;

        let table_end = file_count
            .checked_mul(FileHeader::SIZE)
            .and_then(|table| table.checked_add(ArchiveHeader::SIZE))
            .ok_or(BootstrapError::Truncated)?;
        if table_end > image.len() {
            log::error!(
                "archive declares {file_count} files but is only {} bytes",
                image.len()
            );
            return Err(BootstrapError::Truncated);
        }

        let headers = (0..file_count)
            .map(|_| FileHeader::read(&mut reader))
            .collect::<Result<Vec<_>, _>>()?;

        for (index, header) in headers.iter().enumerate() {
            if header.name().is_none() {
                return Err(BootstrapError::BadName { index });
            }
            if header.payload_range().end > image.len() {
                log::error!("payload of {:?} exceeds the archive", header.name());
                return Err(BootstrapError::PayloadOutOfBounds { index });
            }
        }

        Ok(Self { image, headers })
    }

    #[inline]
    pub fn headers(&self) -> &[FileHeader] {
        &self.headers
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// 第`index`个文件的数据
    pub fn payload(&self, index: usize) -> Option<&'a [u8]> {
        let range = self.headers.get(index)?.payload_range();
        self.image.get(range)
    }

    /// 按给定顺序把文件打包成归档
    pub fn encode<'n, I>(files: I) -> Result<Vec<u8>, BootstrapError>
    where
        I: IntoIterator<Item = (&'n str, &'n [u8])>,
    {
        let files: Vec<_> = files.into_iter().collect();
        let file_count =
            u32::try_from(files.len()).map_err(|_| BootstrapError::Truncated)?;

        let mut writer = Cursor::new(Vec::new());
        ArchiveHeader { file_count }.write(&mut writer)?;

        let mut payload_offset = ArchiveHeader::SIZE + files.len() * FileHeader::SIZE;
        for (index, &(name, data)) in files.iter().enumerate() {
            let out_of_bounds = || BootstrapError::PayloadOutOfBounds { index };
            let offset = u32::try_from(payload_offset).map_err(|_| out_of_bounds())?;
            let length = u32::try_from(data.len()).map_err(|_| out_of_bounds())?;

            FileHeader::new(name, offset, length)
                .ok_or(BootstrapError::BadName { index })?
                .write(&mut writer)?;
            payload_offset += data.len();
        }

        let mut image = writer.into_inner();
        for (_, data) in files {
            image.extend_from_slice(data);
        }
        Ok(image)
    }
}
