use vfs::Error;

/// 自举失败，文件系统不可用
#[derive(Debug)]
pub enum BootstrapError {
    /// 归档短于它声明的头部表
    Truncated,
    Header(binrw::Error),
    /// 第`index`个文件名不是以NUL填充的UTF-8，或放不进名字字段
    BadName { index: usize },
    /// 第`index`个文件的数据越出归档
    PayloadOutOfBounds { index: usize },
    /// 搭建目录树时失败
    Fs(Error),
    /// 标准流无法打开
    Stdio { name: &'static str, error: Error },
}

impl From<binrw::Error> for BootstrapError {
    #[inline]
    fn from(err: binrw::Error) -> Self {
        Self::Header(err)
    }
}

impl From<Error> for BootstrapError {
    #[inline]
    fn from(err: Error) -> Self {
        Self::Fs(err)
    }
}
