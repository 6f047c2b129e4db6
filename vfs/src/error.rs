#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    AlreadyExists,
    NotFound,
    IsADirectory,
    NotADirectory,
    DirectoryNotEmpty,
    /// 节点没有声明该能力
    Unsupported,
    /// 块索引超出三级索引所能编号的范围
    OutOfRange,
    /// 请求位置上的目录项是空槽
    EmptyEntry,
    /// 目录项链损坏或者没有终止
    CorruptDirectory,
    /// 块引用不指向已分配的块
    InvalidBlock,
    NoSpace,
    NameTooLong,
    /// 空名字
    InvalidName,
}
