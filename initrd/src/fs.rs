//! # 文件系统层
//!
//! [`Initrd`] 拥有节点表与块存储区，节点以 [`InodeId`] 为下标。
//! 归档中的文件依次占据节点表的前`file_count`项，随后是自举时搭建的目录：
//!
//! ```text
//! 根目录 ──"/"──> 挂载点 ─┬─ . ..
//!                        ├─ dev ── stdin stdout stderr
//!                        ├─ etc
//!                        └─ 归档中的全部文件
//! ```
//!
//! 挂载点并不登记在根目录中，只能通过在根目录查找`"/"`得到。

use alloc::sync::Arc;
use alloc::vec::Vec;

use enumflags2::BitFlags;
use spin::Mutex;
use vfs::{Access, DescriptorTable, Error, FsNode, Permission, Stat};

use crate::layout::{Archive, DirEntry, FileNode, InodeId, NodeKind, block_size_at_index};
use crate::{BLOCK_SIZE, BlockArena, BootstrapError, Config, DirEntries, Inode};

#[derive(Debug)]
pub struct Initrd {
    config: Config,
    arena: BlockArena,
    nodes: Vec<FileNode>,
    /// 归档中的文件数
    file_count: usize,
    root: InodeId,
    mount: InodeId,
    dev: InodeId,
}

/// 自举时的暂存区，离开作用域即释放
struct Staging(Vec<u8>);

impl Drop for Staging {
    fn drop(&mut self) {
        log::trace!("release staging buffer ({} bytes)", self.0.len());
    }
}

/// 标准流，依次登记为描述符 0、1、2
const STDIO: [&str; 3] = ["stdin", "stdout", "stderr"];

impl Initrd {
    /// 解析归档，为每个文件建立节点并复制数据，再搭建目录树
    pub fn load(archive: &[u8], config: Config) -> Result<Self, BootstrapError> {
        // 此后不再引用原始镜像
        let staging = Staging(archive.to_vec());
        let image = Archive::parse(&staging.0)?;
        log::debug!("archive holds {} files", image.len());

        let mut fs = Self {
            arena: BlockArena::new(config.max_blocks),
            nodes: Vec::with_capacity(image.len() + 8),
            file_count: image.len(),
            // 目录在文件之后创建
            root: InodeId::default(),
            mount: InodeId::default(),
            dev: InodeId::default(),
            config,
        };

        for (index, header) in image.headers().iter().enumerate() {
            let name = header.name().ok_or(BootstrapError::BadName { index })?;
            let payload = image
                .payload(index)
                .ok_or(BootstrapError::PayloadOutOfBounds { index })?;
            let permission = fs.config.file_permission;
            let id = fs.alloc_node(name, NodeKind::File, permission)?;
            fs.fill(id, payload)?;
            log::debug!("loaded {name:?} as inode {} ({} bytes)", id.index(), payload.len());
        }

        fs.build_tree()?;

        Ok(fs)
    }

    /// 打开三个标准流，交出挂载点
    pub fn mount(self, fds: &mut dyn DescriptorTable) -> Result<Inode, BootstrapError> {
        let (mount, dev) = (self.mount, self.dev);
        let fs = Arc::new(Mutex::new(self));
        let dev = Inode::new(dev, fs.clone());

        for name in STDIO {
            let stdio = |error: Error| BootstrapError::Stdio { name, error };
            let node = dev.finddir(name).map_err(stdio)?;
            fds.open(node, Access::Read | Access::Write).map_err(stdio)?;
        }

        Ok(Inode::new(mount, fs))
    }

    #[inline]
    pub fn root(&self) -> InodeId {
        self.root
    }

    /// 根目录下`"/"`所指的挂载点
    #[inline]
    pub fn mount_point(&self) -> InodeId {
        self.mount
    }

    #[inline]
    pub fn dev(&self) -> InodeId {
        self.dev
    }

    #[inline]
    pub fn file_count(&self) -> usize {
        self.file_count
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn arena(&self) -> &BlockArena {
        &self.arena
    }

    pub fn node(&self, id: InodeId) -> Result<&FileNode, Error> {
        self.nodes.get(id.index()).ok_or(Error::NotFound)
    }

    pub fn stat(&self, id: InodeId) -> Result<Stat, Error> {
        self.node(id).map(FileNode::stat)
    }

    /// 文件
    pub fn read(&self, id: InodeId, offset: usize, buf: &mut [u8]) -> Result<usize, Error> {
        let node = self.file(id)?;
        node.read_at(offset, buf, &self.arena)
    }

    /// 文件
    ///
    /// 不改变文件长度，增长文件要先调用 [`Initrd::expand_to`]。
    pub fn write(&mut self, id: InodeId, offset: usize, buf: &[u8]) -> Result<usize, Error> {
        self.file(id)?;
        let node = &mut self.nodes[id.index()];
        node.write_at(offset, buf, &mut self.arena)
    }

    pub fn expand_to(&mut self, id: InodeId, larger_length: u32) -> Result<(), Error> {
        let node = self.nodes.get_mut(id.index()).ok_or(Error::NotFound)?;
        node.expand_to(larger_length, &mut self.arena)
    }

    /// 目录
    ///
    /// 从头遍历目录项，最多产出 [`Config::max_dir_entries`] 项。
    pub fn entries(&self, dir: InodeId) -> Result<DirEntries<'_>, Error> {
        self.entries_bounded(dir, self.config.max_dir_entries)
    }

    /// 目录
    pub fn entries_bounded(&self, dir: InodeId, limit: usize) -> Result<DirEntries<'_>, Error> {
        let node = self.directory(dir)?;
        Ok(DirEntries::new(node, &self.arena, limit))
    }

    /// 目录
    ///
    /// 第`index`个目录项。越过最后一项时返回 [`Error::NotFound`]，
    /// 该位置是空槽时返回 [`Error::EmptyEntry`]。
    ///
    /// 哨兵不占位置：非末块的哨兵转入下一块，末块的哨兵即目录结尾，
    /// 所以落在哨兵上的请求得到的是下一块的目录项或 [`Error::NotFound`]。
    pub fn read_entry_at(&self, dir: InodeId, index: usize) -> Result<DirEntry, Error> {
        let dirent = self.entries(dir)?.nth(index).ok_or(Error::NotFound)??;
        if dirent.is_vacant() {
            return Err(Error::EmptyEntry);
        }
        Ok(dirent)
    }

    /// 目录
    ///
    /// 按名字（区分大小写）查找子节点。在根目录查找`"/"`得到挂载点。
    pub fn find_by_name(&self, dir: InodeId, name: &str) -> Result<InodeId, Error> {
        if dir == self.root && name == "/" {
            return Ok(self.mount);
        }

        for dirent in self.entries(dir)? {
            let dirent = dirent?;
            if !dirent.is_vacant() && dirent.name() == name {
                self.node(dirent.inode())?;
                return Ok(dirent.inode());
            }
        }

        Err(Error::NotFound)
    }

    /// 在`parent`下创建空目录
    pub fn create_directory(&mut self, parent: InodeId, name: &str) -> Result<InodeId, Error> {
        self.create(parent, name, NodeKind::Directory, Permission::from_mode(0o755))
    }

    /// 在`parent`下创建长度为`size`的文件，内容全为0
    pub fn create_file(&mut self, parent: InodeId, name: &str, size: u32) -> Result<InodeId, Error> {
        let permission = self.config.file_permission;
        let id = self.create(parent, name, NodeKind::File, permission)?;
        self.expand_to(id, size)?;
        Ok(id)
    }

    /// 以节点自己的名字把它登记到`dir`中
    pub fn add_file_to_dir(&mut self, dir: InodeId, id: InodeId) -> Result<(), Error> {
        let name = self.node(id)?.name.clone();
        self.add_hard_link(dir, id, &name)
    }

    /// 以`name`把`target`登记到`dir`中
    pub fn add_hard_link(&mut self, dir: InodeId, target: InodeId, name: &str) -> Result<(), Error> {
        let ty = self.node(target)?.kind.into();
        match self.find_by_name(dir, name) {
            Ok(_) => return Err(Error::AlreadyExists),
            Err(Error::NotFound) => {}
            Err(err) => return Err(err),
        }

        let dirent = DirEntry::new(name, target, ty)?;
        self.append_entry(dir, &dirent)
    }

    /// 把目录项追加到目录最后一块的哨兵处，放不下就为目录增加一块
    pub fn append_entry(&mut self, dir: InodeId, dirent: &DirEntry) -> Result<(), Error> {
        let node = self.directory(dir)?;
        let block_count = node.block_count();

        if block_count > 0 {
            let last = node.block_ref(block_count - 1, &self.arena)?;
            let last = last.ok_or(Error::CorruptDirectory)?;
            let cursor = self.arena.map(last, DirEntry::block_end)??;
            if cursor + dirent.record_length() as usize <= BLOCK_SIZE {
                return self.arena.map_mut(last, |data| dirent.encode(data, cursor))?;
            }
        }

        let node = &mut self.nodes[dir.index()];
        node.expand_to(node.length + BLOCK_SIZE as u32, &mut self.arena)?;
        let block = node.data_block(block_count, &mut self.arena)?;
        self.arena.map_mut(block, |data| dirent.encode(data, 0))?
    }
}

impl Initrd {
    fn file(&self, id: InodeId) -> Result<&FileNode, Error> {
        let node = self.node(id)?;
        if node.is_dir() {
            return Err(Error::IsADirectory);
        }
        Ok(node)
    }

    /// 不是目录的节点视同不存在
    fn directory(&self, id: InodeId) -> Result<&FileNode, Error> {
        self.node(id)
            .ok()
            .filter(|node| node.is_dir())
            .ok_or(Error::NotFound)
    }

    fn alloc_node(
        &mut self,
        name: &str,
        kind: NodeKind,
        permission: BitFlags<Permission>,
    ) -> Result<InodeId, Error> {
        if self.nodes.len() >= self.config.max_nodes {
            log::warn!("node table is full ({} nodes)", self.config.max_nodes);
            return Err(Error::NoSpace);
        }

        let id = InodeId::from(u32::try_from(self.nodes.len()).map_err(|_| Error::NoSpace)?);
        self.nodes.push(FileNode::new(id, name, kind, permission));
        Ok(id)
    }

    fn create(
        &mut self,
        parent: InodeId,
        name: &str,
        kind: NodeKind,
        permission: BitFlags<Permission>,
    ) -> Result<InodeId, Error> {
        match self.find_by_name(parent, name) {
            Ok(_) => return Err(Error::AlreadyExists),
            Err(Error::NotFound) => {}
            Err(err) => return Err(err),
        }

        DirEntry::check_name(name)?;

        let id = self.alloc_node(name, kind, permission)?;
        let dirent = DirEntry::new(name, id, kind.into())?;
        self.append_entry(parent, &dirent)?;
        Ok(id)
    }

    /// 逐块扩展节点并复制数据，块的有效字节数由 [`block_size_at_index`] 给出
    fn fill(&mut self, id: InodeId, payload: &[u8]) -> Result<(), Error> {
        let length = payload.len();
        let node = &mut self.nodes[id.index()];

        // 空文件不占用任何块
        let n_blocks = length.div_ceil(BLOCK_SIZE);
        for block_index in 0..n_blocks {
            let alloc_size = block_size_at_index(length, block_index, 0);
            node.length += alloc_size as u32;

            let slot = node.resolve_block(block_index, &mut self.arena)?;
            let block = self.arena.alloc()?;
            node.set_slot(slot, block, &mut self.arena)?;

            let start = block_index * BLOCK_SIZE;
            let src = &payload[start..start + alloc_size];
            self.arena
                .map_mut(block, |data| data[..alloc_size].copy_from_slice(src))?;
        }

        Ok(())
    }

    fn build_tree(&mut self) -> Result<(), Error> {
        self.root = self.alloc_node("/", NodeKind::Directory, Permission::from_mode(0o755))?;

        // 挂载点不写进根目录
        self.mount = self.alloc_node("/", NodeKind::Directory, Permission::from_mode(0o755))?;
        self.add_hard_link(self.mount, self.mount, ".")?;
        self.add_hard_link(self.mount, self.mount, "..")?;

        self.dev = self.create_directory(self.mount, "dev")?;
        let stdio_size = self.config.stdio_size;
        for name in STDIO {
            self.create_file(self.dev, name, stdio_size)?;
        }
        self.create_directory(self.mount, "etc")?;

        for index in 0..self.file_count {
            let id = InodeId::from(index as u32);
            self.add_file_to_dir(self.mount, id)?;
        }

        Ok(())
    }
}
