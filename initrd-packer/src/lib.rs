
use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::Path;

use initrd::{Archive, Config, Initrd};
use vfs::Stat;

/// 把`source`下的普通文件按名字顺序打包成归档，子目录被跳过
pub fn pack_dir(source: &Path) -> io::Result<Vec<u8>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            log::warn!("skipping {:?}: not a regular file", entry.path());
            continue;
        }

        let name = entry
            .file_name()
            .into_string()
            .map_err(|name| invalid_data(format!("file name {name:?} is not UTF-8")))?;
        let data = fs::read(entry.path())?;
        files.push((name, data));
    }
    files.sort_by(|(a, _), (b, _)| a.cmp(b));

    for (name, data) in &files {
        log::info!("pack {name:?} ({} bytes)", data.len());
    }

    Archive::encode(
        files
            .iter()
            .map(|(name, data)| (name.as_str(), data.as_slice())),
    )
    .map_err(invalid_data)
}

/// 加载归档，和目标机自举时一样搭建目录树
pub fn load(image: &[u8]) -> io::Result<Initrd> {
    Initrd::load(image, Config::default()).map_err(invalid_data)
}

/// 挂载点下的所有目录项及其状态
pub fn list(image: &[u8]) -> io::Result<Vec<(String, Stat)>> {
    let fs = load(image)?;
    let mut listing = Vec::new();
    for dirent in fs.entries(fs.mount_point()).map_err(invalid_data)? {
        let dirent = dirent.map_err(invalid_data)?;
        if dirent.is_vacant() {
            continue;
        }
        let stat = fs.stat(dirent.inode()).map_err(invalid_data)?;
        listing.push((String::from(dirent.name()), stat));
    }
    Ok(listing)
}

/// 读出挂载点下名为`name`的文件
pub fn cat(image: &[u8], name: &str) -> io::Result<Vec<u8>> {
    let fs = load(image)?;
    let id = fs
        .find_by_name(fs.mount_point(), name)
        .map_err(|err| io::Error::new(io::ErrorKind::NotFound, format!("{name}: {err:?}")))?;

    let mut buf = vec![0; fs.node(id).map_err(invalid_data)?.length as usize];
    let read = fs.read(id, 0, &mut buf).map_err(invalid_data)?;
    buf.truncate(read);
    Ok(buf)
}

fn invalid_data(err: impl Debug) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, format!("{err:?}"))
}
