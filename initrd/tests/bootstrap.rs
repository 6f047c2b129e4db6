use initrd::{Archive, BLOCK_SIZE, BootstrapError, Config, Initrd, InodeId};
use vfs::{DirEntryType, Error, FdTable, FsNode, Permission};

fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

fn two_files() -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let a = payload(BLOCK_SIZE / 2, 1);
    let b = payload(BLOCK_SIZE * 2 + 10, 7);
    let image = Archive::encode([("a", a.as_slice()), ("b", b.as_slice())]).unwrap();
    (image, a, b)
}

#[test]
fn block_counts() {
    let (image, a, b) = two_files();
    let fs = Initrd::load(&image, Config::default()).unwrap();

    assert_eq!(fs.file_count(), 2);
    let node_a = fs.node(InodeId::from(0)).unwrap();
    let node_b = fs.node(InodeId::from(1)).unwrap();
    assert_eq!(node_a.name, "a");
    assert_eq!(node_a.length as usize, a.len());
    assert_eq!(node_a.block_count(), 1);
    assert_eq!(node_b.length as usize, b.len());
    assert_eq!(node_b.block_count(), 3);

    // a、b，挂载点与dev的目录块，三个标准流
    assert_eq!(fs.arena().allocated(), 1 + 3 + 1 + 1 + 3);
}

#[test]
fn straddling_read() {
    let (image, _, b) = two_files();
    let fs = Initrd::load(&image, Config::default()).unwrap();
    let mut buf = [0; 20];

    assert_eq!(fs.read(InodeId::from(1), BLOCK_SIZE - 5, &mut buf), Ok(20));
    assert_eq!(&buf[..], &b[BLOCK_SIZE - 5..BLOCK_SIZE + 15]);
}

#[test]
fn round_trip() {
    let (image, a, b) = two_files();
    let fs = Initrd::load(&image, Config::default()).unwrap();

    for (id, expected) in [(0, &a), (1, &b)] {
        let mut buf = vec![0; expected.len() + 16];
        let read = fs.read(InodeId::from(id), 0, &mut buf).unwrap();
        assert_eq!(read, expected.len());
        assert_eq!(&buf[..read], expected.as_slice());
    }

    // 越过末尾
    let mut buf = [0; 4];
    assert_eq!(fs.read(InodeId::from(0), a.len(), &mut buf), Ok(0));
    assert_eq!(fs.read(InodeId::from(0), a.len() + 1, &mut buf), Ok(0));
}

#[test]
fn write_then_read() {
    let (image, _, b) = two_files();
    let mut fs = Initrd::load(&image, Config::default()).unwrap();
    let id = InodeId::from(1);
    let mut buf = [0; 6];

    assert_eq!(fs.write(id, 10, b"hello"), Ok(5));
    assert_eq!(fs.read(id, 10, &mut buf[..5]), Ok(5));
    assert_eq!(&buf[..5], b"hello");

    // 跨越块边界
    assert_eq!(fs.write(id, BLOCK_SIZE - 2, b"across"), Ok(6));
    assert_eq!(fs.read(id, BLOCK_SIZE - 2, &mut buf), Ok(6));
    assert_eq!(&buf, b"across");

    // 不增长文件
    assert_eq!(fs.write(id, b.len() - 2, b"tail!"), Ok(2));
    assert_eq!(fs.node(id).unwrap().length as usize, b.len());
    assert_eq!(fs.node(id).unwrap().block_count(), 3);
}

#[test]
fn zero_length_file() {
    let image = Archive::encode([("empty", &b""[..])]).unwrap();
    let fs = Initrd::load(&image, Config::default()).unwrap();
    let id = InodeId::from(0);
    let mut buf = [0; 8];

    assert_eq!(fs.node(id).unwrap().block_count(), 0);
    assert_eq!(fs.read(id, 0, &mut buf), Ok(0));
    let stat = fs.stat(id).unwrap();
    assert_eq!(stat.size, 0);
    assert_eq!(stat.blocks, 0);
}

#[test]
fn stat() {
    let (image, _, b) = two_files();
    let fs = Initrd::load(&image, Config::default()).unwrap();

    let stat = fs.stat(InodeId::from(1)).unwrap();
    assert_eq!(stat.inode, 1);
    assert_eq!(stat.mode, DirEntryType::Regular);
    assert_eq!(stat.permission, Permission::from_mode(0o664));
    assert_eq!((stat.uid, stat.gid), (0, 0));
    assert_eq!(stat.size as usize, b.len());
    assert_eq!(stat.block_size as usize, BLOCK_SIZE);
    assert_eq!(stat.blocks, 3);

    let stat = fs.stat(fs.mount_point()).unwrap();
    assert_eq!(stat.mode, DirEntryType::Directory);
    assert_eq!(fs.stat(InodeId::from(1000)), Err(Error::NotFound));
}

#[test]
fn file_and_directory_misuse() {
    let (image, _, _) = two_files();
    let mut fs = Initrd::load(&image, Config::default()).unwrap();
    let mut buf = [0; 4];

    assert_eq!(fs.read(fs.mount_point(), 0, &mut buf), Err(Error::IsADirectory));
    assert_eq!(fs.write(fs.mount_point(), 0, &buf), Err(Error::IsADirectory));
    assert!(matches!(fs.entries(InodeId::from(0)), Err(Error::NotFound)));
    assert_eq!(fs.find_by_name(InodeId::from(0), "a"), Err(Error::NotFound));
}

#[test]
fn init_registers_stdio() {
    let (image, a, _) = two_files();
    let mut fds = FdTable::new(8);
    let mount = initrd::init(&image, Config::default(), &mut fds).unwrap();

    assert_eq!(fds.len(), 3);
    let names = mount.with_fs(|fs| {
        let dev = fs.dev();
        (0..3)
            .map(|fd| {
                let inode = fds.get(fd).unwrap().node.id() as u32;
                fs.node(InodeId::from(inode)).unwrap().name.clone()
            })
            .chain([fs.node(dev).unwrap().name.clone()])
            .collect::<Vec<_>>()
    });
    assert_eq!(names, ["stdin", "stdout", "stderr", "dev"]);

    let stdout = &fds.get(1).unwrap().node;
    assert_eq!(stdout.stat().unwrap().size, 1024);
    assert_eq!(stdout.write(0, b"hi"), Ok(2));

    // 挂载点
    assert_eq!(mount.stat().unwrap().mode, DirEntryType::Directory);
    let file = mount.finddir("a").unwrap();
    let mut buf = vec![0; a.len()];
    assert_eq!(file.read(0, &mut buf), Ok(a.len()));
    assert_eq!(buf, a);
    assert_eq!(mount.find("a").unwrap().read_all().unwrap(), a);
    assert_eq!(mount.readdir(0).unwrap().name, ".");

    // 能力不符
    assert_eq!(mount.read(0, &mut buf), Err(Error::Unsupported));
    assert_eq!(file.readdir(0), Err(Error::Unsupported));
    assert!(matches!(file.finddir("a"), Err(Error::Unsupported)));
}

#[test]
fn init_fails_without_descriptors() {
    let (image, _, _) = two_files();
    let mut fds = FdTable::new(2);

    assert!(matches!(
        initrd::init(&image, Config::default(), &mut fds),
        Err(BootstrapError::Stdio {
            name: "stderr",
            error: Error::NoSpace
        })
    ));
}

#[test]
fn arena_exhausted() {
    let (image, _, _) = two_files();
    let config = Config {
        max_blocks: 3,
        ..Config::default()
    };

    assert!(matches!(
        Initrd::load(&image, config),
        Err(BootstrapError::Fs(Error::NoSpace))
    ));
}

#[test]
fn node_table_full() {
    let (image, _, _) = two_files();
    let config = Config {
        max_nodes: 4,
        ..Config::default()
    };

    assert!(matches!(
        Initrd::load(&image, config),
        Err(BootstrapError::Fs(Error::NoSpace))
    ));
}

#[test]
fn duplicate_names() {
    let image = Archive::encode([("a", &b"1"[..]), ("a", &b"2"[..])]).unwrap();

    assert!(matches!(
        Initrd::load(&image, Config::default()),
        Err(BootstrapError::Fs(Error::AlreadyExists))
    ));
}

#[test]
fn truncated_archive() {
    let (image, _, _) = two_files();

    assert!(matches!(
        Initrd::load(&image[..10], Config::default()),
        Err(BootstrapError::Truncated)
    ));
    assert!(matches!(
        Initrd::load(&image[..image.len() - 1], Config::default()),
        Err(BootstrapError::PayloadOutOfBounds { index: 1 })
    ));
}

#[test]
fn large_file_round_trip() {
    use initrd::layout::{DIRECT_COUNT, INDIRECT1_COUNT};

    // 直接索引、一级索引，再进入二级索引
    let big = payload(BLOCK_SIZE * 300, 3);
    let image = Archive::encode([("big", big.as_slice())]).unwrap();
    let fs = Initrd::load(&image, Config::default()).unwrap();
    let id = InodeId::from(0);

    let mut buf = vec![0; big.len()];
    assert_eq!(fs.read(id, 0, &mut buf), Ok(big.len()));
    assert_eq!(buf, big);

    for boundary in [DIRECT_COUNT, DIRECT_COUNT + INDIRECT1_COUNT] {
        let offset = boundary * BLOCK_SIZE - 7;
        let mut buf = [0; 20];
        assert_eq!(fs.read(id, offset, &mut buf), Ok(20));
        assert_eq!(&buf[..], &big[offset..offset + 20]);
    }

    // 300个数据块、一级索引块、二级索引块及其下的一个一级索引块
    assert_eq!(fs.stat(id).unwrap().blocks, 303);
    assert_eq!(fs.arena().allocated(), 303 + 1 + 1 + 3);
}

#[test]
fn reserved_archive_names() {
    for name in [".", "..", "dev", "etc"] {
        assert!(matches!(
            Archive::encode([(name, &b"data"[..])]),
            Err(BootstrapError::BadName { index: 0 })
        ));
    }

    // 与保留名相近的名字照常加载
    let image = Archive::encode([("devices", &b"data"[..])]).unwrap();
    let fs = Initrd::load(&image, Config::default()).unwrap();
    assert_eq!(fs.find_by_name(fs.mount_point(), "devices"), Ok(InodeId::from(0)));
    assert_eq!(fs.find_by_name(fs.mount_point(), "dev"), Ok(fs.dev()));
}

#[test]
fn stale_handle() {
    let (image, _, _) = two_files();
    let mut fds = FdTable::new(8);
    let mount = initrd::init(&image, Config::default(), &mut fds).unwrap();
    let stale = mount.sibling(InodeId::from(1000));
    let mut buf = [0; 4];

    assert_eq!(stale.read(0, &mut buf), Err(Error::NotFound));
    assert_eq!(stale.write(0, &buf), Err(Error::NotFound));
    assert_eq!(stale.readdir(0), Err(Error::NotFound));
    assert!(matches!(stale.finddir("a"), Err(Error::NotFound)));
    assert_eq!(stale.stat(), Err(Error::NotFound));
    assert!(stale.capabilities().is_empty());
}
