use std::{
    sync::{Arc, Barrier},
    thread,
};

use kernel::{
    buf::{UserMemory, UserPtr, UserSlicePtr},
    chrdev::Registration,
    code::{EBADF, EBUSY, EFAULT, EINVAL, ENOMEM, ENXIO},
    error::KernelResult,
    fs::{Fd, OpenFlags, SeekFrom},
    Module, ThisModule,
};
use memchardev::{DeviceConfig, MemCharDev, BUFFER_SIZE, THIS_MODULE};

const SRC: UserPtr = 0x10_0000;
const DST: UserPtr = 0x20_0000;

/// A caller process: its own address space plus the calls a C program would make.
struct Client<'a> {
    reg: &'a Registration,
    mem: UserMemory,
}

impl<'a> Client<'a> {
    fn new(module: &'a MemCharDev) -> Self {
        Client {
            reg: module.registration(),
            mem: UserMemory::new(),
        }
    }

    fn open(&self, flags: OpenFlags) -> KernelResult<Fd> {
        self.reg.open(0, flags)
    }

    fn write(&self, fd: Fd, data: &[u8]) -> KernelResult<usize> {
        let _ = self.mem.unmap(SRC);
        self.mem.map_bytes(SRC, data)?;
        let mut reader = UserSlicePtr::new(&self.mem, SRC, data.len())?.reader();
        self.reg.write(fd, &mut reader)
    }

    fn read(&self, fd: Fd, count: usize) -> KernelResult<Vec<u8>> {
        let _ = self.mem.unmap(DST);
        self.mem.map(DST, count.max(1))?;
        let mut writer = UserSlicePtr::new(&self.mem, DST, count)?.writer();
        let n = self.reg.read(fd, &mut writer)?;
        self.mem.peek(DST, n)
    }
}

fn module(capacity: usize) -> MemCharDev {
    MemCharDev::with_config(&DeviceConfig::default().with_capacity(capacity)).unwrap()
}

#[test]
fn concurrent_opens_admit_exactly_one() {
    let module = module(BUFFER_SIZE);
    let reg = module.registration();
    let threads = 8;
    let barrier = Barrier::new(threads);

    let results: Vec<KernelResult<Fd>> = thread::scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    reg.open(0, OpenFlags::O_RDWR)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners: Vec<Fd> = results.iter().filter_map(|r| r.ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(results
        .iter()
        .filter(|r| r.is_err())
        .all(|r| *r == Err(EBUSY)));

    // Still busy until the winner closes.
    assert_eq!(reg.open(0, OpenFlags::O_RDWR), Err(EBUSY));
    reg.release(winners[0]).unwrap();
    let fd = reg.open(0, OpenFlags::O_RDWR).unwrap();
    reg.release(fd).unwrap();
}

#[test]
fn reopening_resets_the_device() {
    let module = module(BUFFER_SIZE);
    let client = Client::new(&module);

    let fd = client.open(OpenFlags::O_WRONLY).unwrap();
    assert_eq!(client.write(fd, b"barev"), Ok(5));
    client.reg.release(fd).unwrap();
    assert_eq!(module.device(0).unwrap().data_size(), 5);

    let fd = client.open(OpenFlags::O_RDONLY).unwrap();
    assert_eq!(module.device(0).unwrap().data_size(), 0);
    assert_eq!(client.read(fd, 6).unwrap(), b"");
    client.reg.release(fd).unwrap();
}

#[test]
fn one_cursor_for_reads_and_writes() {
    let module = module(BUFFER_SIZE);
    let client = Client::new(&module);

    let fd = client.open(OpenFlags::O_RDWR).unwrap();
    let msg = b"Hello from user space!";
    assert_eq!(client.write(fd, msg), Ok(msg.len()));
    assert_eq!(client.read(fd, BUFFER_SIZE).unwrap(), b"");

    assert_eq!(client.reg.llseek(fd, SeekFrom::Start(0)), Ok(0));
    assert_eq!(client.read(fd, BUFFER_SIZE).unwrap(), msg);
    client.reg.release(fd).unwrap();
}

#[test]
fn writes_clamp_at_capacity() {
    let capacity = 64;
    let module = module(capacity);
    let client = Client::new(&module);

    let fd = client.open(OpenFlags::O_RDWR).unwrap();
    assert_eq!(client.write(fd, &vec![0xa5; capacity + 100]), Ok(capacity));
    assert_eq!(module.device(0).unwrap().data_size(), capacity);
    assert_eq!(client.write(fd, b"more"), Err(ENOMEM));

    client.reg.llseek(fd, SeekFrom::Start(0)).unwrap();
    assert_eq!(client.read(fd, capacity * 2).unwrap(), vec![0xa5; capacity]);
    client.reg.release(fd).unwrap();
}

#[test]
fn partial_read_at_end_of_data() {
    let module = module(BUFFER_SIZE);
    let client = Client::new(&module);

    let fd = client.open(OpenFlags::O_RDWR).unwrap();
    client.write(fd, b"0123456789").unwrap();
    assert_eq!(client.reg.llseek(fd, SeekFrom::End(-2)), Ok(8));
    assert_eq!(client.read(fd, 100).unwrap(), b"89");
    assert_eq!(client.read(fd, 100).unwrap(), b"");
    client.reg.release(fd).unwrap();
}

#[test]
fn double_release_is_ebadf() {
    let module = module(BUFFER_SIZE);
    let client = Client::new(&module);

    let fd = client.open(OpenFlags::O_RDWR).unwrap();
    client.write(fd, b"abc").unwrap();
    client.reg.release(fd).unwrap();
    assert_eq!(client.reg.release(fd), Err(EBADF));
    assert_eq!(client.write(fd, b"x"), Err(EBADF));

    // The device is unaffected and can be opened again.
    let device = module.device(0).unwrap();
    assert!(!device.is_open());
    assert_eq!(device.data_size(), 3);
    let fd = client.open(OpenFlags::O_RDWR).unwrap();
    client.reg.release(fd).unwrap();
}

#[test]
fn faults_do_not_end_the_session() {
    let module = module(BUFFER_SIZE);
    let client = Client::new(&module);
    let reg = client.reg;

    let fd = client.open(OpenFlags::O_RDWR).unwrap();
    client.write(fd, b"abc").unwrap();

    let mut reader = UserSlicePtr::new(&client.mem, 0xbad_0000, 8).unwrap().reader();
    assert_eq!(reg.write(fd, &mut reader), Err(EFAULT));
    assert_eq!(module.device(0).unwrap().data_size(), 3);

    assert_eq!(client.write(fd, b"def"), Ok(3));
    reg.llseek(fd, SeekFrom::Start(0)).unwrap();
    assert_eq!(client.read(fd, 10).unwrap(), b"abcdef");
    reg.release(fd).unwrap();
}

#[test]
fn access_mode_is_enforced() {
    let module = module(BUFFER_SIZE);
    let client = Client::new(&module);

    let fd = client.open(OpenFlags::O_RDONLY).unwrap();
    assert_eq!(client.write(fd, b"abc"), Err(EBADF));
    client.reg.release(fd).unwrap();

    let fd = client.open(OpenFlags::O_WRONLY).unwrap();
    assert_eq!(client.read(fd, 3), Err(EBADF));
    assert_eq!(client.reg.llseek(fd, SeekFrom::Start(2000)), Err(EINVAL));
    client.reg.release(fd).unwrap();
}

#[test]
fn minors_are_independent_devices() {
    let module =
        MemCharDev::with_config(&DeviceConfig::default().with_capacity(16).with_minors(2))
            .unwrap();
    let reg = module.registration();
    let mem = UserMemory::new();
    mem.map_bytes(SRC, b"zero").unwrap();

    let a = reg.open(0, OpenFlags::O_RDWR).unwrap();
    let b = reg.open(1, OpenFlags::O_RDWR).unwrap();
    assert_eq!(reg.open(2, OpenFlags::O_RDWR), Err(ENXIO));

    let mut reader = UserSlicePtr::new(&mem, SRC, 4).unwrap().reader();
    assert_eq!(reg.write(a, &mut reader), Ok(4));
    assert_eq!(module.device(0).unwrap().data_size(), 4);
    assert_eq!(module.device(1).unwrap().data_size(), 0);

    reg.release(a).unwrap();
    reg.release(b).unwrap();
}

#[test]
fn module_init_registers_default_device() {
    let module = MemCharDev::init(&THIS_MODULE).unwrap();
    let reg = module.registration();
    assert_eq!(reg.name(), "memchardev");
    assert!(reg.devt(0).is_some());
    assert_eq!(module.device(0).unwrap().capacity(), BUFFER_SIZE);

    reg.open(0, OpenFlags::O_RDWR).unwrap();
    let device = Arc::clone(module.device(0).unwrap());
    assert!(device.is_open());
    // Unloading closes whatever is still open.
    drop(module);
    assert!(!device.is_open());
}

#[test]
fn module_params_size_the_devices() {
    static TUNED: ThisModule =
        ThisModule::with_params("memchardev-tuned", "capacity=4096 minors=2");
    static BROKEN: ThisModule = ThisModule::with_params("memchardev-broken", "capacity=0");

    let module = MemCharDev::init(&TUNED).unwrap();
    assert_eq!(module.registration().name(), "memchardev-tuned");
    assert_eq!(module.device(0).unwrap().capacity(), 4096);
    assert_eq!(module.device(1).unwrap().capacity(), 4096);
    assert!(module.device(2).is_none());

    let client = Client::new(&module);
    let fd = client.open(OpenFlags::O_RDWR).unwrap();
    assert_eq!(client.write(fd, &vec![7; 3000]), Ok(3000));
    client.reg.release(fd).unwrap();

    assert!(matches!(MemCharDev::init(&BROKEN), Err(EINVAL)));
}
