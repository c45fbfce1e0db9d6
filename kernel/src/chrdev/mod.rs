//! Character devices.
//!
//! A [`Registration`] owns a region of device numbers and the devices attached to its minors. It
//! plays the part of the VFS for them: callers open a minor, get back an [`Fd`] and route every
//! later `read`/`write`/`llseek`/`release` through it.
//!
//! # Examples
//!
//! ```
//! use kernel::{chrdev, fs::OpenFlags};
//! # use kernel::{error::KernelResult, fs::{File, FileOperations}};
//! # struct Nothing;
//! # impl FileOperations for Nothing {
//! #     type OpenData = ();
//! #     fn open(_: &(), _: &File) -> KernelResult<Self> { Ok(Nothing) }
//! # }
//!
//! let registration = chrdev::builder("nothing", 0..1)?
//!     .register_device::<Nothing>(())
//!     .build()?;
//! let fd = registration.open(0, OpenFlags::O_RDONLY)?;
//! registration.release(fd)?;
//! # Ok::<(), kernel::error::Error>(())
//! ```

mod major;

use core::{marker::PhantomData, ops::Range};
use std::{collections::BTreeMap, sync::Arc};

use log::{debug, info, warn};
pub use major::{
    CHRDEV_MAJOR_DYN_END, CHRDEV_MAJOR_DYN_EXT_END, CHRDEV_MAJOR_DYN_EXT_START, CHRDEV_MAJOR_MAX,
};
use spin::Mutex;

use crate::{
    buf::{UserSlicePtrReader, UserSlicePtrWriter},
    code::{EBADF, EINVAL, EMFILE, ENXIO, ESPIPE},
    error::KernelResult,
    fs::{Fd, File, FileOperations, OpenFlags, SeekFrom},
};

pub const MINORBITS: u32 = 20;
pub const MINORMASK: u32 = (1 << MINORBITS) - 1;
/// Largest number of minors a single registration may span.
pub const MAX_MINORS: usize = 256;
/// Most files a registration keeps open at once. From include/uapi/linux/fs.h
pub const NR_OPEN: usize = 1024 * 1024;

/// Packs a major and a minor into a `dev_t`.
pub const fn mkdev(major: u32, minor: u32) -> u32 {
    (major << MINORBITS) | (minor & MINORMASK)
}

pub const fn major(dev: u32) -> u32 {
    dev >> MINORBITS
}

pub const fn minor(dev: u32) -> u32 {
    dev & MINORMASK
}

/// Starts a registration named `name` spanning `minors`.
pub fn builder(name: &'static str, minors: Range<u16>) -> KernelResult<Builder> {
    if name.is_empty() || minors.is_empty() || minors.len() > MAX_MINORS {
        return Err(EINVAL);
    }
    Ok(Builder {
        name,
        minors,
        major: 0,
        devices: Vec::new(),
    })
}

pub struct Builder {
    name: &'static str,
    minors: Range<u16>,
    major: u32,
    devices: Vec<Box<dyn Device>>,
}

impl Builder {
    /// Requests a fixed major instead of a dynamically allocated one.
    pub fn major(mut self, major: u32) -> Self {
        self.major = major;
        self
    }

    /// Attaches a device of type `T` to the next free minor.
    pub fn register_device<T: FileOperations>(mut self, shared: T::OpenData) -> Self {
        self.devices.push(Box::new(DeviceEntry::<T> {
            shared,
            _marker: PhantomData,
        }));
        self
    }

    pub fn build(self) -> KernelResult<Registration> {
        if self.devices.len() > self.minors.len() {
            return Err(EINVAL);
        }
        let major = major::claim(self.major)?;
        info!(
            "{}: registered major {} minors {}..{}",
            self.name, major, self.minors.start, self.minors.end
        );
        Ok(Registration {
            name: self.name,
            major,
            minors: self.minors,
            devices: self.devices,
            table: Mutex::new(FdTable::default()),
        })
    }
}

/// A live character device registration. Dropping it releases every file still open and
/// gives the device numbers back.
pub struct Registration {
    name: &'static str,
    major: u32,
    minors: Range<u16>,
    devices: Vec<Box<dyn Device>>,
    table: Mutex<FdTable>,
}

impl Registration {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    /// Returns the `dev_t` of `minor`, if a device is attached to it.
    pub fn devt(&self, minor: u16) -> Option<u32> {
        self.index_of(minor)
            .map(|_| mkdev(self.major, u32::from(minor)))
    }

    /// Number of files currently open across all minors.
    pub fn open_files(&self) -> usize {
        self.table.lock().files.values().flatten().count()
    }

    pub fn open(&self, minor: u16, flags: OpenFlags) -> KernelResult<Fd> {
        let index = self.index_of(minor).ok_or(ENXIO)?;
        let fd = self.table.lock().reserve()?;
        let file = File::new(fd, minor, flags);
        let state = match self.devices[index].open(&file) {
            Ok(state) => state,
            Err(e) => {
                self.table.lock().files.remove(&fd);
                warn!("{}: open of minor {} refused: {:?}", self.name, minor, e);
                return Err(e);
            }
        };
        let open = OpenFile {
            file,
            state: Some(state),
        };
        self.table
            .lock()
            .files
            .insert(fd, Some(Arc::new(Mutex::new(open))));
        info!("{}: device opened (minor {}, fd {})", self.name, minor, fd);
        Ok(fd)
    }

    pub fn read(&self, fd: Fd, writer: &mut UserSlicePtrWriter<'_>) -> KernelResult<usize> {
        let open = self.lookup(fd)?;
        let mut open = open.lock();
        let OpenFile { file, state } = &mut *open;
        let state = state.as_mut().ok_or(EBADF)?;
        if !file.flags().readable() {
            return Err(EBADF);
        }
        let requested = writer.len();
        let ret = state.read(file, writer);
        debug!("{}: read fd {} requested {} -> {:?}", self.name, fd, requested, ret);
        ret
    }

    pub fn write(&self, fd: Fd, reader: &mut UserSlicePtrReader<'_>) -> KernelResult<usize> {
        let open = self.lookup(fd)?;
        let mut open = open.lock();
        let OpenFile { file, state } = &mut *open;
        let state = state.as_mut().ok_or(EBADF)?;
        if !file.flags().writable() {
            return Err(EBADF);
        }
        let requested = reader.len();
        let ret = state.write(file, reader);
        debug!("{}: write fd {} requested {} -> {:?}", self.name, fd, requested, ret);
        ret
    }

    pub fn llseek(&self, fd: Fd, pos: SeekFrom) -> KernelResult<u64> {
        let open = self.lookup(fd)?;
        let mut open = open.lock();
        let OpenFile { file, state } = &mut *open;
        let ret = state.as_mut().ok_or(EBADF)?.seek(file, pos);
        debug!("{}: llseek fd {} {:?} -> {:?}", self.name, fd, pos, ret);
        ret
    }

    /// Closes `fd`. Releasing a descriptor that is not open fails with [`EBADF`].
    ///
    /// Waits for calls already running on `fd` to return before the driver sees the release.
    pub fn release(&self, fd: Fd) -> KernelResult {
        let removed = {
            let mut table = self.table.lock();
            match table.files.get(&fd) {
                Some(Some(_)) => table.files.remove(&fd).flatten(),
                _ => None,
            }
        };
        let Some(open) = removed else {
            warn!("{}: release of unknown fd {}", self.name, fd);
            return Err(EBADF);
        };
        let minor = OpenFile::close(&open);
        info!("{}: device closed (minor {}, fd {})", self.name, minor, fd);
        Ok(())
    }

    fn lookup(&self, fd: Fd) -> KernelResult<Arc<Mutex<OpenFile>>> {
        match self.table.lock().files.get(&fd) {
            Some(Some(open)) => Ok(open.clone()),
            _ => Err(EBADF),
        }
    }

    fn index_of(&self, minor: u16) -> Option<usize> {
        let index = usize::from(minor.checked_sub(self.minors.start)?);
        (index < self.devices.len()).then_some(index)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let files = core::mem::take(&mut self.table.lock().files);
        for open in files.into_values().flatten() {
            OpenFile::close(&open);
        }
        major::release(self.major);
        info!("{}: unregistered major {}", self.name, self.major);
    }
}

/// Open files by descriptor. A `None` slot is reserved for an open still in the driver.
#[derive(Default)]
struct FdTable {
    files: BTreeMap<Fd, Option<Arc<Mutex<OpenFile>>>>,
    next: u32,
}

impl FdTable {
    /// Reserves the next descriptor not in use, wrapping around `u32`.
    fn reserve(&mut self) -> KernelResult<Fd> {
        if self.files.len() >= NR_OPEN {
            return Err(EMFILE);
        }
        loop {
            let fd = Fd(self.next);
            self.next = self.next.wrapping_add(1);
            if !self.files.contains_key(&fd) {
                self.files.insert(fd, None);
                return Ok(fd);
            }
        }
    }
}

struct OpenFile {
    file: File,
    /// Taken on release; calls that looked the file up before that see [`EBADF`].
    state: Option<Box<dyn OpenState>>,
}

impl OpenFile {
    /// Hands the state back to the driver and returns the minor it was open on.
    fn close(open: &Mutex<OpenFile>) -> u16 {
        let mut open = open.lock();
        if let Some(state) = open.state.take() {
            state.release(&open.file);
        }
        open.file.minor()
    }
}

/// Type-erased per-open state of some `T: FileOperations`.
trait OpenState: Send {
    fn read(&mut self, file: &File, writer: &mut UserSlicePtrWriter<'_>) -> KernelResult<usize>;
    fn write(&mut self, file: &File, reader: &mut UserSlicePtrReader<'_>) -> KernelResult<usize>;
    fn seek(&mut self, file: &File, pos: SeekFrom) -> KernelResult<u64>;
    fn release(self: Box<Self>, file: &File);
}

struct FileState<T>(T);

impl<T: FileOperations> OpenState for FileState<T> {
    fn read(&mut self, file: &File, writer: &mut UserSlicePtrWriter<'_>) -> KernelResult<usize> {
        match T::READ {
            Some(read) => read(&mut self.0, file, writer),
            None => Err(EINVAL),
        }
    }

    fn write(&mut self, file: &File, reader: &mut UserSlicePtrReader<'_>) -> KernelResult<usize> {
        match T::WRITE {
            Some(write) => write(&mut self.0, file, reader),
            None => Err(EINVAL),
        }
    }

    fn seek(&mut self, file: &File, pos: SeekFrom) -> KernelResult<u64> {
        match T::SEEK {
            Some(seek) => seek(&mut self.0, file, pos),
            None => Err(ESPIPE),
        }
    }

    fn release(self: Box<Self>, file: &File) {
        self.0.release(file)
    }
}

/// Type-erased device attached to one minor.
trait Device: Send + Sync {
    fn open(&self, file: &File) -> KernelResult<Box<dyn OpenState>>;
}

struct DeviceEntry<T: FileOperations> {
    shared: T::OpenData,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FileOperations> Device for DeviceEntry<T> {
    fn open(&self, file: &File) -> KernelResult<Box<dyn OpenState>> {
        let state = T::open(&self.shared, file)?;
        Ok(Box::new(FileState(state)))
    }
}
