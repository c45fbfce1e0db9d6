//! The per-file vtable a character device driver fills in.
//!
//! Like `struct file_operations`, every entry except `open` is optional: a driver sets the
//! associated constant to `Some(handler)` for each call it supports and the registrar answers
//! the rest with the usual errno.

use core::fmt;

use super::OpenFlags;
use crate::{
    buf::{UserSlicePtrReader, UserSlicePtrWriter},
    error::KernelResult,
};

/// Identifies an open file within a registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fd(pub(crate) u32);

impl Fd {
    pub fn as_raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the registrar knows about an open file. It carries no file position: drivers keep
/// their own.
#[derive(Debug, Clone)]
pub struct File {
    fd: Fd,
    minor: u16,
    flags: OpenFlags,
}

impl File {
    pub(crate) fn new(fd: Fd, minor: u16, flags: OpenFlags) -> Self {
        File { fd, minor, flags }
    }

    pub fn fd(&self) -> Fd {
        self.fd
    }

    pub fn minor(&self) -> u16 {
        self.minor
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }
}

/// Equivalent to [`std::io::SeekFrom`].
///
/// [`std::io::SeekFrom`]: https://doc.rust-lang.org/std/io/enum.SeekFrom.html
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    /// Sets the cursor to the given number of bytes.
    Start(u64),
    /// Sets the cursor to the end of the valid data plus the given number of bytes.
    End(i64),
    /// Sets the cursor to the current position plus the given number of bytes.
    Current(i64),
}

pub type ReadFn<T> =
    Option<fn(&mut T, &File, &mut UserSlicePtrWriter<'_>) -> KernelResult<usize>>;
pub type WriteFn<T> =
    Option<fn(&mut T, &File, &mut UserSlicePtrReader<'_>) -> KernelResult<usize>>;
pub type SeekFn<T> = Option<fn(&mut T, &File, SeekFrom) -> KernelResult<u64>>;

/// Operations of a character device file.
///
/// `Self` is the per-open state; it is created by [`FileOperations::open`] and handed back to
/// [`FileOperations::release`] when the file is closed.
pub trait FileOperations: Sized + Send + 'static {
    /// State shared by every open of the device, owned by the registration.
    type OpenData: Send + Sync + 'static;

    /// Called on `open(2)`. An error refuses the open.
    fn open(shared: &Self::OpenData, file: &File) -> KernelResult<Self>;

    /// Called on the last `close(2)`.
    fn release(self, _file: &File) {}

    const READ: ReadFn<Self> = None;
    const WRITE: WriteFn<Self> = None;
    const SEEK: SeekFn<Self> = None;
}
