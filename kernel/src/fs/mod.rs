pub mod file_operations;

pub use file_operations::{Fd, File, FileOperations, ReadFn, SeekFn, SeekFrom, WriteFn};

bitflags::bitflags! {
    /// Flags passed to `open(2)`. Only the access mode matters to character devices here.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenFlags: u32 {
        const O_WRONLY = 0o1;
        const O_RDWR = 0o2;
    }
}

impl OpenFlags {
    /// The access mode `O_RDONLY` is the absence of both write bits.
    pub const O_RDONLY: OpenFlags = OpenFlags::empty();

    pub fn readable(&self) -> bool {
        !self.contains(OpenFlags::O_WRONLY)
    }

    pub fn writable(&self) -> bool {
        self.intersects(OpenFlags::O_WRONLY | OpenFlags::O_RDWR)
    }
}
