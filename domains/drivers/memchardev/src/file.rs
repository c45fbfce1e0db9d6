use std::sync::Arc;

use kernel::{
    buf::{UserSlicePtrReader, UserSlicePtrWriter},
    error::KernelResult,
    fs::{self, File, FileOperations, SeekFrom},
};

use crate::device::{Device, Session};

/// An open `/dev/memchardev` file. All position state lives in the session, so the registrar's
/// file record never carries an offset.
pub struct MemCharFile {
    session: Session,
}

impl MemCharFile {
    fn read(&mut self, _file: &File, buf: &mut UserSlicePtrWriter<'_>) -> KernelResult<usize> {
        self.session.read(buf)
    }

    fn write(&mut self, _file: &File, buf: &mut UserSlicePtrReader<'_>) -> KernelResult<usize> {
        self.session.write(buf)
    }

    fn seek(&mut self, _file: &File, pos: SeekFrom) -> KernelResult<u64> {
        self.session.seek(pos)
    }
}

impl FileOperations for MemCharFile {
    type OpenData = Arc<Device>;

    fn open(device: &Arc<Device>, _file: &File) -> KernelResult<Self> {
        Ok(MemCharFile {
            session: device.open()?,
        })
    }

    fn release(self, _file: &File) {
        self.session.release();
    }

    const READ: fs::ReadFn<Self> = Some(Self::read);
    const WRITE: fs::WriteFn<Self> = Some(Self::write);
    const SEEK: fs::SeekFn<Self> = Some(Self::seek);
}
