use super::{UserAccess, UserPtr};
use crate::{code::EFAULT, error::KernelResult as Result};

/// A pointer to an area in caller memory, paired with the accessor able to reach it.
///
/// The pointer is not checked beyond `access_ok`-style overflow checks; every actual copy can
/// still fail with [`EFAULT`].
pub struct UserSlicePtr<'a> {
    access: &'a dyn UserAccess,
    ptr: UserPtr,
    length: usize,
}

impl<'a> UserSlicePtr<'a> {
    /// Constructs a user slice from an address and a length in bytes.
    ///
    /// Fails with [`EFAULT`] when the range wraps around the address space.
    pub fn new(access: &'a dyn UserAccess, ptr: UserPtr, length: usize) -> Result<Self> {
        ptr.checked_add(length).ok_or(EFAULT)?;
        Ok(UserSlicePtr {
            access,
            ptr,
            length,
        })
    }

    /// Reads the entirety of the user slice and returns it in a `Vec`.
    ///
    /// Returns EFAULT if the address does not currently point to
    /// mapped, readable memory.
    pub fn read_all(self) -> Result<Vec<u8>> {
        self.reader().read_all()
    }

    /// Constructs a [`UserSlicePtrReader`] that can incrementally read from the user slice.
    pub fn reader(self) -> UserSlicePtrReader<'a> {
        UserSlicePtrReader {
            access: self.access,
            ptr: self.ptr,
            length: self.length,
        }
    }

    /// Writes the provided slice into the user slice.
    ///
    /// Returns EFAULT if the address does not currently point to
    /// mapped, writable memory (in which case some data from before the
    /// fault may be written), or `data` is larger than the user slice
    /// (in which case no data is written).
    pub fn write_all(self, data: &[u8]) -> Result {
        self.writer().write_slice(data)
    }

    /// Constructs a [`UserSlicePtrWriter`] that can incrementally write into the user slice.
    pub fn writer(self) -> UserSlicePtrWriter<'a> {
        UserSlicePtrWriter {
            access: self.access,
            ptr: self.ptr,
            length: self.length,
        }
    }
}

/// A reader for [`UserSlicePtr`].
///
/// Used to incrementally read from the user slice.
pub struct UserSlicePtrReader<'a> {
    access: &'a dyn UserAccess,
    ptr: UserPtr,
    length: usize,
}

impl UserSlicePtrReader<'_> {
    /// Returns the number of bytes left to be read from this reader.
    ///
    /// Note that even reading less than this number of bytes may fail.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if no data is available in the io buffer.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Skip the provided number of bytes.
    ///
    /// Returns an error if skipping more than the length of the buffer.
    pub fn skip(&mut self, num_skip: usize) -> Result {
        // Update `self.length` first since that's the fallible part of this operation.
        self.length = self.length.checked_sub(num_skip).ok_or(EFAULT)?;
        self.ptr = self.ptr.wrapping_add(num_skip);
        Ok(())
    }

    /// Reads `out.len()` bytes from the user slice into a kernel buffer.
    ///
    /// Fails with [`EFAULT`] if the read happens on a bad address, or if the read goes out of
    /// bounds of this reader. This call may modify `out` even if it returns an error, and the
    /// reader only advances on success.
    pub fn read_slice(&mut self, out: &mut [u8]) -> Result {
        let len = out.len();
        if len > self.length {
            return Err(EFAULT);
        }
        if self.access.copy_from_user(self.ptr, out) != 0 {
            return Err(EFAULT);
        }
        self.ptr = self.ptr.wrapping_add(len);
        self.length -= len;
        Ok(())
    }

    /// Reads the entirety of the user slice.
    ///
    /// Fails with [`EFAULT`] if the read happens on a bad address.
    pub fn read_all(mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(self.length)?;
        buf.resize(self.length, 0);
        self.read_slice(&mut buf)?;
        Ok(buf)
    }
}

/// A writer for [`UserSlicePtr`].
///
/// Used to incrementally write into the user slice.
pub struct UserSlicePtrWriter<'a> {
    access: &'a dyn UserAccess,
    ptr: UserPtr,
    length: usize,
}

impl UserSlicePtrWriter<'_> {
    /// Returns the amount of space remaining in this buffer.
    ///
    /// Note that even writing less than this number of bytes may fail.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if no more data can be written to this buffer.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Writes `data` to the user slice.
    ///
    /// Fails with [`EFAULT`] if the write happens on a bad address, or if the write goes out of
    /// bounds of this writer. Some bytes may have reached the caller even on failure, but the
    /// writer only advances on success.
    pub fn write_slice(&mut self, data: &[u8]) -> Result {
        let len = data.len();
        if len > self.length {
            return Err(EFAULT);
        }
        if self.access.copy_to_user(self.ptr, data) != 0 {
            return Err(EFAULT);
        }
        self.ptr = self.ptr.wrapping_add(len);
        self.length -= len;
        Ok(())
    }
}
