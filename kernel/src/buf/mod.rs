//! Transfers between caller ("user") memory and driver buffers.
//!
//! Drivers never touch caller memory directly. Every byte crosses through a [`UserAccess`]
//! implementation supplied by whoever routes the file call, wrapped in the
//! [`UserSlicePtrReader`]/[`UserSlicePtrWriter`] cursors handed to the driver.

mod memory;
mod user_ptr;

pub use memory::*;
pub use user_ptr::*;

/// The type used for userspace addresses.
pub type UserPtr = usize;

/// The copy primitive between a caller's address space and the driver.
///
/// Both methods follow `copy_{from,to}_user`: they return the number of bytes that could
/// *not* be copied, so `0` means success.
pub trait UserAccess: Send + Sync {
    /// Copies `out.len()` bytes starting at `src` into `out`.
    fn copy_from_user(&self, src: UserPtr, out: &mut [u8]) -> usize;

    /// Copies `data` to the caller's memory starting at `dst`.
    fn copy_to_user(&self, dst: UserPtr, data: &[u8]) -> usize;
}
