//! Kernel-style errors.
//!
//! An [`Error`] is a negative `errno` value, exactly what a file operation hands back to the
//! caller of `open(2)`, `read(2)` and friends.

use core::{
    convert::Infallible,
    ffi::c_int,
    fmt::{self, Debug, Display},
    num::TryFromIntError,
    str::Utf8Error,
};
use std::collections::TryReserveError;

use crate::pr_warn;

/// Largest errno a kernel routine may return.
pub const MAX_ERRNO: c_int = 4095;

pub type KernelResult<T = ()> = Result<T, Error>;

/// A negative errno.
///
/// # Invariants
///
/// The value is always in the range `-MAX_ERRNO..0`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Error(c_int);

impl Error {
    pub fn from_errno(errno: c_int) -> Error {
        if errno < -MAX_ERRNO || errno >= 0 {
            pr_warn!(
                "attempted to create `Error` with out of range `errno`: {}\n",
                errno
            );
            return linux_err::EINVAL;
        }
        // INVARIANT: The check above ensures the type invariant
        // will hold.
        Error(errno)
    }

    pub fn to_errno(&self) -> c_int {
        self.0
    }

    /// Returns the symbolic name of the error, if one exists.
    pub fn name(&self) -> Option<&'static str> {
        linux_err::lookup(-self.0).map(|(name, _)| name)
    }

    /// Returns the human readable description of the error, if one exists.
    pub fn description(&self) -> Option<&'static str> {
        linux_err::lookup(-self.0).map(|(_, desc)| desc)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            // Print out number if no name can be found.
            None => f.debug_tuple("Error").field(&-self.0).finish(),
            Some(name) => f.debug_tuple(name).finish(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.description() {
            None => write!(f, "unknown error {}", -self.0),
            Some(desc) => f.write_str(desc.trim_end_matches('.')),
        }
    }
}

impl std::error::Error for Error {}

/// Contains the C-compatible error codes.
#[rustfmt::skip]
#[allow(unused)]
pub mod linux_err {
    macro_rules! declare_err {
        ($($err:ident = $num:literal, $doc:literal;)+) => {
            $(
            #[doc = $doc]
            pub const $err: super::Error = super::Error(-$num);
            )+

            pub(crate) fn lookup(errno: core::ffi::c_int) -> Option<(&'static str, &'static str)> {
                match errno {
                    $($num => Some((stringify!($err), $doc)),)+
                    _ => None,
                }
            }
        };
    }

    declare_err! {
        EPERM = 1, "Operation not permitted.";
        ENOENT = 2, "No such file or directory.";
        EINTR = 4, "Interrupted system call.";
        EIO = 5, "I/O error.";
        ENXIO = 6, "No such device or address.";
        EBADF = 9, "Bad file number.";
        EAGAIN = 11, "Try again.";
        ENOMEM = 12, "Out of memory.";
        EACCES = 13, "Permission denied.";
        EFAULT = 14, "Bad address.";
        EBUSY = 16, "Device or resource busy.";
        EEXIST = 17, "File exists.";
        ENODEV = 19, "No such device.";
        EINVAL = 22, "Invalid argument.";
        ENFILE = 23, "File table overflow.";
        EMFILE = 24, "Too many open files.";
        ENOTTY = 25, "Not a typewriter.";
        EFBIG = 27, "File too large.";
        ENOSPC = 28, "No space left on device.";
        ESPIPE = 29, "Illegal seek.";
        EROFS = 30, "Read-only file system.";
        ERANGE = 34, "Math result not representable.";
    }
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Error {
        linux_err::ENOMEM
    }
}

impl From<TryFromIntError> for Error {
    fn from(_: TryFromIntError) -> Error {
        linux_err::EINVAL
    }
}

impl From<Utf8Error> for Error {
    fn from(_: Utf8Error) -> Error {
        linux_err::EINVAL
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Error {
        linux_err::EINVAL
    }
}

impl From<Infallible> for Error {
    fn from(e: Infallible) -> Error {
        match e {}
    }
}

#[cfg(test)]
mod tests {
    use super::{linux_err::*, *};

    #[test]
    fn errno_round_trip() {
        assert_eq!(Error::from_errno(-16), EBUSY);
        assert_eq!(EFAULT.to_errno(), -14);
        assert_eq!(ENOMEM.name(), Some("ENOMEM"));
    }

    #[test]
    fn out_of_range_errno_is_einval() {
        assert_eq!(Error::from_errno(0), EINVAL);
        assert_eq!(Error::from_errno(5), EINVAL);
        assert_eq!(Error::from_errno(-(MAX_ERRNO + 1)), EINVAL);
    }

    #[test]
    fn formatting() {
        assert_eq!(format!("{:?}", EBADF), "EBADF");
        assert_eq!(format!("{:?}", Error::from_errno(-200)), "Error(200)");
        assert_eq!(EBUSY.to_string(), "Device or resource busy");
        assert_eq!(Error::from_errno(-200).to_string(), "unknown error 200");
    }

    #[test]
    fn conversions() {
        let e: Error = u8::try_from(300u32).unwrap_err().into();
        assert_eq!(e, EINVAL);
        let mut v: Vec<u8> = Vec::new();
        let e: Error = v.try_reserve(usize::MAX).unwrap_err().into();
        assert_eq!(e, ENOMEM);
    }
}
