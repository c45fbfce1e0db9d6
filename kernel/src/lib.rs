//! A host-side rendition of the kernel's character device plumbing.
//!
//! Drivers written against this crate look like in-tree Rust drivers: they implement
//! [`fs::FileOperations`], attach to a [`chrdev::Registration`], move bytes only through
//! [`buf::UserSlicePtrReader`]/[`buf::UserSlicePtrWriter`] and report failures as
//! [`error::Error`] errnos.

pub mod buf;
pub mod chrdev;
pub mod error;
pub mod fs;
pub mod logger;
pub mod module;
pub mod print;

pub use error::linux_err as code;
pub use module::{Module, ThisModule};
