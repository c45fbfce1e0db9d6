//! Process-wide bookkeeping of character device major numbers.

use std::collections::BTreeSet;

use spin::Mutex;

use crate::{
    code::{EBUSY, EINVAL},
    error::KernelResult,
};

pub const CHRDEV_MAJOR_MAX: u32 = 512;
/// Dynamic majors are handed out from 254 down to this one first.
pub const CHRDEV_MAJOR_DYN_END: u32 = 234;
/// Then from this one down to [`CHRDEV_MAJOR_DYN_EXT_END`].
pub const CHRDEV_MAJOR_DYN_EXT_START: u32 = 511;
pub const CHRDEV_MAJOR_DYN_EXT_END: u32 = 384;

static MAJORS: Mutex<BTreeSet<u32>> = Mutex::new(BTreeSet::new());

/// Claims `major`, or the first free dynamic major when `major` is 0.
pub(crate) fn claim(major: u32) -> KernelResult<u32> {
    if major >= CHRDEV_MAJOR_MAX {
        return Err(EINVAL);
    }
    let mut used = MAJORS.lock();
    let major = if major == 0 {
        (CHRDEV_MAJOR_DYN_END..=254)
            .rev()
            .chain((CHRDEV_MAJOR_DYN_EXT_END..=CHRDEV_MAJOR_DYN_EXT_START).rev())
            .find(|m| !used.contains(m))
            .ok_or(EBUSY)?
    } else {
        major
    };
    if !used.insert(major) {
        return Err(EBUSY);
    }
    Ok(major)
}

pub(crate) fn release(major: u32) {
    MAJORS.lock().remove(&major);
}
