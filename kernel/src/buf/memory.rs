use std::collections::BTreeMap;

use spin::Mutex;

use super::{UserAccess, UserPtr};
use crate::{
    code::{EEXIST, EFAULT, EINVAL, ENOENT},
    error::KernelResult as Result,
};

/// An in-process model of one caller's address space.
///
/// Memory is a set of mapped segments keyed by their start address. Any copy that touches an
/// address outside every segment stops there, exactly like a fault in `copy_from_user`.
pub struct UserMemory {
    segments: Mutex<BTreeMap<UserPtr, Vec<u8>>>,
}

impl UserMemory {
    pub fn new() -> Self {
        UserMemory {
            segments: Mutex::new(BTreeMap::new()),
        }
    }

    /// Maps `len` zeroed bytes at `addr`.
    pub fn map(&self, addr: UserPtr, len: usize) -> Result {
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize(len, 0);
        self.insert(addr, data)
    }

    /// Maps a copy of `data` at `addr`.
    pub fn map_bytes(&self, addr: UserPtr, data: &[u8]) -> Result {
        self.insert(addr, data.to_vec())
    }

    /// Removes the segment starting at `addr`, returning its contents.
    pub fn unmap(&self, addr: UserPtr) -> Result<Vec<u8>> {
        self.segments.lock().remove(&addr).ok_or(ENOENT)
    }

    /// Returns `len` bytes at `addr`, failing if any of them is unmapped.
    pub fn peek(&self, addr: UserPtr, len: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; len];
        if self.copy_from_user(addr, &mut out) != 0 {
            return Err(EFAULT);
        }
        Ok(out)
    }

    fn insert(&self, addr: UserPtr, data: Vec<u8>) -> Result {
        if data.is_empty() {
            return Err(EINVAL);
        }
        let end = addr.checked_add(data.len()).ok_or(EINVAL)?;
        let mut segments = self.segments.lock();
        let overlaps_prev = segments
            .range(..=addr)
            .next_back()
            .is_some_and(|(base, seg)| base + seg.len() > addr);
        let overlaps_next = segments.range(addr..end).next().is_some();
        if overlaps_prev || overlaps_next {
            return Err(EEXIST);
        }
        segments.insert(addr, data);
        Ok(())
    }

    /// Walks the mapped bytes in `[addr, addr + len)` and calls `f` with each contiguous run.
    ///
    /// Returns the number of bytes that were not reachable.
    fn walk(
        &self,
        addr: UserPtr,
        len: usize,
        mut f: impl FnMut(usize, &mut [u8]),
    ) -> usize {
        let mut segments = self.segments.lock();
        let mut done = 0;
        while done < len {
            let cur = match addr.checked_add(done) {
                Some(cur) => cur,
                None => break,
            };
            let Some((base, seg)) = segments.range_mut(..=cur).next_back() else {
                break;
            };
            let offset = cur - base;
            if offset >= seg.len() {
                break;
            }
            let n = (len - done).min(seg.len() - offset);
            f(done, &mut seg[offset..offset + n]);
            done += n;
        }
        len - done
    }
}

impl Default for UserMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl UserAccess for UserMemory {
    fn copy_from_user(&self, src: UserPtr, out: &mut [u8]) -> usize {
        let len = out.len();
        self.walk(src, len, |done, run| {
            out[done..done + run.len()].copy_from_slice(run)
        })
    }

    fn copy_to_user(&self, dst: UserPtr, data: &[u8]) -> usize {
        self.walk(dst, data.len(), |done, run| {
            let n = run.len();
            run.copy_from_slice(&data[done..done + n])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_span_adjacent_segments() {
        let mem = UserMemory::new();
        mem.map_bytes(0x100, b"abc").unwrap();
        mem.map_bytes(0x103, b"def").unwrap();
        assert_eq!(mem.peek(0x101, 4).unwrap(), b"bcde");
    }

    #[test]
    fn partial_copy_reports_shortfall() {
        let mem = UserMemory::new();
        mem.map_bytes(0x100, b"abc").unwrap();
        let mut out = [0u8; 5];
        assert_eq!(mem.copy_from_user(0x101, &mut out), 3);
        assert_eq!(&out[..2], b"bc");
        assert_eq!(mem.copy_to_user(0x0ff, b"zz"), 2);
    }

    #[test]
    fn overlapping_maps_are_refused() {
        let mem = UserMemory::new();
        mem.map(0x100, 16).unwrap();
        assert_eq!(mem.map(0x108, 16), Err(EEXIST));
        assert_eq!(mem.map(0x0f8, 16), Err(EEXIST));
        assert_eq!(mem.map(0x200, 0), Err(EINVAL));
        mem.map(0x110, 16).unwrap();
    }

    #[test]
    fn unmap_makes_range_fault() {
        let mem = UserMemory::new();
        mem.map_bytes(0x100, b"abc").unwrap();
        assert_eq!(mem.unmap(0x100).unwrap(), b"abc");
        assert_eq!(mem.peek(0x100, 1), Err(EFAULT));
        assert_eq!(mem.unmap(0x100), Err(ENOENT));
    }
}
