//! The in-memory device and its single open session.

use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use kernel::{
    buf::{UserSlicePtrReader, UserSlicePtrWriter},
    code::{EBUSY, EINVAL, ENOMEM},
    error::KernelResult as Result,
    fs::SeekFrom,
};
use spin::Mutex;

/// A fixed-capacity byte store that admits one session at a time.
///
/// # Invariants
///
/// `open_count` is 0 or 1, `data_size <= buffer.len()` and `buffer.len()` never changes.
pub struct Device {
    open_count: AtomicUsize,
    store: Mutex<Store>,
}

struct Store {
    buffer: Box<[u8]>,
    data_size: usize,
}

impl Device {
    /// Allocates a zeroed buffer of `capacity` bytes.
    pub fn try_new(capacity: usize) -> Result<Arc<Self>> {
        if capacity == 0 {
            return Err(EINVAL);
        }
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(capacity)?;
        buffer.resize(capacity, 0);
        Ok(Arc::new(Device {
            open_count: AtomicUsize::new(0),
            store: Mutex::new(Store {
                buffer: buffer.into_boxed_slice(),
                data_size: 0,
            }),
        }))
    }

    pub fn capacity(&self) -> usize {
        self.store.lock().buffer.len()
    }

    /// Length of the valid data written by the current (or last) session.
    pub fn data_size(&self) -> usize {
        self.store.lock().data_size
    }

    pub fn is_open(&self) -> bool {
        self.open_count.load(Ordering::Acquire) != 0
    }

    /// Starts the one session this device allows.
    ///
    /// Fails with [`EBUSY`] while another session is live. A new session sees an empty device:
    /// `data_size` and the cursor start at 0, though older bytes stay in the buffer until
    /// overwritten.
    pub fn open(self: &Arc<Self>) -> Result<Session> {
        self.open_count
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| EBUSY)?;
        self.store.lock().data_size = 0;
        Ok(Session {
            device: self.clone(),
            cursor: 0,
        })
    }
}

/// Exclusive access to a [`Device`] between `open` and `release`.
///
/// Reads and writes share one cursor. Dropping the session releases the device.
pub struct Session {
    device: Arc<Device>,
    cursor: usize,
}

impl Session {
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Copies caller bytes in at the cursor, up to the end of the buffer.
    ///
    /// Returns how many bytes were taken; anything past the capacity is left in `reader`.
    /// Writing ends the valid data at the new cursor, even if more had been written before.
    /// Fails with [`ENOMEM`] when the cursor is already at the end of the buffer.
    pub fn write(&mut self, reader: &mut UserSlicePtrReader<'_>) -> Result<usize> {
        let mut store = self.device.store.lock();
        let capacity = store.buffer.len();
        if self.cursor >= capacity {
            return Err(ENOMEM);
        }
        let count = reader.len().min(capacity - self.cursor);
        reader.read_slice(&mut store.buffer[self.cursor..self.cursor + count])?;
        self.cursor += count;
        store.data_size = self.cursor;
        Ok(count)
    }

    /// Copies valid data out from the cursor, at most `writer.len()` bytes.
    ///
    /// Returns 0 at the end of the data.
    pub fn read(&mut self, writer: &mut UserSlicePtrWriter<'_>) -> Result<usize> {
        let store = self.device.store.lock();
        if self.cursor >= store.data_size {
            return Ok(0);
        }
        let count = writer.len().min(store.data_size - self.cursor);
        writer.write_slice(&store.buffer[self.cursor..self.cursor + count])?;
        self.cursor += count;
        Ok(count)
    }

    /// Moves the cursor. `End` is relative to the valid data, not the capacity.
    ///
    /// Fails with [`EINVAL`] if the target lies outside `0..=capacity`.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let store = self.device.store.lock();
        let capacity = store.buffer.len();
        let target = match pos {
            SeekFrom::Start(offset) => usize::try_from(offset).ok(),
            SeekFrom::Current(delta) => offset_by(self.cursor, delta),
            SeekFrom::End(delta) => offset_by(store.data_size, delta),
        };
        let target = target.filter(|t| *t <= capacity).ok_or(EINVAL)?;
        self.cursor = target;
        Ok(target as u64)
    }

    /// Ends the session. Buffer contents and `data_size` stay as they are until the next open.
    pub fn release(self) {}
}

impl Drop for Session {
    fn drop(&mut self) {
        self.device.open_count.store(0, Ordering::Release);
    }
}

fn offset_by(base: usize, delta: i64) -> Option<usize> {
    let delta = isize::try_from(delta).ok()?;
    base.checked_add_signed(delta)
}
