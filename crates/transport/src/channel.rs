//! Point-to-point data channel: shared segment plus binary semaphore.
//!
//! Layout of the segment:
//!
//! ```text
//! +--------------------+------------------------------------------+
//! | len prefix (4 B)   | payload region (capacity bytes)          |
//! +--------------------+------------------------------------------+
//! ```
//!
//! The length prefix records how many payload bytes are currently valid and
//! never exceeds the capacity fixed at creation. Readers peek at the prefix
//! without the lock to skip empty channels cheaply; every actual copy in or
//! out happens under the semaphore.

use std::mem;
use std::path::Path;
use std::slice;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::region::SharedSegment;
use crate::sem::{SemGuard, SemLock};
use crate::{TransportError, TransportResult};

/// Bytes reserved at the front of the segment for the length prefix.
pub const LEN_PREFIX: usize = mem::size_of::<u32>();

#[derive(Debug)]
struct Inner {
    segment: SharedSegment,
    lock: SemLock,
    capacity: usize,
}

/// Fixed-capacity shared buffer guarded by a cross-process lock.
///
/// The side opening with `owner == true` is responsible for removing the
/// semaphore from the system on close; either side may unlink the segment.
#[derive(Debug)]
pub struct Channel {
    inner: Option<Inner>,
}

impl Channel {
    /// Creates or attaches to the channel identified by the two paths.
    ///
    /// The segment is sized to `capacity + 4` bytes and its length prefix is
    /// reset to zero; the semaphore starts unlocked. Fails with
    /// `InvalidArgument` on empty paths or zero capacity and with
    /// `ResourceExhausted` when either backing object cannot be allocated
    /// (in which case nothing half-built is left behind).
    pub fn open(
        shm_path: impl AsRef<Path>,
        sem_path: impl AsRef<Path>,
        capacity: usize,
        owner: bool,
    ) -> TransportResult<Self> {
        let shm_path = shm_path.as_ref();
        let sem_path = sem_path.as_ref();
        if shm_path.as_os_str().is_empty() || sem_path.as_os_str().is_empty() {
            return Err(TransportError::InvalidArgument("empty channel path"));
        }
        if capacity == 0 {
            return Err(TransportError::InvalidArgument("zero channel capacity"));
        }

        let segment = SharedSegment::open(shm_path, capacity + LEN_PREFIX)?;
        let lock = match SemLock::open(sem_path, owner) {
            Ok(lock) => lock,
            Err(err) => {
                segment.unlink();
                return Err(err);
            }
        };

        let channel = Self {
            inner: Some(Inner {
                segment,
                lock,
                capacity,
            }),
        };
        channel.len_cell()?.store(0, Ordering::Release);
        Ok(channel)
    }

    fn inner(&self) -> TransportResult<&Inner> {
        self.inner
            .as_ref()
            .ok_or(TransportError::InvalidArgument("channel is closed"))
    }

    fn inner_mut(&mut self) -> TransportResult<&mut Inner> {
        self.inner
            .as_mut()
            .ok_or(TransportError::InvalidArgument("channel is closed"))
    }

    fn len_cell(&self) -> TransportResult<&AtomicU32> {
        let inner = self.inner()?;
        // SAFETY: the mapping is page aligned and covers at least the 4-byte
        // prefix; the prefix is only ever touched through this atomic view.
        Ok(unsafe { &*(inner.segment.as_ptr() as *const AtomicU32) })
    }

    /// Payload capacity fixed at creation.
    pub fn capacity(&self) -> usize {
        self.inner.as_ref().map(|inner| inner.capacity).unwrap_or(0)
    }

    /// Number of valid payload bytes currently recorded in the prefix.
    ///
    /// Read without the lock; authoritative only while a guard is held.
    pub fn data_len(&self) -> TransportResult<usize> {
        Ok(self.len_cell()?.load(Ordering::Acquire) as usize)
    }

    /// Updates the length prefix. Intended for callers composing their own
    /// critical section around [`Channel::lock`].
    pub fn set_data_len(&self, len: usize) -> TransportResult<()> {
        let capacity = self.inner()?.capacity;
        if len > capacity {
            return Err(TransportError::CapacityExceeded {
                requested: len,
                capacity,
            });
        }
        self.len_cell()?.store(len as u32, Ordering::Release);
        Ok(())
    }

    /// Acquires the channel lock for a caller-composed critical section.
    pub fn lock(&self) -> TransportResult<SemGuard<'_>> {
        self.inner()?.lock.lock()
    }

    /// Borrows the payload region. Only meaningful while a guard from
    /// [`Channel::lock`] is held.
    pub fn payload(&self) -> TransportResult<&[u8]> {
        let inner = self.inner()?;
        // SAFETY: the payload region starts past the prefix and spans exactly
        // `capacity` bytes of the mapping.
        Ok(unsafe { slice::from_raw_parts(inner.segment.as_ptr().add(LEN_PREFIX), inner.capacity) })
    }

    /// Mutably borrows the payload region. Only meaningful while a guard
    /// from [`Channel::lock`] is held.
    pub fn payload_mut(&mut self) -> TransportResult<&mut [u8]> {
        let inner = self.inner_mut()?;
        let capacity = inner.capacity;
        // SAFETY: same bounds as `payload`; the mutable borrow of `self`
        // prevents overlapping slices from this handle.
        Ok(unsafe {
            slice::from_raw_parts_mut(inner.segment.as_mut_ptr().add(LEN_PREFIX), capacity)
        })
    }

    /// Copies `buf` into the channel and records its length in the prefix.
    ///
    /// Returns the number of bytes written. `InvalidArgument` on an empty
    /// buffer; `CapacityExceeded` (prefix untouched) when `buf` is larger
    /// than the fixed capacity.
    pub fn write(&mut self, buf: &[u8]) -> TransportResult<usize> {
        if buf.is_empty() {
            return Err(TransportError::InvalidArgument("empty write buffer"));
        }
        let inner = self
            .inner
            .as_mut()
            .ok_or(TransportError::InvalidArgument("channel is closed"))?;
        if buf.len() > inner.capacity {
            return Err(TransportError::CapacityExceeded {
                requested: buf.len(),
                capacity: inner.capacity,
            });
        }

        let Inner { segment, lock, .. } = inner;
        let guard = lock.lock()?;
        // SAFETY: bounds checked against capacity above; the prefix store
        // goes through the atomic view so unlocked peeks stay well defined.
        unsafe {
            let base = segment.as_mut_ptr();
            std::ptr::copy_nonoverlapping(buf.as_ptr(), base.add(LEN_PREFIX), buf.len());
            (*(base as *const AtomicU32)).store(buf.len() as u32, Ordering::Release);
        }
        drop(guard);
        Ok(buf.len())
    }

    /// Copies the current message out of the channel into `out`.
    ///
    /// Returns 0 immediately, without taking the lock, when the prefix says
    /// the channel is empty; that peek is advisory and the locked copy
    /// re-reads the prefix authoritatively. `out` grows as needed.
    pub fn read(&mut self, out: &mut Vec<u8>) -> TransportResult<usize> {
        if self.data_len()? == 0 {
            return Ok(0);
        }

        let inner = self
            .inner
            .as_mut()
            .ok_or(TransportError::InvalidArgument("channel is closed"))?;
        let Inner {
            segment,
            lock,
            capacity,
        } = inner;
        let guard = lock.lock()?;
        let base = segment.as_ptr();
        // SAFETY: the prefix is re-read under the lock; every store keeps it
        // within capacity, so the copy below stays in bounds.
        let len = unsafe { (*(base as *const AtomicU32)).load(Ordering::Acquire) } as usize;
        if len == 0 {
            return Ok(0);
        }
        debug_assert!(len <= *capacity);
        if out.len() < len {
            out.resize(len, 0);
        }
        unsafe {
            std::ptr::copy_nonoverlapping(base.add(LEN_PREFIX), out.as_mut_ptr(), len);
        }
        drop(guard);
        Ok(len)
    }

    /// Detaches from the segment, unlinks it, and closes the semaphore
    /// (removing it from the system only on the owning side). Idempotent
    /// no-op on an already-closed channel.
    pub fn close(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            inner.segment.unlink();
            inner.lock.close();
        }
    }

    /// True once [`Channel::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.close();
    }
}
