//! Binary semaphore shared between processes.
//!
//! One `AtomicU32` living at the start of its own named mapping: value 1 is
//! unlocked, 0 is locked. Contended lockers park on the futex via
//! `atomic-wait`; release wakes exactly one waiter. There is deliberately no
//! timed acquisition — a hung holder blocks the lock until external
//! supervision restarts it.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::region::SharedSegment;
use crate::{TransportError, TransportResult};

const UNLOCKED: u32 = 1;
const LOCKED: u32 = 0;

/// Cross-process binary semaphore backed by a 4-byte named mapping.
///
/// Exactly one side opens with `owner == true` and is responsible for
/// removing the lock from the system on close; the backing file of the
/// mapping otherwise outlives every attached process.
#[derive(Debug)]
pub struct SemLock {
    segment: Option<SharedSegment>,
    owner: bool,
}

impl SemLock {
    /// Creates or attaches to the semaphore at `path`.
    ///
    /// The creator initialises the value to unlocked; later openers attach
    /// to the current state.
    pub fn open(path: impl AsRef<Path>, owner: bool) -> TransportResult<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(TransportError::InvalidArgument("empty semaphore path"));
        }

        let created = !path.exists();
        let segment = SharedSegment::open(path, std::mem::size_of::<u32>())
            .map_err(|err| match err {
                TransportError::ResourceExhausted { path, .. } => {
                    TransportError::ResourceExhausted {
                        resource: "semaphore",
                        path,
                    }
                }
                other => other,
            })?;

        let lock = Self {
            segment: Some(segment),
            owner,
        };
        if created {
            // A fresh mapping is zero-filled, which reads as locked.
            lock.cell()?.store(UNLOCKED, Ordering::Release);
        }
        Ok(lock)
    }

    fn cell(&self) -> TransportResult<&AtomicU32> {
        let segment = self
            .segment
            .as_ref()
            .ok_or(TransportError::InvalidArgument("semaphore is closed"))?;
        // SAFETY: the mapping is page aligned and at least 4 bytes long, and
        // the atomic is only ever accessed through this shared reference.
        Ok(unsafe { &*(segment.as_ptr() as *const AtomicU32) })
    }

    /// Acquires the semaphore, parking the calling thread while another
    /// holder has it. The returned guard releases on drop, on every exit
    /// path.
    pub fn lock(&self) -> TransportResult<SemGuard<'_>> {
        let cell = self.cell()?;
        loop {
            if cell
                .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(SemGuard { cell });
            }
            atomic_wait::wait(cell, LOCKED);
        }
    }

    /// Detaches from the mapping; the owner side also removes the backing
    /// file from the system. Idempotent.
    pub fn close(&mut self) {
        if let Some(segment) = self.segment.take() {
            if self.owner {
                segment.unlink();
            }
        }
    }
}

impl Drop for SemLock {
    fn drop(&mut self) {
        self.close();
    }
}

/// Scoped holder of a [`SemLock`] acquisition.
#[derive(Debug)]
pub struct SemGuard<'a> {
    cell: &'a AtomicU32,
}

impl Drop for SemGuard<'_> {
    fn drop(&mut self) {
        self.cell.store(UNLOCKED, Ordering::Release);
        atomic_wait::wake_one(self.cell as *const AtomicU32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn open_rejects_empty_path() {
        assert!(matches!(
            SemLock::open("", true),
            Err(TransportError::InvalidArgument(_))
        ));
    }

    #[test]
    fn guard_releases_on_drop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let lock = SemLock::open(dir.path().join("sem"), true).expect("open");
        drop(lock.lock().expect("first"));
        drop(lock.lock().expect("second"));
    }

    #[test]
    fn contended_lock_serialises_threads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sem");
        let lock = Arc::new(SemLock::open(&path, true).expect("open"));
        let counter = Arc::new(std::sync::atomic::AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let lock = Arc::clone(&lock);
            let counter = Arc::clone(&counter);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    let _guard = lock.lock().expect("lock");
                    let seen = counter.load(Ordering::Relaxed);
                    counter.store(seen + 1, Ordering::Relaxed);
                }
            }));
        }
        for handle in handles {
            handle.join().expect("join");
        }
        assert_eq!(counter.load(Ordering::Relaxed), 400);
    }
}
