//! Notification transport addressed by integer unit handles.
//!
//! The broker uses this as its control side-channel: one small notice per
//! send ("your channel is ready", "shutting down"), multiplexed across all
//! registered units. Only the contract matters to the broker core — handles,
//! a small fixed size bound, send/receive/broadcast — so the slots are plain
//! unbounded channels behind one map.

use std::collections::HashMap;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::{TransportError, TransportResult};

/// Upper bound on a single notification payload, in bytes.
pub const MAX_NOTIFY_LEN: usize = 80;

struct Slot {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
}

/// Multiplexed notification queue keyed by unit handle.
#[derive(Default)]
pub struct NotifyQueue {
    slots: Mutex<HashMap<i32, Slot>>,
}

impl NotifyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a slot for `id`. Re-registering an existing handle keeps its
    /// pending notices.
    pub fn register(&self, id: i32) {
        let mut slots = self.slots.lock();
        slots.entry(id).or_insert_with(|| {
            let (tx, rx) = unbounded();
            Slot { tx, rx }
        });
    }

    /// Removes the slot for `id`, dropping any pending notices. No-op on an
    /// unknown handle.
    pub fn unregister(&self, id: i32) {
        self.slots.lock().remove(&id);
    }

    /// Queues one notification for `id`.
    ///
    /// `CapacityExceeded` when the payload is over [`MAX_NOTIFY_LEN`];
    /// `InvalidArgument` on an unknown handle.
    pub fn send(&self, id: i32, payload: &[u8]) -> TransportResult<()> {
        if payload.len() > MAX_NOTIFY_LEN {
            return Err(TransportError::CapacityExceeded {
                requested: payload.len(),
                capacity: MAX_NOTIFY_LEN,
            });
        }
        let slots = self.slots.lock();
        let slot = slots
            .get(&id)
            .ok_or(TransportError::InvalidArgument("unknown notify handle"))?;
        // The receiver half lives in the same slot, so send cannot fail.
        let _ = slot.tx.send(payload.to_vec());
        Ok(())
    }

    /// Pops the oldest pending notification for `id`, if any.
    pub fn recv(&self, id: i32) -> TransportResult<Option<Vec<u8>>> {
        let slots = self.slots.lock();
        let slot = slots
            .get(&id)
            .ok_or(TransportError::InvalidArgument("unknown notify handle"))?;
        Ok(slot.rx.try_recv().ok())
    }

    /// Sends `payload` to every handle in `ids`, skipping unknown ones.
    ///
    /// Callers pass the currently-online unit handles; a unit that vanished
    /// between the snapshot and the send is simply missed.
    pub fn broadcast(&self, ids: &[i32], payload: &[u8]) -> TransportResult<()> {
        if payload.len() > MAX_NOTIFY_LEN {
            return Err(TransportError::CapacityExceeded {
                requested: payload.len(),
                capacity: MAX_NOTIFY_LEN,
            });
        }
        let slots = self.slots.lock();
        for id in ids {
            if let Some(slot) = slots.get(id) {
                let _ = slot.tx.send(payload.to_vec());
            }
        }
        Ok(())
    }
}
