//! Low-level IPC primitives for the local broker.
//!
//! This crate exposes the foundational pieces the broker core builds on:
//! * [`SharedSegment`] – named, fixed-size memory mappings shared between
//!   processes.
//! * [`SemLock`] – futex-backed binary semaphore living in its own mapping.
//! * [`Channel`] – length-prefixed data buffer guarded by a [`SemLock`].
//! * [`NotifyQueue`] – small-notice transport addressed by unit handle.
//! * [`TransportError`] – lightweight error surface for validation and
//!   allocation failures.

mod channel;
mod error;
mod queue;
mod region;
mod sem;

pub use channel::{Channel, LEN_PREFIX};
pub use error::{TransportError, TransportResult};
pub use queue::{NotifyQueue, MAX_NOTIFY_LEN};
pub use region::SharedSegment;
pub use sem::{SemGuard, SemLock};
