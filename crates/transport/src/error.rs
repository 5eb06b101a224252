//! Error handling helpers for the transport crate.
//!
//! The transport layer keeps its error surface small: argument validation,
//! kernel object allocation failures, and capacity violations. Nothing here
//! is retried automatically; callers decide whether a failed allocation is
//! fatal to the operation they were composing.

use std::fmt;
use std::path::PathBuf;

/// Convenience result alias for fallible transport operations.
pub type TransportResult<T, E = TransportError> = Result<T, E>;

#[derive(Debug)]
/// Errors surfaced by the shared-memory and notification primitives.
pub enum TransportError {
    /// A caller passed malformed or missing input.
    InvalidArgument(&'static str),
    /// A kernel-backed resource (segment file, lock file) could not be
    /// created, sized, or mapped.
    ResourceExhausted {
        resource: &'static str,
        path: PathBuf,
    },
    /// A write larger than the fixed capacity of the target.
    CapacityExceeded { requested: usize, capacity: usize },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::InvalidArgument(what) => {
                write!(f, "invalid argument: {what}")
            }
            TransportError::ResourceExhausted { resource, path } => {
                write!(f, "failed to allocate {resource} at {}", path.display())
            }
            TransportError::CapacityExceeded {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "payload of {requested} bytes exceeds fixed capacity of {capacity}"
                )
            }
        }
    }
}

impl std::error::Error for TransportError {}
