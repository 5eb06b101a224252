use thiserror::Error;

use transport::TransportError;

pub type BrokerResult<T> = Result<T, BrokerError>;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("unknown or offline unit: {unit}")]
    NotFound { unit: String },

    #[error("command payload size mismatch: expected {expected}, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    #[error("malformed command: {0}")]
    InvalidCommand(&'static str),

    #[error("unimplemented command: {0}")]
    Unimplemented(&'static str),
}
