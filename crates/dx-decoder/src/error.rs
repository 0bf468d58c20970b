//! Decoding and catalog error types.

use dx_protocol::{Pid, SignalId};
use thiserror::Error;

/// Errors raised while decoding responses or loading a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("response too short: need {needed} bytes, got {actual}")]
    InsufficientLength { needed: usize, actual: usize },

    #[error("invalid formula for PID 0x{pid:02X}: {reason}")]
    InvalidFormula { pid: Pid, reason: String },

    /// A formula handed straight to the extractor, outside any catalog.
    #[error("invalid formula for signal {signal_id:#X}: {reason}")]
    InvalidSignal { signal_id: SignalId, reason: String },

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("decoder manifest error: {0}")]
    Manifest(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        DecodeError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Manifest(err.to_string())
    }
}

/// Convenience alias for decoding results.
pub type DecodeResult<T> = Result<T, DecodeError>;
