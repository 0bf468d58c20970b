//! Session error types.

use dx_protocol::{Pid, ServiceMode};
use thiserror::Error;

/// Errors raised by a diagnostic session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("mode {mode} PID 0x{pid:02X} is not supported by this ECU")]
    UnsupportedParameter { mode: ServiceMode, pid: Pid },

    #[error("mode {mode} may not be polled")]
    ModeNotPollable { mode: ServiceMode },

    #[error("a polling cycle is already in progress")]
    AlreadyActive,

    #[error("session is not polling")]
    NotPolling,
}

/// Convenience alias for session results.
pub type SessionResult<T> = Result<T, SessionError>;
