//! Per-ECU diagnostic sessions.
//!
//! [`Session`] is a synchronous state machine that turns transport events
//! into requests and, once per cycle, an
//! [`EcuDiagnosticRecord`](dx_protocol::EcuDiagnosticRecord).
//! [`SessionRunner`] drives one on tokio with a keep-alive window.

pub mod error;
pub mod mock;
pub mod runner;
pub mod session;
pub mod transport;

pub use error::{SessionError, SessionResult};
pub use mock::{CollectingPublisher, SimulatedEcu};
pub use runner::{DEFAULT_KEEP_ALIVE, SessionRunner};
pub use session::{Session, SessionAction, SessionEvent, SessionState};
pub use transport::{RecordPublisher, RequestSink};
