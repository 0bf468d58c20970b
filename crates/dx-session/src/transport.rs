//! Seams to the transport and downstream collaborators.

use async_trait::async_trait;
use dx_protocol::{EcuDiagnosticRecord, Request};

/// Outbound side of the OBD-II transport.
///
/// Fire-and-forget: a request that never reaches the ECU shows up only as
/// a missing response. Responses come back as
/// [`SessionEvent`](crate::SessionEvent)s on the runner's channel.
#[async_trait]
pub trait RequestSink: Send + Sync {
    async fn send_request(&self, request: Request);
}

/// Downstream consumer of completed cycles.
#[async_trait]
pub trait RecordPublisher: Send + Sync {
    /// Called exactly once per published cycle.
    async fn publish(&self, record: EcuDiagnosticRecord);
}
