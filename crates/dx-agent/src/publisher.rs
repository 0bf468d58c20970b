//! Record sink that writes each published cycle to the structured log.

use async_trait::async_trait;
use dx_protocol::EcuDiagnosticRecord;
use dx_session::RecordPublisher;

/// Emits every record as one JSON log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

#[async_trait]
impl RecordPublisher for LogPublisher {
    async fn publish(&self, record: EcuDiagnosticRecord) {
        match serde_json::to_string(&record) {
            Ok(json) => tracing::info!(
                cycle_id = %record.cycle_id,
                ecu_type = ?record.ecu_type,
                has_items = record.has_items(),
                malformed_rate = record.stats.malformed_rate(),
                record = %json,
                "diagnostic record"
            ),
            Err(e) => tracing::warn!(
                cycle_id = %record.cycle_id,
                error = %e,
                "failed to serialize record"
            ),
        }
    }
}
