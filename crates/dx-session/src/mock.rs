//! Simulated ECU and collecting publisher.
//!
//! Used by the agent in place of a real CAN transport and by the tests, so
//! complete cycles run on any platform.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use dx_decoder::safety;
use dx_protocol::{EcuDiagnosticRecord, PID_RANGE_SIZE, Pid, Request, ServiceMode};
use tokio::sync::{Mutex, mpsc};

use crate::session::SessionEvent;
use crate::transport::{RecordPublisher, RequestSink};

/// ECU with scripted responses and request recording.
///
/// A scripted request is answered with its bytes, a silent one never
/// answers, and anything else is reported as a transport timeout.
pub struct SimulatedEcu {
    responses: HashMap<Request, Vec<u8>>,
    silent: HashSet<Request>,
    sent: Mutex<Vec<Request>>,
    events: mpsc::Sender<SessionEvent>,
}

impl SimulatedEcu {
    /// Create an ECU that delivers its responses to `events`.
    pub fn new(events: mpsc::Sender<SessionEvent>) -> Self {
        Self {
            responses: HashMap::new(),
            silent: HashSet::new(),
            sent: Mutex::new(Vec::new()),
            events,
        }
    }

    /// Answer `request` with `bytes` (payload after the mode/PID echo).
    pub fn respond(mut self, request: Request, bytes: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(request, bytes.into());
        self
    }

    /// Never answer `request`.
    pub fn silent(mut self, request: Request) -> Self {
        self.silent.insert(request);
        self
    }

    /// Script the mode 01 "PIDs supported" bitmasks for `pids`.
    ///
    /// Each anchor also advertises the next anchor when a higher PID is
    /// supported, as real ECUs do.
    pub fn supports(mut self, pids: &[Pid]) -> Self {
        for anchor in (0x00..=0xA0).step_by(usize::from(PID_RANGE_SIZE)) {
            let anchor: Pid = anchor;
            let mut mask = 0u32;
            for &pid in pids {
                let in_range = pid > anchor && u32::from(pid) <= u32::from(anchor) + 32;
                if in_range {
                    mask |= 1 << (31 - u32::from(pid - anchor - 1));
                }
            }
            let next_anchor = u32::from(anchor) + u32::from(PID_RANGE_SIZE);
            if pids.iter().any(|&pid| u32::from(pid) > next_anchor) {
                mask |= 1;
            }
            self.responses.insert(
                Request::new(ServiceMode::CurrentStats, anchor),
                mask.to_be_bytes().to_vec(),
            );
        }
        self
    }

    /// Every request passed to `send_request`, in order.
    pub async fn sent_requests(&self) -> Vec<Request> {
        self.sent.lock().await.clone()
    }

    pub async fn last_sent(&self) -> Option<Request> {
        self.sent.lock().await.last().copied()
    }

    fn deliver(&self, event: SessionEvent) {
        if let Err(e) = self.events.try_send(event) {
            tracing::warn!(error = %e, "simulated ECU dropped an event");
        }
    }
}

#[async_trait]
impl RequestSink for SimulatedEcu {
    async fn send_request(&self, request: Request) {
        self.sent.lock().await.push(request);

        if !safety::is_mode_pollable(request.mode) {
            tracing::warn!(request = %request, "blocked request for a write mode");
            return;
        }
        if self.silent.contains(&request) {
            return;
        }
        match self.responses.get(&request) {
            Some(bytes) => self.deliver(SessionEvent::response(request, bytes.clone())),
            None => self.deliver(SessionEvent::timeout(request)),
        }
    }
}

/// Publisher that keeps every record for later inspection.
#[derive(Default)]
pub struct CollectingPublisher {
    records: Mutex<Vec<EcuDiagnosticRecord>>,
}

impl CollectingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<EcuDiagnosticRecord> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl RecordPublisher for CollectingPublisher {
    async fn publish(&self, record: EcuDiagnosticRecord) {
        self.records.lock().await.push(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RPM: Request = Request::new(ServiceMode::CurrentStats, 0x0C);

    #[tokio::test]
    async fn answers_scripted_requests() {
        let (tx, mut rx) = mpsc::channel(8);
        let ecu = SimulatedEcu::new(tx).respond(RPM, [0x1A, 0xF8]);

        ecu.send_request(RPM).await;
        match rx.recv().await.unwrap() {
            SessionEvent::Response { pid, bytes, .. } => {
                assert_eq!(pid, 0x0C);
                assert_eq!(bytes, vec![0x1A, 0xF8]);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(ecu.sent_requests().await, vec![RPM]);
    }

    #[tokio::test]
    async fn unscripted_requests_time_out() {
        let (tx, mut rx) = mpsc::channel(8);
        let ecu = SimulatedEcu::new(tx);
        ecu.send_request(RPM).await;
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::timeout(RPM));
    }

    #[tokio::test]
    async fn silent_requests_produce_nothing() {
        let (tx, mut rx) = mpsc::channel(8);
        let ecu = SimulatedEcu::new(tx).silent(RPM);
        ecu.send_request(RPM).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(ecu.last_sent().await, Some(RPM));
    }

    #[tokio::test]
    async fn blocks_write_modes() {
        let (tx, mut rx) = mpsc::channel(8);
        let clear = Request::dtc_block(ServiceMode::ClearDtc);
        let ecu = SimulatedEcu::new(tx).respond(clear, Vec::new());
        ecu.send_request(clear).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn supported_bitmasks() {
        let (tx, mut rx) = mpsc::channel(8);
        let ecu = SimulatedEcu::new(tx).supports(&[0x0C, 0x21, 0x40]);

        ecu.send_request(Request::new(ServiceMode::CurrentStats, 0x00))
            .await;
        ecu.send_request(Request::new(ServiceMode::CurrentStats, 0x20))
            .await;
        ecu.send_request(Request::new(ServiceMode::CurrentStats, 0x40))
            .await;

        let mut masks = Vec::new();
        while let Ok(SessionEvent::Response { bytes, .. }) = rx.try_recv() {
            masks.push(bytes);
        }
        // 0x0C and the 0x20 anchor, then 0x21 and 0x40 (bit 0)
        assert_eq!(masks[0], vec![0x00, 0x10, 0x00, 0x01]);
        assert_eq!(masks[1], vec![0x80, 0x00, 0x00, 0x01]);
        assert_eq!(masks[2], vec![0x00, 0x00, 0x00, 0x00]);
    }

    #[tokio::test]
    async fn collects_records() {
        let publisher = CollectingPublisher::new();
        assert!(publisher.is_empty().await);
        publisher
            .publish(EcuDiagnosticRecord {
                cycle_id: uuid::Uuid::now_v7(),
                ecu_type: dx_protocol::EcuType::Engine,
                vin: String::new(),
                signal_groups: Vec::new(),
                dtc_snapshots: Vec::new(),
                received_at: chrono::Utc::now(),
                stats: Default::default(),
            })
            .await;
        assert_eq!(publisher.len().await, 1);
    }
}
