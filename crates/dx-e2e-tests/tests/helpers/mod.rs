//! Shared harness for end-to-end tests.
//!
//! Wires a real [`Catalog`], [`Session`] and [`SessionRunner`] to a
//! [`SimulatedEcu`] and a [`CollectingPublisher`], so every test crosses
//! the decoder, session and transport seams.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use dx_decoder::{Catalog, DecoderManifest};
use dx_protocol::{CycleStats, EcuType, ServiceMode};
use dx_session::runner::EVENT_CHANNEL_CAPACITY;
use dx_session::{CollectingPublisher, Session, SessionEvent, SessionRunner, SimulatedEcu};
use tokio::sync::mpsc;

pub const TEST_VIN: &str = "1HGCM82633A004352";

/// Every read-only mode, in the order an agent would poll them.
pub const ALL_MODES: [ServiceMode; 5] = [
    ServiceMode::CurrentStats,
    ServiceMode::FreezeFrame,
    ServiceMode::StoredDtc,
    ServiceMode::PendingDtc,
    ServiceMode::VehicleInfo,
];

/// One simulated ECU wired to a runner.
pub struct EcuHarness {
    pub runner: SessionRunner,
    pub ecu: Arc<SimulatedEcu>,
    /// Sender half of the session's event channel.
    pub events: mpsc::Sender<SessionEvent>,
}

pub struct TestHarness {
    pub catalog: Arc<Catalog>,
    pub publisher: Arc<CollectingPublisher>,
}

impl TestHarness {
    /// Harness over the compiled-in catalog.
    pub fn builtin() -> Self {
        Self::with_catalog(Catalog::builtin().unwrap())
    }

    /// Harness over a catalog loaded from manifest JSON.
    pub fn with_manifest(json: &str) -> Self {
        let manifest = DecoderManifest::from_json_str(json).unwrap();
        Self::with_catalog(Catalog::from_manifest(manifest).unwrap())
    }

    fn with_catalog(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            publisher: Arc::new(CollectingPublisher::new()),
        }
    }

    /// Build a runner for an ECU scripted by `script`.
    pub fn ecu(
        &self,
        ecu_type: EcuType,
        plan: &[ServiceMode],
        keep_alive: Duration,
        script: impl FnOnce(SimulatedEcu) -> SimulatedEcu,
    ) -> EcuHarness {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let ecu = Arc::new(script(SimulatedEcu::new(tx.clone())));
        let session = Session::new(self.catalog.clone(), ecu_type, "", plan.to_vec()).unwrap();
        let runner = SessionRunner::new(session, ecu.clone(), self.publisher.clone(), rx)
            .with_keep_alive(keep_alive);
        EcuHarness {
            runner,
            ecu,
            events: tx,
        }
    }
}

/// Every requested parameter ends decoded, malformed or timed out.
pub fn assert_cycle_invariant(stats: &CycleStats) {
    assert_eq!(
        stats.decoded + stats.malformed + stats.timed_out,
        stats.requested,
        "cycle stats do not add up: {stats:?}"
    );
}

/// VIN response payload with the leading item-count byte.
pub fn vin_payload(vin: &str) -> Vec<u8> {
    let mut payload = vec![0x01];
    payload.extend_from_slice(vin.as_bytes());
    payload
}
