use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dtc::DtcSnapshot;
use crate::mode::ServiceMode;

/// Logical signal identifier assigned by the catalog (opaque to decoding).
pub type SignalId = u32;

/// Physical signal value after scaling and offset.
pub type SignalValue = f64;

/// First OBD-II response CAN ID (engine ECU).
pub const ENGINE_RESPONSE_ID: u32 = 0x7E8;

/// Second OBD-II response CAN ID (transmission ECU).
pub const TRANSMISSION_RESPONSE_ID: u32 = 0x7E9;

/// Kind of ECU a diagnostic session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EcuType {
    Engine,
    Transmission,
    Other,
}

impl EcuType {
    /// Map an OBD-II response CAN ID to the ECU that sends it.
    pub fn from_response_id(id: u32) -> Self {
        match id {
            ENGINE_RESPONSE_ID => EcuType::Engine,
            TRANSMISSION_RESPONSE_ID => EcuType::Transmission,
            _ => EcuType::Other,
        }
    }
}

/// Decoded signals for one service mode within a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalGroup {
    pub mode: ServiceMode,
    /// Signal id to physical value. A signal that failed to decode is absent.
    pub values: BTreeMap<SignalId, SignalValue>,
}

impl SignalGroup {
    pub fn new(mode: ServiceMode) -> Self {
        Self {
            mode,
            values: BTreeMap::new(),
        }
    }
}

/// Per-cycle accounting of parameter requests.
///
/// Every requested parameter ends in exactly one of `decoded`, `malformed`
/// or `timed_out`. Only `malformed` counts as a decode error rate; a
/// timeout is the ECU staying silent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    pub requested: usize,
    pub decoded: usize,
    pub malformed: usize,
    pub timed_out: usize,
    /// Individual signals dropped from otherwise decoded parameters.
    pub omitted_signals: usize,
}

impl CycleStats {
    pub fn failed(&self) -> usize {
        self.malformed + self.timed_out
    }

    /// Share of requested parameters whose bytes could not be decoded.
    pub fn malformed_rate(&self) -> f64 {
        if self.requested == 0 {
            0.0
        } else {
            self.malformed as f64 / self.requested as f64
        }
    }
}

/// Everything collected from one ECU in one polling cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcuDiagnosticRecord {
    pub cycle_id: Uuid,
    pub ecu_type: EcuType,
    /// Empty until the ECU reports it (mode 09 PID 02) or it is configured.
    pub vin: String,
    pub signal_groups: Vec<SignalGroup>,
    pub dtc_snapshots: Vec<DtcSnapshot>,
    pub received_at: DateTime<Utc>,
    pub stats: CycleStats,
}

impl EcuDiagnosticRecord {
    /// Whether the ECU produced any usable data this cycle.
    pub fn has_items(&self) -> bool {
        !self.signal_groups.is_empty() || !self.dtc_snapshots.is_empty()
    }

    /// Number of decoded signal values across all groups.
    pub fn signal_count(&self) -> usize {
        self.signal_groups.iter().map(|g| g.values.len()).sum()
    }

    /// Look up a decoded value by mode and signal id.
    pub fn value(&self, mode: ServiceMode, signal_id: SignalId) -> Option<SignalValue> {
        self.signal_groups
            .iter()
            .find(|g| g.mode == mode)
            .and_then(|g| g.values.get(&signal_id).copied())
    }

    /// The snapshot captured for `mode`, if any.
    pub fn dtc_snapshot(&self, mode: ServiceMode) -> Option<&DtcSnapshot> {
        self.dtc_snapshots.iter().find(|s| s.mode == mode)
    }
}
