use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mode::ServiceMode;

/// DTC category based on first character of code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DtcCategory {
    /// P: Powertrain (engine, transmission).
    Powertrain,
    /// C: Chassis (ABS, steering).
    Chassis,
    /// B: Body (airbags, AC, lighting).
    Body,
    /// U: Network/Communication (CAN bus errors).
    Network,
}

impl DtcCategory {
    /// Category selected by the top two bits of a raw DTC's first byte.
    pub fn from_first_byte(b1: u8) -> Self {
        match b1 >> 6 {
            0 => DtcCategory::Powertrain,
            1 => DtcCategory::Chassis,
            2 => DtcCategory::Body,
            _ => DtcCategory::Network,
        }
    }

    /// Parse DTC category from the code string.
    pub fn from_code(code: &str) -> Self {
        match code.chars().next() {
            Some('P' | 'p') => DtcCategory::Powertrain,
            Some('C' | 'c') => DtcCategory::Chassis,
            Some('B' | 'b') => DtcCategory::Body,
            Some('U' | 'u') => DtcCategory::Network,
            _ => DtcCategory::Powertrain, // Default per SAE J2012
        }
    }

    /// Domain letter used as the code prefix.
    pub fn letter(self) -> char {
        match self {
            DtcCategory::Powertrain => 'P',
            DtcCategory::Chassis => 'C',
            DtcCategory::Body => 'B',
            DtcCategory::Network => 'U',
        }
    }
}

/// Trouble codes read from one ECU in one DTC-reporting mode.
///
/// An empty `codes` list means "no codes present", which is a valid reading
/// and is published as such.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DtcSnapshot {
    pub mode: ServiceMode,
    pub received_at: DateTime<Utc>,
    /// Decoded codes (e.g., "P0300") in the order the ECU reported them.
    pub codes: Vec<String>,
}

impl DtcSnapshot {
    pub fn new(mode: ServiceMode, received_at: DateTime<Utc>, codes: Vec<String>) -> Self {
        Self {
            mode,
            received_at,
            codes,
        }
    }

    pub fn has_items(&self) -> bool {
        !self.codes.is_empty()
    }
}
