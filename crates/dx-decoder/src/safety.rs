//! Read-only polling guard.
//!
//! Allowed OBD-II modes:
//! - 0x01: Show current data (live PIDs)
//! - 0x02: Show freeze frame data
//! - 0x03: Show stored DTCs
//! - 0x07: Show pending DTCs
//! - 0x09: Request vehicle information (VIN)
//!
//! Mode 0x04 (clear DTCs) writes to the ECU and is never issued.

use dx_protocol::ServiceMode;

/// Modes a polling cycle may request.
pub const ALLOWED_MODES: &[ServiceMode] = &[
    ServiceMode::CurrentStats,
    ServiceMode::FreezeFrame,
    ServiceMode::StoredDtc,
    ServiceMode::PendingDtc,
    ServiceMode::VehicleInfo,
];

pub fn is_mode_pollable(mode: ServiceMode) -> bool {
    ALLOWED_MODES.contains(&mode)
}
