//! OBD-II service modes, parameter identifiers and request pairs.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameter identifier, scoped within a [`ServiceMode`].
pub type Pid = u8;

/// Reserved "not found" sentinel. Never a real parameter in any mode table.
pub const INVALID_PID: Pid = 0xFF;

/// Offset added to request mode to get response SID.
pub const RESPONSE_SID_OFFSET: u8 = 0x40;

/// Number of parameter ids covered by one "supported parameters" bitmask.
pub const PID_RANGE_SIZE: u8 = 0x20;

/// OBD-II service mode (SID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ServiceMode {
    /// Zero sentinel, never sent on the bus.
    Invalid = 0x00,
    /// Mode 01: current powertrain data.
    CurrentStats = 0x01,
    /// Mode 02: data captured in the freeze frame.
    FreezeFrame = 0x02,
    /// Mode 03: stored DTCs.
    StoredDtc = 0x03,
    /// Mode 04: clear DTCs and MIL.
    ClearDtc = 0x04,
    /// Mode 05: oxygen sensor monitoring, not available over CAN.
    OxygenSensorNonCan = 0x05,
    /// Mode 06: on-board monitoring test results.
    OxygenSensor = 0x06,
    /// Mode 07: pending DTCs.
    PendingDtc = 0x07,
    /// Mode 08: control of on-board systems.
    Testing = 0x08,
    /// Mode 09: vehicle information (VIN, calibration ids).
    VehicleInfo = 0x09,
}

/// Raised when a byte does not name one of the known service modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown OBD-II service mode 0x{0:02X}")]
pub struct UnknownServiceMode(pub u8);

impl ServiceMode {
    /// All modes in SID order, sentinel excluded.
    pub const ALL: [ServiceMode; 9] = [
        ServiceMode::CurrentStats,
        ServiceMode::FreezeFrame,
        ServiceMode::StoredDtc,
        ServiceMode::ClearDtc,
        ServiceMode::OxygenSensorNonCan,
        ServiceMode::OxygenSensor,
        ServiceMode::PendingDtc,
        ServiceMode::Testing,
        ServiceMode::VehicleInfo,
    ];

    /// Raw SID byte.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// SID byte an ECU answers with (request + 0x40).
    pub fn response_sid(self) -> u8 {
        self.as_u8() + RESPONSE_SID_OFFSET
    }

    /// Whether supported parameters are discovered through range bitmasks
    /// before polling. Only current data does; freeze-frame and vehicle-info
    /// poll from their fixed tables.
    pub fn uses_bitmask_discovery(self) -> bool {
        matches!(self, ServiceMode::CurrentStats)
    }

    /// Whether a response in this mode is a block of trouble codes rather
    /// than PID data.
    pub fn reports_dtcs(self) -> bool {
        matches!(self, ServiceMode::StoredDtc | ServiceMode::PendingDtc)
    }
}

impl TryFrom<u8> for ServiceMode {
    type Error = UnknownServiceMode;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(ServiceMode::Invalid),
            0x01 => Ok(ServiceMode::CurrentStats),
            0x02 => Ok(ServiceMode::FreezeFrame),
            0x03 => Ok(ServiceMode::StoredDtc),
            0x04 => Ok(ServiceMode::ClearDtc),
            0x05 => Ok(ServiceMode::OxygenSensorNonCan),
            0x06 => Ok(ServiceMode::OxygenSensor),
            0x07 => Ok(ServiceMode::PendingDtc),
            0x08 => Ok(ServiceMode::Testing),
            0x09 => Ok(ServiceMode::VehicleInfo),
            other => Err(UnknownServiceMode(other)),
        }
    }
}

impl fmt::Display for ServiceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.as_u8())
    }
}

/// A single (mode, PID) request sent to an ECU.
///
/// DTC modes (03, 07) carry no PID on the wire; their requests use PID 0x00
/// and the transport drops it when framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Request {
    pub mode: ServiceMode,
    pub pid: Pid,
}

impl Request {
    /// Vehicle Identification Number (mode 09, PID 02).
    pub const VIN: Request = Request {
        mode: ServiceMode::VehicleInfo,
        pid: 0x02,
    };

    /// DTC that caused the freeze frame to be stored (mode 02, PID 02).
    pub const FREEZE_FRAME_DTC: Request = Request {
        mode: ServiceMode::FreezeFrame,
        pid: 0x02,
    };

    pub const fn new(mode: ServiceMode, pid: Pid) -> Self {
        Self { mode, pid }
    }

    /// Request for a whole DTC block in a DTC-reporting mode.
    pub const fn dtc_block(mode: ServiceMode) -> Self {
        Self { mode, pid: 0x00 }
    }

    /// Whether the response to this request is decoded as trouble codes.
    pub fn yields_dtcs(&self) -> bool {
        self.mode.reports_dtcs() || *self == Request::FREEZE_FRAME_DTC
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.mode.as_u8(), self.pid)
    }
}
