//! Compiled-in SAE J1979 tables.
//!
//! Used until a decoder manifest is supplied. Built-in signal ids are
//! `(mode << 16) | (pid << 8) | formula_index`.

use dx_protocol::{Pid, ServiceMode, SignalId};

use crate::formula::{ParameterInfo, SignalFormula};

/// Mode 01 range anchors whose responses are "PIDs supported" bitmasks.
pub const CURRENT_STATS_ANCHORS: [Pid; 6] = [0x00, 0x20, 0x40, 0x60, 0x80, 0xA0];

/// Mode 02 request table.
pub const FREEZE_FRAME_PIDS: [Pid; 1] = [
    0x02, // DTC that caused the freeze frame to be stored
];

/// Mode 09 request table.
pub const VEHICLE_INFO_PIDS: [Pid; 12] = [
    0x00, // Supported PIDs 01-20
    0x01, // VIN message count
    0x02, // Vehicle Identification Number
    0x03, // Calibration ID message count
    0x04, // Calibration ID
    0x05, // CVN message count
    0x06, // Calibration Verification Numbers
    0x07, // In-use performance tracking message count
    0x08, // In-use performance tracking, spark ignition
    0x09, // ECU name message count
    0x0A, // ECU name
    0x0B, // In-use performance tracking, compression ignition
];

/// Signal id for the `index`-th formula of a built-in PID.
pub fn signal_id(mode: ServiceMode, pid: Pid, index: usize) -> SignalId {
    (u32::from(mode.as_u8()) << 16) | (u32::from(pid) << 8) | index as u32
}

/// Every built-in parameter, mode 01 in table order first.
pub fn parameters() -> Vec<(ServiceMode, ParameterInfo)> {
    let current = (0x00..=0xA9u8).chain([0xC0]).map(|pid| {
        let (len, formulas) = current_stats_layout(pid);
        (
            ServiceMode::CurrentStats,
            parameter(ServiceMode::CurrentStats, pid, len, formulas),
        )
    });
    let freeze = FREEZE_FRAME_PIDS.iter().map(|&pid| {
        (
            ServiceMode::FreezeFrame,
            parameter(ServiceMode::FreezeFrame, pid, 2, Vec::new()),
        )
    });
    let info = VEHICLE_INFO_PIDS.iter().map(|&pid| {
        let (len, formulas) = vehicle_info_layout(pid);
        (
            ServiceMode::VehicleInfo,
            parameter(ServiceMode::VehicleInfo, pid, len, formulas),
        )
    });
    current.chain(freeze).chain(info).collect()
}

fn parameter(
    mode: ServiceMode,
    pid: Pid,
    response_len: usize,
    formulas: Vec<SignalFormula>,
) -> ParameterInfo {
    let formulas = formulas
        .into_iter()
        .enumerate()
        .map(|(index, f)| SignalFormula {
            signal_id: signal_id(mode, pid, index),
            ..f
        })
        .collect();
    ParameterInfo::new(pid, response_len, formulas)
}

// Formula shorthands. Offsets are payload byte indices: A = 0, B = 1, ...

fn byte(at: usize) -> SignalFormula {
    SignalFormula::new(0, at)
}

fn word(at: usize) -> SignalFormula {
    byte(at).bytes(2)
}

fn dword(at: usize) -> SignalFormula {
    byte(at).bytes(4)
}

/// A * 100 / 255
fn percent(at: usize) -> SignalFormula {
    byte(at).scaled(100.0 / 255.0, 0.0)
}

/// A - 40 (°C)
fn temp(at: usize) -> SignalFormula {
    byte(at).scaled(1.0, -40.0)
}

/// (256A + B) / 10 - 40 (°C)
fn word_temp(at: usize) -> SignalFormula {
    word(at).scaled(0.1, -40.0)
}

/// A * 100 / 128 - 100 (%)
fn trim(at: usize) -> SignalFormula {
    byte(at).scaled(100.0 / 128.0, -100.0)
}

/// A - 125 (%)
fn torque(at: usize) -> SignalFormula {
    byte(at).scaled(1.0, -125.0)
}

/// Low `bits` of byte A: which of the PID's sensors are reported.
fn support(bits: u8) -> SignalFormula {
    byte(0).bits(0, bits)
}

fn current_stats_layout(pid: Pid) -> (usize, Vec<SignalFormula>) {
    match pid {
        // Range bitmasks; resolved by discovery, never polled as data.
        0x00 | 0x20 | 0x40 | 0x60 | 0x80 | 0xA0 | 0xC0 => (4, vec![]),
        0x01 => (4, vec![]),
        0x02 => (2, vec![]),
        0x03 => (2, vec![byte(0), byte(1)]),
        0x04 => (1, vec![percent(0)]),
        0x05 => (1, vec![temp(0)]),
        0x06..=0x09 => (1, vec![trim(0)]),
        0x0A => (1, vec![byte(0).scaled(3.0, 0.0)]),
        0x0B => (1, vec![byte(0)]),
        0x0C => (2, vec![word(0).scaled(0.25, 0.0)]),
        0x0D => (1, vec![byte(0)]),
        0x0E => (1, vec![byte(0).scaled(0.5, -64.0)]),
        0x0F => (1, vec![temp(0)]),
        0x10 => (2, vec![word(0).scaled(0.01, 0.0)]),
        0x11 => (1, vec![percent(0)]),
        0x12 => (1, vec![]),
        0x13 => (1, vec![byte(0)]),
        // Narrowband O2: voltage, short-term fuel trim
        0x14..=0x1B => (2, vec![byte(0).scaled(0.005, 0.0), trim(1)]),
        0x1C..=0x1E => (1, vec![]),
        0x1F => (2, vec![word(0)]),
        0x21 => (2, vec![word(0)]),
        0x22 => (2, vec![word(0).scaled(0.079, 0.0)]),
        0x23 => (2, vec![word(0).scaled(10.0, 0.0)]),
        // Wideband O2: equivalence ratio, voltage
        0x24..=0x2B => (
            4,
            vec![
                word(0).scaled(2.0 / 65536.0, 0.0),
                word(2).scaled(8.0 / 65536.0, 0.0),
            ],
        ),
        0x2C => (1, vec![]),
        0x2D => (1, vec![trim(0)]),
        0x2E => (1, vec![]),
        0x2F => (1, vec![percent(0)]),
        0x30 => (1, vec![byte(0)]),
        0x31 => (2, vec![word(0)]),
        0x32 => (2, vec![word(0).scaled(0.25, 0.0)]),
        0x33 => (1, vec![byte(0)]),
        // Wideband O2: equivalence ratio, current (mA)
        0x34..=0x3B => (
            4,
            vec![
                word(0).scaled(2.0 / 65536.0, 0.0),
                word(2).scaled(1.0 / 256.0, -128.0),
            ],
        ),
        0x3C..=0x3F => (2, vec![word_temp(0)]),
        0x41 => (4, vec![]),
        0x42 => (2, vec![word(0).scaled(0.001, 0.0)]),
        0x43 => (2, vec![word(0).scaled(100.0 / 255.0, 0.0)]),
        0x44 => (2, vec![word(0).scaled(2.0 / 65536.0, 0.0)]),
        0x45 => (1, vec![percent(0)]),
        0x46 => (1, vec![temp(0)]),
        0x47..=0x4B => (1, vec![percent(0)]),
        0x4C => (1, vec![]),
        0x4D | 0x4E => (2, vec![word(0)]),
        0x4F | 0x50 => (4, vec![]),
        0x51 => (1, vec![byte(0)]),
        0x52 => (1, vec![percent(0)]),
        0x53..=0x58 => (2, vec![]),
        0x59 => (2, vec![word(0).scaled(10.0, 0.0)]),
        0x5A | 0x5B => (1, vec![percent(0)]),
        0x5C => (1, vec![temp(0)]),
        0x5D => (2, vec![word(0).scaled(1.0 / 128.0, -210.0)]),
        0x5E => (2, vec![word(0).scaled(0.05, 0.0)]),
        0x5F => (1, vec![]),
        0x61 | 0x62 => (1, vec![torque(0)]),
        0x63 => (2, vec![word(0)]),
        // Idle, points 1-4
        0x64 => (
            5,
            vec![torque(0), torque(1), torque(2), torque(3), torque(4)],
        ),
        0x65 => (2, vec![]),
        0x66 => (
            5,
            vec![
                byte(0).bits(0, 1),
                byte(0).bits(1, 1),
                word(1).scaled(0.03125, 0.0),
                word(3).scaled(0.03125, 0.0),
            ],
        ),
        0x67 => (
            3,
            vec![byte(0).bits(0, 1), byte(0).bits(1, 1), temp(1), temp(2)],
        ),
        0x68 => (
            7,
            vec![
                support(6),
                temp(1),
                temp(2),
                temp(3),
                temp(4),
                temp(5),
                temp(6),
            ],
        ),
        // Commanded EGR A/B duty, actual, error
        0x69 => (
            7,
            vec![
                support(6),
                percent(1),
                percent(2),
                trim(3),
                percent(4),
                percent(5),
                trim(6),
            ],
        ),
        0x6A | 0x6C => (
            5,
            vec![support(4), percent(1), percent(2), percent(3), percent(4)],
        ),
        0x6B => (5, vec![support(4), temp(1), temp(2), temp(3), temp(4)]),
        // Fuel pressure control: commanded/actual rail pressure + temperature, banks A/B
        0x6D => (
            11,
            vec![
                support(6),
                word(1).scaled(10.0, 0.0),
                word(3).scaled(10.0, 0.0),
                temp(5),
                word(6).scaled(10.0, 0.0),
                word(8).scaled(10.0, 0.0),
                temp(10),
            ],
        ),
        0x6E => (
            9,
            vec![
                support(4),
                word(1).scaled(10.0, 0.0),
                word(3).scaled(10.0, 0.0),
                word(5).scaled(10.0, 0.0),
                word(7).scaled(10.0, 0.0),
            ],
        ),
        0x6F => (3, vec![support(2), byte(1), byte(2)]),
        // Boost pressure A/B commanded + actual, then A/B control status in byte J
        0x70 => (
            10,
            vec![
                support(6),
                word(1).scaled(0.03125, 0.0),
                word(3).scaled(0.03125, 0.0),
                word(5).scaled(0.03125, 0.0),
                word(7).scaled(0.03125, 0.0),
                byte(9).bits(0, 2),
                byte(9).bits(2, 2),
            ],
        ),
        0x71 => (
            6,
            vec![
                support(6),
                percent(1),
                percent(2),
                percent(3),
                percent(4),
                byte(5).bits(0, 2),
                byte(5).bits(2, 2),
            ],
        ),
        0x72 => (
            5,
            vec![support(4), percent(1), percent(2), percent(3), percent(4)],
        ),
        0x73 => (
            5,
            vec![
                support(2),
                word(1).scaled(0.01, 0.0),
                word(3).scaled(0.01, 0.0),
            ],
        ),
        0x74 => (
            5,
            vec![
                support(2),
                word(1).scaled(10.0, 0.0),
                word(3).scaled(10.0, 0.0),
            ],
        ),
        0x75 | 0x76 => (
            7,
            vec![support(4), temp(1), temp(2), word_temp(3), word_temp(5)],
        ),
        0x77 => (5, vec![support(4), temp(1), temp(2), temp(3), temp(4)]),
        0x78 | 0x79 | 0x98 | 0x99 => (
            9,
            vec![
                support(4),
                word_temp(1),
                word_temp(3),
                word_temp(5),
                word_temp(7),
            ],
        ),
        // DPF delta, inlet and outlet pressure (kPa)
        0x7A | 0x7B => (
            7,
            vec![
                support(3),
                word(1).scaled(0.01, 0.0),
                word(3).scaled(0.01, 0.0),
                word(5).scaled(0.01, 0.0),
            ],
        ),
        0x7C => (
            9,
            vec![
                support(4),
                word_temp(1),
                word_temp(3),
                word_temp(5),
                word_temp(7),
            ],
        ),
        0x7D | 0x7E => (1, vec![]),
        // Total, idle and PTO run time (s)
        0x7F => (13, vec![support(3), dword(1), dword(5), dword(9)]),
        0x81 | 0x82 => (41, vec![]),
        0x83 => (9, vec![support(4), word(1), word(3), word(5), word(7)]),
        0x84 => (1, vec![temp(0)]),
        0x85 => (
            10,
            vec![
                support(4),
                word(1).scaled(0.005, 0.0),
                word(3).scaled(0.005, 0.0),
                percent(5),
                dword(6),
            ],
        ),
        0x86 => (
            5,
            vec![
                support(2),
                word(1).scaled(0.0125, 0.0),
                word(3).scaled(0.0125, 0.0),
            ],
        ),
        0x87 => (
            5,
            vec![
                support(2),
                word(1).scaled(0.03125, 0.0),
                word(3).scaled(0.03125, 0.0),
            ],
        ),
        0x88 => (13, vec![]),
        0x89 | 0x8A => (41, vec![]),
        0x8B => (7, vec![]),
        0x8C => (
            17,
            vec![
                byte(0),
                word(1).scaled(1.0 / 32768.0, 0.0),
                word(3).scaled(1.0 / 32768.0, 0.0),
                word(5).scaled(1.0 / 32768.0, 0.0),
                word(7).scaled(1.0 / 32768.0, 0.0),
                word(9).scaled(1.0 / 32768.0, 0.0),
                word(11).scaled(1.0 / 32768.0, 0.0),
                word(13).scaled(1.0 / 32768.0, 0.0),
                word(15).scaled(1.0 / 32768.0, 0.0),
            ],
        ),
        0x8D => (1, vec![percent(0)]),
        0x8E => (1, vec![torque(0)]),
        0x8F => (7, vec![]),
        0x90 => (3, vec![]),
        0x91 => (5, vec![]),
        0x92 => (2, vec![byte(0), byte(1)]),
        0x93 => (3, vec![]),
        0x94 => (12, vec![]),
        // Hybrid/EV battery: pack voltage (V), pack current (A)
        0x9A => (
            6,
            vec![
                byte(0),
                word(1).scaled(0.015625, 0.0),
                word(3).scaled(0.1, -3276.8),
                byte(5),
            ],
        ),
        // DEF concentration (%), tank temperature, tank level
        0x9B => (
            4,
            vec![byte(0), byte(1).scaled(0.25, 0.0), temp(2), percent(3)],
        ),
        0x9C => (
            17,
            vec![
                byte(0),
                word(1).scaled(0.001, 0.0),
                word(3).scaled(0.001, 0.0),
                word(5).scaled(0.001, 0.0),
                word(7).scaled(0.001, 0.0),
                word(9).scaled(0.001, 0.0),
                word(11).scaled(0.001, 0.0),
                word(13).scaled(0.001, 0.0),
                word(15).scaled(0.001, 0.0),
            ],
        ),
        0x9D => (
            4,
            vec![word(0).scaled(0.02, 0.0), word(2).scaled(0.02, 0.0)],
        ),
        0x9E => (2, vec![word(0).scaled(0.2, 0.0)]),
        0x9F => (
            9,
            vec![
                byte(0),
                percent(1),
                percent(2),
                percent(3),
                percent(4),
                percent(5),
                percent(6),
                percent(7),
                percent(8),
            ],
        ),
        0xA1 | 0xA3 => (9, vec![]),
        0xA2 => (2, vec![word(0).scaled(0.03125, 0.0)]),
        // Actual gear (upper nibble of B), gear ratio
        0xA4 => (
            4,
            vec![byte(0), byte(1).bits(4, 4), word(2).scaled(0.001, 0.0)],
        ),
        0xA5 => (4, vec![]),
        0xA6 => (4, vec![dword(0).scaled(0.1, 0.0)]),
        0xA7..=0xA9 => (4, vec![]),
        // Reserved
        _ => (0, vec![]),
    }
}

fn vehicle_info_layout(pid: Pid) -> (usize, Vec<SignalFormula>) {
    match pid {
        0x00 => (4, vec![]),
        // Message counts
        0x01 | 0x03 | 0x05 | 0x07 | 0x09 => (1, vec![byte(0)]),
        // VIN text, decoded separately
        0x02 => (17, vec![]),
        0x04 => (16, vec![]),
        0x06 => (4, vec![]),
        0x08 | 0x0B => (40, vec![]),
        0x0A => (20, vec![]),
        _ => (0, vec![]),
    }
}
