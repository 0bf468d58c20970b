//! Scripted vehicle used until a CAN transport is wired in.

use dx_protocol::{EcuType, Request, ServiceMode};
use dx_session::{SessionEvent, SimulatedEcu};
use tokio::sync::mpsc;

const DEMO_VIN: &str = "1FTFW1ET5DFC10312";

fn current(pid: u8) -> Request {
    Request::new(ServiceMode::CurrentStats, pid)
}

fn info(pid: u8) -> Request {
    Request::new(ServiceMode::VehicleInfo, pid)
}

/// VIN response payload: item count byte, then the 17 characters.
fn vin_payload(vin: &str) -> Vec<u8> {
    let vin = if vin.len() == dx_decoder::vin::VIN_LEN {
        vin
    } else {
        DEMO_VIN
    };
    let mut payload = vec![0x01];
    payload.extend_from_slice(vin.as_bytes());
    payload
}

/// A warm, idling vehicle with one stored and no pending trouble codes.
pub fn demo_ecu(ecu_type: EcuType, vin: &str, events: mpsc::Sender<SessionEvent>) -> SimulatedEcu {
    let ecu = SimulatedEcu::new(events)
        .respond(Request::dtc_block(ServiceMode::PendingDtc), Vec::new())
        .respond(info(0x01), [0x01])
        .respond(info(0x02), vin_payload(vin));

    match ecu_type {
        EcuType::Engine => ecu
            .supports(&[0x04, 0x05, 0x0C, 0x0D, 0x0F, 0x10, 0x11, 0x2F, 0x46, 0x5C])
            .respond(current(0x04), [0x33]) // 20 %
            .respond(current(0x05), [0x73]) // 75 °C
            .respond(current(0x0C), [0x0C, 0x80]) // 800 rpm
            .respond(current(0x0D), [0x00]) // 0 km/h
            .respond(current(0x0F), [0x41]) // 25 °C
            .respond(current(0x10), [0x01, 0x90]) // 4 g/s
            .respond(current(0x11), [0x26]) // 15 %
            .respond(current(0x2F), [0x99]) // 60 %
            .respond(current(0x46), [0x3C]) // 20 °C
            .silent(current(0x5C))
            .respond(Request::dtc_block(ServiceMode::StoredDtc), [0x01, 0x71])
            .respond(Request::FREEZE_FRAME_DTC, [0x01, 0x71]),
        EcuType::Transmission | EcuType::Other => ecu
            .supports(&[0x0D, 0xA4])
            .respond(current(0x0D), [0x00])
            .respond(current(0xA4), [0x00, 0x10, 0x0F, 0xA0]) // 1st gear, ratio 4.0
            .respond(Request::dtc_block(ServiceMode::StoredDtc), Vec::new()),
    }
}
