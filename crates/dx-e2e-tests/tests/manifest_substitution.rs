//! E2E tests for replacing the built-in catalog with a decoder manifest.

mod helpers;

use std::time::Duration;

use dx_decoder::{Catalog, DecodeError, DecoderManifest};
use dx_protocol::{EcuType, Request, ServiceMode};

use helpers::{TestHarness, assert_cycle_invariant};

const MANIFEST: &str = r#"{
    "parameters": [
        { "mode": "current_stats", "pid": 12, "response_len": 2,
          "formulas": [ { "signal_id": 5001, "num_of_bytes": 2, "scaling": 0.25 } ] },
        { "mode": "current_stats", "pid": 112, "response_len": 10,
          "formulas": [
            { "signal_id": 5002, "byte_offset": 1, "num_of_bytes": 2, "scaling": 0.03125 },
            { "signal_id": 5003, "byte_offset": 9, "bit_shift": 2, "bit_mask_len": 2 }
          ] },
        { "mode": "vehicle_info", "pid": 2, "response_len": 17 }
    ]
}"#;

fn current(pid: u8) -> Request {
    Request::new(ServiceMode::CurrentStats, pid)
}

/// Manifest signal ids flow through to the record; the built-in tables are
/// not consulted.
#[tokio::test]
async fn e2e_manifest_catalog_drives_decoding() {
    let h = TestHarness::with_manifest(MANIFEST);
    let mut ecu = h.ecu(
        EcuType::Engine,
        &[ServiceMode::CurrentStats],
        Duration::from_secs(2),
        |ecu| {
            ecu.supports(&[0x05, 0x0C, 0x70])
                .respond(current(0x05), [0x73])
                .respond(current(0x0C), [0x1A, 0xF8])
                .respond(current(0x70), [0, 0x00, 0x40, 0, 0, 0, 0, 0, 0, 0b0000_1100])
        },
    );

    let record = ecu.runner.run_cycle().await.unwrap().unwrap();

    assert_eq!(record.value(ServiceMode::CurrentStats, 5001), Some(1726.0));
    assert_eq!(record.value(ServiceMode::CurrentStats, 5002), Some(2.0));
    assert_eq!(record.value(ServiceMode::CurrentStats, 5003), Some(3.0));
    // Built-in ids are not produced.
    assert_eq!(record.value(ServiceMode::CurrentStats, 0x01_0C_00), None);
    // 0x05 is supported by the ECU but absent from the manifest.
    assert!(!ecu.ecu.sent_requests().await.contains(&current(0x05)));
    assert_eq!(record.stats.requested, 2);
    assert_cycle_invariant(&record.stats);
}

/// A manifest with an out-of-bounds formula never becomes a catalog.
#[test]
fn e2e_invalid_manifest_is_rejected_at_load() {
    let json = r#"{ "parameters": [
        { "mode": "current_stats", "pid": 12, "response_len": 2,
          "formulas": [ { "signal_id": 1, "byte_offset": 1, "num_of_bytes": 2 } ] }
    ] }"#;
    let manifest = DecoderManifest::from_json_str(json).unwrap();
    assert!(matches!(
        Catalog::from_manifest(manifest),
        Err(DecodeError::InvalidFormula { pid: 12, .. })
    ));
}

/// Duplicate signal ids across parameters are a catalog error.
#[test]
fn e2e_duplicate_signal_ids_rejected() {
    let json = r#"{ "parameters": [
        { "mode": "current_stats", "pid": 12, "response_len": 2,
          "formulas": [ { "signal_id": 7, "num_of_bytes": 2 } ] },
        { "mode": "current_stats", "pid": 13, "response_len": 1,
          "formulas": [ { "signal_id": 7 } ] }
    ] }"#;
    let manifest = DecoderManifest::from_json_str(json).unwrap();
    assert!(matches!(
        Catalog::from_manifest(manifest),
        Err(DecodeError::InvalidCatalog(_))
    ));
}

/// Substitution leaves the fixed freeze-frame and vehicle-info tables intact.
#[test]
fn e2e_manifest_keeps_fixed_request_tables() {
    let h = TestHarness::with_manifest(MANIFEST);
    assert_eq!(
        h.catalog.fixed_requests(ServiceMode::FreezeFrame),
        vec![Request::FREEZE_FRAME_DTC]
    );
    // Only the VIN is requested: the manifest defines no message counts.
    assert_eq!(
        h.catalog.fixed_requests(ServiceMode::VehicleInfo),
        vec![Request::VIN]
    );
}
