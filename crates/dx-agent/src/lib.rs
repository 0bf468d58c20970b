//! Edge agent library: configuration, per-ECU pollers and record output.
//!
//! Exposed as a library so `dx-e2e-tests` can drive pollers directly.

pub mod config;
pub mod ecu;
pub mod publisher;
pub mod simulation;
