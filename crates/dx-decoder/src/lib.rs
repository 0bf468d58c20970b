//! Formula-driven OBD-II decoding.
//!
//! The [`Catalog`] maps (mode, PID) to [`ParameterInfo`]; [`extract`] turns
//! one [`SignalFormula`] plus a response payload into a physical value;
//! [`resolve_supported`] turns range bitmasks into the set of PIDs worth
//! polling; [`decode_dtc_block`] renders raw trouble codes.

mod builtin;
pub mod catalog;
pub mod dtc;
pub mod error;
pub mod extract;
pub mod formula;
pub mod manifest;
pub mod safety;
pub mod supported;
pub mod vin;

pub use catalog::Catalog;
pub use dtc::{decode_dtc, decode_dtc_block};
pub use error::{DecodeError, DecodeResult};
pub use extract::{DecodedParameter, decode_parameter, extract};
pub use formula::{ParameterInfo, SignalFormula};
pub use manifest::DecoderManifest;
pub use supported::{SupportedParameterSet, resolve_supported};
pub use vin::decode_vin;
