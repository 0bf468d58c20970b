//! Externally supplied decoder manifest (JSON).
//!
//! ```json
//! {
//!   "parameters": [
//!     { "mode": "current_stats", "pid": 12, "response_len": 2,
//!       "formulas": [ { "signal_id": 100, "num_of_bytes": 2, "scaling": 0.25 } ] }
//!   ]
//! }
//! ```
//!
//! Formula fields default as in [`SignalFormula`](crate::SignalFormula).

use std::path::Path;

use dx_protocol::ServiceMode;
use serde::{Deserialize, Serialize};

use crate::error::DecodeResult;
use crate::formula::ParameterInfo;

/// One manifest row: a [`ParameterInfo`] tagged with its mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub mode: ServiceMode,
    #[serde(flatten)]
    pub info: ParameterInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecoderManifest {
    #[serde(default)]
    pub parameters: Vec<ManifestEntry>,
}

impl DecoderManifest {
    pub fn from_json_str(json: &str) -> DecodeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a manifest file. Validation happens when it is turned into a
    /// [`Catalog`](crate::Catalog).
    pub fn from_file(path: impl AsRef<Path>) -> DecodeResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn into_parameters(self) -> impl Iterator<Item = (ServiceMode, ParameterInfo)> {
        self.parameters.into_iter().map(|e| (e.mode, e.info))
    }
}
