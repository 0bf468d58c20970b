//! Agent configuration, loadable from TOML.

use std::time::Duration;

use dx_decoder::{Catalog, DecoderManifest};
use dx_protocol::{EcuType, ServiceMode};
use serde::Deserialize;

/// Top-level configuration for the edge agent.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// How long a polling phase waits for outstanding responses.
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
    /// Time between cycle starts per ECU.
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_secs: u64,
    /// JSON decoder manifest. None uses the built-in catalog.
    #[serde(default)]
    pub manifest_path: Option<String>,
    /// Service modes polled each cycle, in order.
    #[serde(default = "default_modes")]
    pub modes: Vec<u8>,
    #[serde(default = "default_ecus")]
    pub ecus: Vec<EcuConfig>,
}

/// One ECU to poll.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EcuConfig {
    #[serde(default)]
    pub ecu_type: Option<EcuType>,
    /// Known VIN; replaced by the ECU's own report when mode 09 is polled.
    #[serde(default)]
    pub vin: String,
    /// OBD-II response CAN ID (0x7E8..0x7EF).
    #[serde(default)]
    pub response_id: Option<u32>,
}

fn default_keep_alive() -> u64 {
    2
}

fn default_cycle_interval() -> u64 {
    10
}

fn default_modes() -> Vec<u8> {
    vec![0x01, 0x03, 0x07, 0x09]
}

fn default_ecus() -> Vec<EcuConfig> {
    vec![EcuConfig {
        ecu_type: Some(EcuType::Engine),
        ..Default::default()
    }]
}

impl EcuConfig {
    /// Explicit type, else derived from the response id, else engine.
    pub fn resolved_type(&self) -> EcuType {
        self.ecu_type
            .or(self.response_id.map(EcuType::from_response_id))
            .unwrap_or(EcuType::Engine)
    }
}

impl AgentConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    /// Configured modes as typed service modes.
    pub fn service_modes(&self) -> anyhow::Result<Vec<ServiceMode>> {
        self.modes
            .iter()
            .map(|&m| ServiceMode::try_from(m).map_err(anyhow::Error::from))
            .collect()
    }

    /// Build and validate the catalog. Any formula error is fatal.
    pub fn load_catalog(&self) -> anyhow::Result<Catalog> {
        let catalog = match &self.manifest_path {
            Some(path) => {
                tracing::info!(path = %path, "loading decoder manifest");
                Catalog::from_manifest(DecoderManifest::from_file(path)?)?
            }
            None => Catalog::builtin()?,
        };
        Ok(catalog)
    }
}
