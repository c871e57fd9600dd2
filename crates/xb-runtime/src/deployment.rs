//! Deployment file loading.
//!
//! ```toml
//! owner = "0x1111111111111111111111111111111111111111"
//!
//! [orchestrator]
//! fallback_fee = "0.3"
//! poll_interval_ms = 1000
//! max_poll_attempts = 30
//!
//! [simnet]
//! relay_interval_ms = 2500
//!
//! [[endpoints]]
//! name = "sepolia"
//! eid = 40161
//! contract = "0xA1A1A1A1A1A1A1A1A1A1A1A1A1A1A1A1A1A1A1A1"
//! native = true
//! fee = "0.001"
//! balance = "10"
//! dvns = ["0xD1D1D1D1D1D1D1D1D1D1D1D1D1D1D1D1D1D1D1D1"]
//! executor = "0xE1E1E1E1E1E1E1E1E1E1E1E1E1E1E1E1E1E1E1E1"
//!
//! [[connections]]
//! from = "sepolia"
//! to = "arbitrum-sepolia"
//! ```
//!
//! Without `[[connections]]` every endpoint is connected to every other.
//! `dvns` and `executor` are applied by `wire` to every outbound path of
//! their endpoint; omitted ones are left untouched.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;
use xb_transfer::{
    parse_units, Address, EndpointId, MeshTopology, OrchestratorConfig, PathSettings,
    TransferError, NATIVE_DECIMALS,
};

/// Errors that can occur while loading a deployment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("Failed to read {path}: {message}")]
    Io {
        /// Path that failed.
        path: String,
        /// Error message from the I/O operation.
        message: String,
    },

    /// File is not valid TOML or does not match the schema.
    #[error("Failed to parse deployment: {0}")]
    Parse(String),

    /// Values parse but are inconsistent.
    #[error("Invalid deployment: {0}")]
    Invalid(String),
}

impl From<TransferError> for ConfigError {
    fn from(err: TransferError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}

/// Overrides for [`OrchestratorConfig`]; unset keys keep the base value.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrchestratorSection {
    /// Fallback fee in native units, decimal.
    pub fallback_fee: Option<String>,
    /// Dry-run before sending.
    pub simulate_before_send: Option<bool>,
    /// Delivery poll interval.
    pub poll_interval_ms: Option<u64>,
    /// Delivery poll budget.
    pub max_poll_attempts: Option<u32>,
    /// Wire both directions.
    pub require_bidirectional_wiring: Option<bool>,
    /// Request protocol-token fees.
    pub use_protocol_token: Option<bool>,
    /// Quote timeout.
    pub quote_timeout_ms: Option<u64>,
    /// Destination read timeout.
    pub observe_timeout_ms: Option<u64>,
    /// Simulate only.
    pub dry_run: Option<bool>,
}

/// Simulated network settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimnetSection {
    /// How often in-flight messages are delivered.
    #[serde(default = "default_relay_interval_ms")]
    pub relay_interval_ms: u64,
}

fn default_relay_interval_ms() -> u64 {
    2_500
}

impl Default for SimnetSection {
    fn default() -> Self {
        Self {
            relay_interval_ms: default_relay_interval_ms(),
        }
    }
}

/// One deployed adapter.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointSection {
    /// Human-readable network name.
    pub name: String,
    /// Messaging endpoint id.
    pub eid: u32,
    /// Adapter contract address.
    pub contract: Address,
    /// Whether the adapter wraps the native asset.
    #[serde(default)]
    pub native: bool,
    /// Messaging fee charged per send, in native units.
    #[serde(default = "default_fee")]
    pub fee: String,
    /// Native balance credited to the owner at startup.
    #[serde(default = "default_balance")]
    pub balance: String,
    /// Adapter tokens minted to the owner at startup (token adapters).
    #[serde(default)]
    pub tokens: Option<String>,
    /// Verifiers required on outbound paths.
    #[serde(default)]
    pub dvns: Vec<Address>,
    /// Executor for outbound paths.
    #[serde(default)]
    pub executor: Option<Address>,
}

impl EndpointSection {
    /// Path settings declared for this endpoint.
    pub fn path_settings(&self) -> PathSettings {
        PathSettings {
            verifiers: self.dvns.clone(),
            executor: self.executor,
        }
    }
}

fn default_fee() -> String {
    "0.001".to_string()
}

fn default_balance() -> String {
    "10".to_string()
}

/// One directed connection, by endpoint name or numeric id.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSection {
    /// Endpoint holding the binding.
    pub from: String,
    /// Endpoint the binding points at.
    pub to: String,
}

/// Parsed deployment file.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Deployment {
    /// Owner and signer of every adapter.
    pub owner: Address,
    /// Orchestrator overrides.
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
    /// Simnet settings.
    #[serde(default)]
    pub simnet: SimnetSection,
    /// Deployed adapters.
    pub endpoints: Vec<EndpointSection>,
    /// Connection graph.
    #[serde(default)]
    pub connections: Vec<ConnectionSection>,
}

impl Deployment {
    /// Load from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let deployment: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        deployment.validate()?;
        Ok(deployment)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.len() < 2 {
            return Err(ConfigError::Invalid(
                "at least two endpoints are required".to_string(),
            ));
        }
        if self.owner.is_zero() {
            return Err(ConfigError::Invalid("owner is the zero address".to_string()));
        }

        let mut eids = HashSet::new();
        let mut names = HashSet::new();
        for endpoint in &self.endpoints {
            if !eids.insert(endpoint.eid) {
                return Err(ConfigError::Invalid(format!("duplicate eid {}", endpoint.eid)));
            }
            if !names.insert(endpoint.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate endpoint name {}",
                    endpoint.name
                )));
            }
            parse_units(&endpoint.fee, NATIVE_DECIMALS)?;
            parse_units(&endpoint.balance, NATIVE_DECIMALS)?;
            if let Some(tokens) = &endpoint.tokens {
                parse_units(tokens, NATIVE_DECIMALS)?;
            }
            if endpoint.dvns.iter().chain(&endpoint.executor).any(Address::is_zero) {
                return Err(ConfigError::Invalid(format!(
                    "zero dvn or executor address on {}",
                    endpoint.name
                )));
            }
        }

        for connection in &self.connections {
            self.resolve(&connection.from)?;
            self.resolve(&connection.to)?;
        }
        Ok(())
    }

    /// Resolve an endpoint by name or numeric id.
    pub fn resolve(&self, key: &str) -> Result<EndpointId, ConfigError> {
        let by_name = self.endpoints.iter().find(|e| e.name == key);
        let by_eid = key
            .parse::<u32>()
            .ok()
            .and_then(|eid| self.endpoints.iter().find(|e| e.eid == eid));
        by_name
            .or(by_eid)
            .map(|e| EndpointId::new(e.eid))
            .ok_or_else(|| ConfigError::Invalid(format!("unknown endpoint {key}")))
    }

    /// Name of `endpoint`, or its id when unnamed.
    pub fn name_of(&self, endpoint: EndpointId) -> String {
        self.endpoints
            .iter()
            .find(|e| e.eid == endpoint.get())
            .map(|e| e.name.clone())
            .unwrap_or_else(|| endpoint.to_string())
    }

    /// Connection graph with path settings; a full mesh when no connections
    /// are listed.
    pub fn topology(&self) -> Result<MeshTopology, ConfigError> {
        let mut topology = if self.connections.is_empty() {
            let ids: Vec<EndpointId> = self
                .endpoints
                .iter()
                .map(|e| EndpointId::new(e.eid))
                .collect();
            MeshTopology::full_mesh(&ids)
        } else {
            let mut topology = MeshTopology::new();
            for connection in &self.connections {
                topology =
                    topology.connect(self.resolve(&connection.from)?, self.resolve(&connection.to)?);
            }
            topology
        };

        for endpoint in &self.endpoints {
            topology = topology.with_settings(endpoint.eid, endpoint.path_settings());
        }
        Ok(topology)
    }

    /// Apply the file's overrides on top of `base`, then validate.
    pub fn orchestrator_config(
        &self,
        base: OrchestratorConfig,
    ) -> Result<OrchestratorConfig, ConfigError> {
        let section = &self.orchestrator;
        let mut config = base;
        if let Some(fee) = &section.fallback_fee {
            config.fallback_fee = parse_units(fee, NATIVE_DECIMALS)?;
        }
        if let Some(v) = section.simulate_before_send {
            config.simulate_before_send = v;
        }
        if let Some(v) = section.poll_interval_ms {
            config.poll_interval_ms = v;
        }
        if let Some(v) = section.max_poll_attempts {
            config.max_poll_attempts = v;
        }
        if let Some(v) = section.require_bidirectional_wiring {
            config.require_bidirectional_wiring = v;
        }
        if let Some(v) = section.use_protocol_token {
            config.use_protocol_token = v;
        }
        if let Some(v) = section.quote_timeout_ms {
            config.quote_timeout_ms = v;
        }
        if let Some(v) = section.observe_timeout_ms {
            config.observe_timeout_ms = v;
        }
        if let Some(v) = section.dry_run {
            config.dry_run = v;
        }
        config.validate()?;
        Ok(config)
    }
}
