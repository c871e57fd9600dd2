//! Orchestrator configuration and validation
//!
//! # Example
//!
//! ```ignore
//! use xb_transfer::domain::OrchestratorConfig;
//!
//! let config = OrchestratorConfig::default()
//!     .with_simulate_before_send(true)
//!     .with_max_poll_attempts(60)
//!     .with_poll_interval_ms(5_000);
//! config.validate().expect("Valid config");
//! ```

use super::errors::TransferError;
use super::units::{parse_units, NATIVE_DECIMALS};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::env;

/// Default fallback fee in native units, used when quoting fails.
pub const DEFAULT_FALLBACK_FEE: &str = "0.3";

/// Pipeline configuration.
///
/// Network-specific values (fallback fee, poll cadence) are injected here
/// rather than branched on in code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Native fee substituted when quoting fails. Must overestimate.
    pub fallback_fee: U256,
    /// Dry-run every transfer before submitting it.
    pub simulate_before_send: bool,
    /// Delay between delivery observations.
    pub poll_interval_ms: u64,
    /// Observation budget for delivery watching.
    pub max_poll_attempts: u32,
    /// Reconcile the destination's binding back to the source as well.
    pub require_bidirectional_wiring: bool,
    /// Ask for the protocol-token fee path instead of native-only.
    pub use_protocol_token: bool,
    /// Upper bound on a single quote call.
    pub quote_timeout_ms: u64,
    /// Upper bound on a single destination read; a timed-out read counts as
    /// a failed observation.
    pub observe_timeout_ms: u64,
    /// Simulate only, never submit.
    pub dry_run: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            // 0.3 native units
            fallback_fee: U256::from(300_000_000_000_000_000u64),
            simulate_before_send: true,
            poll_interval_ms: 5_000,
            max_poll_attempts: 60,
            require_bidirectional_wiring: true,
            use_protocol_token: false,
            quote_timeout_ms: 10_000,
            observe_timeout_ms: 10_000,
            dry_run: false,
        }
    }
}

impl OrchestratorConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.fallback_fee.is_zero() {
            return Err(TransferError::InvalidConfig(
                "fallback_fee must be non-zero; an underestimated fee fails the transfer"
                    .to_string(),
            ));
        }

        if self.max_poll_attempts > 0 && self.poll_interval_ms == 0 {
            return Err(TransferError::InvalidConfig(
                "poll_interval_ms cannot be 0 while polling is enabled".to_string(),
            ));
        }

        if self.quote_timeout_ms == 0 {
            return Err(TransferError::InvalidConfig(
                "quote_timeout_ms cannot be 0".to_string(),
            ));
        }

        if self.observe_timeout_ms == 0 {
            return Err(TransferError::InvalidConfig(
                "observe_timeout_ms cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `XB_FALLBACK_FEE`: fallback fee in native units, decimal (default: 0.3)
    /// - `XB_SIMULATE_BEFORE_SEND`: dry-run before sending (default: true)
    /// - `XB_POLL_INTERVAL_MS`: delivery poll interval (default: 5000)
    /// - `XB_MAX_POLL_ATTEMPTS`: delivery poll budget (default: 60)
    /// - `XB_REQUIRE_BIDIRECTIONAL_WIRING`: wire both directions (default: true)
    /// - `XB_USE_PROTOCOL_TOKEN`: request protocol-token fees (default: false)
    /// - `XB_QUOTE_TIMEOUT_MS`: quote timeout (default: 10000)
    /// - `XB_OBSERVE_TIMEOUT_MS`: destination read timeout (default: 10000)
    /// - `XB_DRY_RUN`: simulate only (default: false)
    ///
    /// Unset variables keep their defaults; malformed ones are errors. Flags
    /// accept `true`/`false`/`1`/`0` in any letter case.
    pub fn from_env() -> Result<Self, TransferError> {
        let defaults = Self::default();

        let fallback_fee = match env::var("XB_FALLBACK_FEE") {
            Ok(v) => parse_units(&v, NATIVE_DECIMALS)?,
            Err(_) => defaults.fallback_fee,
        };

        let config = Self {
            fallback_fee,
            simulate_before_send: env_flag(
                "XB_SIMULATE_BEFORE_SEND",
                defaults.simulate_before_send,
            )?,
            poll_interval_ms: env_number("XB_POLL_INTERVAL_MS", defaults.poll_interval_ms)?,
            max_poll_attempts: env_number("XB_MAX_POLL_ATTEMPTS", defaults.max_poll_attempts)?,
            require_bidirectional_wiring: env_flag(
                "XB_REQUIRE_BIDIRECTIONAL_WIRING",
                defaults.require_bidirectional_wiring,
            )?,
            use_protocol_token: env_flag("XB_USE_PROTOCOL_TOKEN", defaults.use_protocol_token)?,
            quote_timeout_ms: env_number("XB_QUOTE_TIMEOUT_MS", defaults.quote_timeout_ms)?,
            observe_timeout_ms: env_number("XB_OBSERVE_TIMEOUT_MS", defaults.observe_timeout_ms)?,
            dry_run: env_flag("XB_DRY_RUN", defaults.dry_run)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Builder-style method to set the fallback fee
    pub fn with_fallback_fee(mut self, fee: impl Into<U256>) -> Self {
        self.fallback_fee = fee.into();
        self
    }

    /// Builder-style method to toggle simulation
    pub fn with_simulate_before_send(mut self, enabled: bool) -> Self {
        self.simulate_before_send = enabled;
        self
    }

    /// Builder-style method to set the poll interval
    pub fn with_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms;
        self
    }

    /// Builder-style method to set the poll budget
    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts;
        self
    }

    /// Builder-style method to toggle bidirectional wiring
    pub fn with_bidirectional_wiring(mut self, required: bool) -> Self {
        self.require_bidirectional_wiring = required;
        self
    }

    /// Builder-style method to request protocol-token fees
    pub fn with_protocol_token(mut self, enabled: bool) -> Self {
        self.use_protocol_token = enabled;
        self
    }

    /// Builder-style method to set the quote timeout
    pub fn with_quote_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.quote_timeout_ms = timeout_ms;
        self
    }

    /// Builder-style method to set the observation timeout
    pub fn with_observe_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.observe_timeout_ms = timeout_ms;
        self
    }

    /// Builder-style method to toggle dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

fn env_flag(name: &str, default: bool) -> Result<bool, TransferError> {
    let Ok(v) = env::var(name) else {
        return Ok(default);
    };
    match v.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(TransferError::InvalidConfig(format!(
            "{name}={v} is not a flag (true/false/1/0)"
        ))),
    }
}

fn env_number<T: std::str::FromStr>(name: &str, default: T) -> Result<T, TransferError> {
    match env::var(name) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| TransferError::InvalidConfig(format!("{name}={v} is not a number"))),
        Err(_) => Ok(default),
    }
}
