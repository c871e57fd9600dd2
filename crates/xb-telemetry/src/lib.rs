//! # XB Telemetry
//!
//! Logging and metrics for XBridge.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` with an `EnvFilter` and a pretty or JSON
//!   formatter
//! - **Metrics**: Prometheus counters and histograms in a global registry,
//!   rendered with [`gather`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xb_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     let _guard = init_telemetry(TelemetryConfig::from_env()).expect("telemetry");
//!     // transfers are now logged and counted
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `XB_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `XB_JSON_LOGS` | `false` | JSON log lines |
//! | `XB_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `XB_SERVICE_NAME` | `xbridge` | Service name |
//! | `XB_NETWORK` | `simnet` | Network name |

#![warn(missing_docs)]

mod config;
mod logging;
mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    gather, record_fee_fallback, record_peer_reconcile, record_transfer, register_metrics,
    MetricsHandle, DELIVERY_POLL_ATTEMPTS, FEE_FALLBACKS, PEER_WRITES, REGISTRY, STAGE_OUTCOMES,
    TRANSFERS_TOTAL,
};
pub use tracing_setup::build_filter;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Global subscriber could not be installed.
    #[error("Failed to initialize tracing: {0}")]
    TracerInit(String),

    /// Metric registration or encoding failed.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    /// Filter directive or other setting rejected.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard to hold for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first, so nothing logged during startup goes uncounted
    let metrics = register_metrics()?;
    tracing_setup::init_tracing(&config)?;

    Ok(TelemetryGuard {
        service: config.full_service_name(),
        metrics,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service: String,
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    /// Metrics registered at startup.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service, "Shutting down telemetry");
    }
}
