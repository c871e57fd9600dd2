//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive
    pub log_level: String,

    /// Whether to enable console output
    pub console_output: bool,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Deployment or network name (simnet, testnet, mainnet)
    pub network: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "xbridge".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
            network: "simnet".to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `XB_SERVICE_NAME`: Service name (default: xbridge)
    /// - `XB_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `XB_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `XB_JSON_LOGS`: Enable JSON logs (default: false in dev, true in containers)
    /// - `XB_NETWORK`: Network name (default: simnet)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("XB_SERVICE_NAME").unwrap_or_else(|_| "xbridge".to_string()),

            log_level: env::var("XB_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("XB_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: env::var("XB_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),

            network: env::var("XB_NETWORK").unwrap_or_else(|_| "simnet".to_string()),
        }
    }

    /// Override the log level (e.g. from a `--verbose` flag).
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Service name qualified by network.
    pub fn full_service_name(&self) -> String {
        format!("{}-{}", self.service_name, self.network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "xbridge");
        assert_eq!(config.log_level, "info");
        assert!(!config.json_logs);
    }

    #[test]
    fn test_full_service_name() {
        let mut config = TelemetryConfig::default();
        assert_eq!(config.full_service_name(), "xbridge-simnet");

        config.network = "testnet".to_string();
        assert_eq!(config.full_service_name(), "xbridge-testnet");
    }

    #[test]
    fn test_with_log_level() {
        let config = TelemetryConfig::default().with_log_level("xb_transfer=debug");
        assert_eq!(config.log_level, "xb_transfer=debug");
    }
}
