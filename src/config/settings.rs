//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::receiver::MAX_WAIT_MS;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Command receiver (HTTP ingress) settings.
    #[serde(default)]
    pub receiver: ReceiverConfig,

    /// Host-thread pump settings.
    #[serde(default)]
    pub pump: PumpConfig,

    /// Tool gateway (MCP server) settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Simulated host settings.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=60_000).contains(&self.pump.tick_interval_ms) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "pump.tick_interval_ms must be between 1 and 60000, got {}",
                    self.pump.tick_interval_ms
                ),
            });
        }

        if self.gateway.max_retries == 0 {
            return Err(ConfigError::ValidationError {
                message: "gateway.max_retries must be at least 1".to_string(),
            });
        }

        if self.gateway.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                message: "gateway.request_timeout_secs must be at least 1".to_string(),
            });
        }

        self.gateway.validate()?;

        let url = &self.gateway.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid gateway.base_url '{url}'. Must start with http:// or https://"
                ),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ),
            });
        }

        Ok(())
    }
}

/// Command receiver configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReceiverConfig {
    /// Interface to bind. Loopback only in normal deployments.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port. `0` picks an ephemeral port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ReceiverConfig {
    /// Returns the `host:port` string to bind.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    5000
}

/// Host-thread pump configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PumpConfig {
    /// Period of the tick trigger in milliseconds.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
        }
    }
}

const fn default_tick_interval() -> u64 {
    200
}

/// Tool gateway configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Base URL of the command receiver.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Total number of attempts per request.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between attempts in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// How long query-style tools ask the receiver to wait for their result.
    #[serde(default = "default_result_wait")]
    pub result_wait_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
            result_wait_ms: default_result_wait(),
        }
    }
}

impl GatewayConfig {
    /// Checks that a query's server-side wait ends before the client gives up.
    ///
    /// A client timeout counts as a transport failure and is retried, which
    /// would queue the same command again on every attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if `result_wait_ms` exceeds the receiver's cap or is not
    /// shorter than `request_timeout_secs`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.result_wait_ms > MAX_WAIT_MS {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "gateway.result_wait_ms must be at most {MAX_WAIT_MS}, got {}",
                    self.result_wait_ms
                ),
            });
        }

        let timeout_ms = self.request_timeout_secs.saturating_mul(1000);
        if self.result_wait_ms >= timeout_ms {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "gateway.result_wait_ms ({}) must be shorter than gateway.request_timeout_secs ({timeout_ms} ms)",
                    self.result_wait_ms
                ),
            });
        }

        Ok(())
    }
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

const fn default_request_timeout() -> u64 {
    10
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_retry_delay() -> u64 {
    2000
}

const fn default_result_wait() -> u64 {
    5000
}

/// Simulated host configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Directory for exported files. Defaults to a folder in the system temp dir.
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
