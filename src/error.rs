//! Error types for cad-bridge-mcp.
//!
//! Host-side failures live in [`crate::host::HostError`]; request validation
//! failures live in [`crate::ops::FieldError`]. This module holds the errors
//! that cross component boundaries: configuration, bridge lifecycle and the
//! tool gateway's HTTP client.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised while starting or stopping the bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// `start` was called while the bridge is already running.
    #[error("bridge is already running")]
    AlreadyRunning,

    /// `stop` was called while the bridge is not running.
    #[error("bridge is not running")]
    NotRunning,

    /// The host has no open design/document to operate on.
    #[error("no active design is open in the host")]
    NoActiveDesign,

    /// The host was lost (its thread panicked during an earlier run).
    #[error("host is unavailable")]
    HostUnavailable,

    /// The HTTP listener could not be bound.
    #[error("failed to bind command receiver on {addr}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A bridge thread could not be spawned.
    #[error("failed to spawn {thread} thread")]
    Spawn {
        /// Which thread failed to start.
        thread: &'static str,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The host thread terminated abnormally; the host is gone.
    #[error("host thread panicked")]
    HostThreadPanicked,
}

/// Errors raised by the tool gateway's HTTP client.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The gateway settings are inconsistent.
    #[error("invalid gateway configuration")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    Client(#[source] reqwest::Error),

    /// The request could not be delivered after all attempts.
    #[error("request to {url} failed after {attempts} attempt(s)")]
    Transport {
        /// Target URL.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// The last transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not valid JSON after all attempts.
    #[error("response from {url} was not valid JSON after {attempts} attempt(s): {message}")]
    Decode {
        /// Target URL.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// Decoder message.
        message: String,
    },

    /// The receiver answered with an error status and a non-JSON body.
    #[error("{url} answered HTTP {status}: {body}")]
    Status {
        /// Target URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "invalid setting".to_string(),
        };
        assert!(error.to_string().contains("invalid setting"));
    }

    #[test]
    fn bind_error_keeps_source() {
        use std::error::Error as _;

        let error = BridgeError::Bind {
            addr: "127.0.0.1:5000".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        };
        assert!(error.to_string().contains("127.0.0.1:5000"));
        assert!(error.source().is_some());
    }

    #[test]
    fn status_error_display() {
        let error = GatewayError::Status {
            url: "http://localhost:5000/Box".to_string(),
            status: 500,
            body: "boom".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("boom"));
    }
}
