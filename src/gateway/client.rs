//! HTTP client for the command receiver.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::ops::{Operation, OperationKind};

/// Why a single attempt failed.
enum Failure {
    Transport(reqwest::Error),
    Decode(String),
    /// Error status with a body that is not JSON. Not retried.
    Status(StatusCode, String),
}

/// Talks to the receiver with a bounded retry loop.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    http: Client,
    base_url: String,
    attempts: u32,
    retry_delay: Duration,
    result_wait_ms: u64,
}

impl BridgeClient {
    /// Creates a client from the gateway configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if the result wait does not fit inside
    /// the request timeout, and [`GatewayError::Client`] if the HTTP backend
    /// cannot be initialised.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(GatewayError::Client)?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            attempts: config.max_retries.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            result_wait_ms: config.result_wait_ms,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POSTs an operation. Query operations ask the receiver to hold the
    /// response until their result is ready.
    ///
    /// # Errors
    ///
    /// See [`GatewayError`].
    pub async fn post(
        &self,
        op: &Operation,
        body: &Map<String, Value>,
    ) -> Result<Value, GatewayError> {
        let url = match op.kind {
            OperationKind::Query => {
                format!("{}{}?wait_ms={}", self.base_url, op.path, self.result_wait_ms)
            }
            OperationKind::Action | OperationKind::Inline => {
                format!("{}{}", self.base_url, op.path)
            }
        };
        self.send(&url, || self.http.post(&url).json(body)).await
    }

    /// GETs a receiver path such as `/list_parameters` or `/draw_box`.
    ///
    /// # Errors
    ///
    /// See [`GatewayError`].
    pub async fn get(&self, path: &str) -> Result<Value, GatewayError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        self.send(&url, || self.http.get(&url)).await
    }

    async fn send<F>(&self, url: &str, build: F) -> Result<Value, GatewayError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 1;
        loop {
            debug!(url, attempt, "sending request");
            let failure = match Self::attempt(build()).await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            match failure {
                Failure::Status(status, body) => {
                    return Err(GatewayError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                        body,
                    })
                }
                Failure::Transport(source) if attempt >= self.attempts => {
                    return Err(GatewayError::Transport {
                        url: url.to_string(),
                        attempts: attempt,
                        source,
                    })
                }
                Failure::Decode(message) if attempt >= self.attempts => {
                    return Err(GatewayError::Decode {
                        url: url.to_string(),
                        attempts: attempt,
                        message,
                    })
                }
                Failure::Transport(e) => {
                    warn!(url, attempt, error = %e, "request failed, retrying");
                }
                Failure::Decode(message) => {
                    warn!(url, attempt, error = %message, "undecodable response, retrying");
                }
            }

            tokio::time::sleep(self.retry_delay).await;
            attempt += 1;
        }
    }

    async fn attempt(request: RequestBuilder) -> Result<Value, Failure> {
        let response = request.send().await.map_err(Failure::Transport)?;
        let status = response.status();
        let text = response.text().await.map_err(Failure::Transport)?;
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => Ok(value),
            Err(e) if status.is_success() => Err(Failure::Decode(e.to_string())),
            Err(_) => Err(Failure::Status(status, text)),
        }
    }
}
