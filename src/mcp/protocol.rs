//! JSON-RPC 2.0 framing for the MCP gateway.
//!
//! Requests carry an `id` and get exactly one [`Reply`]; notifications carry
//! none and are never answered. MCP forbids `null` ids, so an `id` that is
//! neither a string nor an integer makes the message an invalid request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version negotiated with every client.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "cad-bridge-mcp";

/// A request id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// An incoming request.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub id: RequestId,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Deserialises `params` into `T`, treating absent params as `{}`.
    ///
    /// # Errors
    ///
    /// Returns an invalid-params error naming the method.
    pub fn params_as<T>(&self) -> Result<T, JsonRpcError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let params = self
            .params
            .clone()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        serde_json::from_value(params).map_err(|e| {
            JsonRpcError::invalid_params(
                self.id.clone(),
                format!("Invalid {} params: {e}", self.method),
            )
        })
    }
}

/// An incoming notification.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// A parsed incoming line.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Request(req) => &req.method,
            Self::Notification(n) => &n.method,
        }
    }
}

/// Standard and server-defined error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
}

impl ErrorCode {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }

    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
        }
    }
}

/// The `error` member of an error reply.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A successful reply.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: RequestId,
    pub result: Value,
}

impl JsonRpcResponse {
    #[must_use]
    pub const fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result,
        }
    }
}

/// An error reply. The id is `null` when it could not be read.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    pub jsonrpc: &'static str,
    pub id: Option<RequestId>,
    pub error: ErrorObject,
}

impl JsonRpcError {
    #[must_use]
    pub fn new(id: Option<RequestId>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error: ErrorObject {
                code: code.code(),
                message: message.into(),
                data: None,
            },
        }
    }

    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(None, ErrorCode::ParseError, ErrorCode::ParseError.default_message())
    }

    #[must_use]
    pub fn invalid_request(id: Option<RequestId>, message: impl Into<String>) -> Self {
        Self::new(id, ErrorCode::InvalidRequest, message)
    }

    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(
            Some(id),
            ErrorCode::MethodNotFound,
            format!("Method not found: {method}"),
        )
    }

    #[must_use]
    pub fn invalid_params(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(Some(id), ErrorCode::InvalidParams, message)
    }

    #[must_use]
    pub fn internal_error(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(Some(id), ErrorCode::InternalError, message)
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.error.data = Some(data);
        self
    }
}

/// Anything the server writes back.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Success(JsonRpcResponse),
    Error(JsonRpcError),
}

impl From<JsonRpcResponse> for Reply {
    fn from(r: JsonRpcResponse) -> Self {
        Self::Success(r)
    }
}

impl From<JsonRpcError> for Reply {
    fn from(e: JsonRpcError) -> Self {
        Self::Error(e)
    }
}

impl From<Result<JsonRpcResponse, JsonRpcError>> for Reply {
    fn from(r: Result<JsonRpcResponse, JsonRpcError>) -> Self {
        r.map_or_else(Self::Error, Self::Success)
    }
}

/// Parses one transport line.
///
/// # Errors
///
/// Returns the error reply to send: a parse error for malformed JSON, an
/// invalid request for anything that is not a 2.0 request or notification.
pub fn parse_message(line: &str) -> Result<IncomingMessage, JsonRpcError> {
    let value: Value = serde_json::from_str(line).map_err(|_| JsonRpcError::parse_error())?;
    let Value::Object(obj) = &value else {
        return Err(JsonRpcError::invalid_request(None, "Message must be a JSON object"));
    };

    if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err(JsonRpcError::invalid_request(None, "jsonrpc must be \"2.0\""));
    }

    let id = match obj.get("id") {
        None => None,
        Some(raw) => Some(
            serde_json::from_value::<RequestId>(raw.clone())
                .map_err(|_| JsonRpcError::invalid_request(None, "id must be a string or integer"))?,
        ),
    };

    match obj.get("method").and_then(Value::as_str) {
        Some(m) if !m.is_empty() => {}
        _ => return Err(JsonRpcError::invalid_request(id, "method must be a non-empty string")),
    }

    if id.is_some() {
        serde_json::from_value(value)
            .map(IncomingMessage::Request)
            .map_err(|e| JsonRpcError::invalid_request(None, e.to_string()))
    } else {
        serde_json::from_value(value)
            .map(IncomingMessage::Notification)
            .map_err(|e| JsonRpcError::invalid_request(None, e.to_string()))
    }
}
