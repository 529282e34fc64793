//! MCP server lifecycle and request routing.
//!
//! 1. `initialize` negotiates the protocol version and hands the client the
//!    modelling instructions.
//! 2. `notifications/initialized` moves the server to running.
//! 3. `tools/*` and `prompts/*` are served until stdin closes or a shutdown
//!    signal arrives.
//!
//! Tool calls never touch a CAD host directly: each one becomes a request to
//! the command receiver through [`BridgeClient`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::gateway::BridgeClient;
use crate::mcp::prompts;
use crate::mcp::protocol::{
    parse_message, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, Reply, RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::tools::{self, ToolCallResult, ToolTarget};
use crate::mcp::transport::{LineTransport, StdioTransport};
use crate::ops::{self, OperationKind};

/// Text returned as `instructions` from `initialize`.
pub const INSTRUCTIONS: &str = "\
You drive a parametric CAD application through tools. Each tool queues one modelling step; \
steps run in order on the application's main thread.

Units: 1 unit = 1 cm = 10 mm. Divide millimetre values by 10 (31.8 mm -> 3.18).

Planes and coordinates:
- XY: x and y position the sketch, z is its height.
- XZ: x and z position the sketch, y is its distance.
- YZ: y and z position the sketch, x is its distance.
draw_box and draw_cylinder take the centre of their base.

Workflow:
- Start new models with delete_all.
- Sketch tools add a new sketch; extrude, revolve, cut_extrude and friends consume the latest sketch.
- Sweep needs a profile sketch followed by a spline path starting at the profile.
- Loft uses the last sketchcount sketches.
- Use list_bodies, list_faces and find_face instead of guessing face indices.
- Wrap multi-step edits in begin_transaction / commit_transaction; rollback_transaction undoes them.
- Action tools answer with an acknowledgement; use get_result to read their outcome. \
Query tools (list_bodies, find_face, ...) return their result directly.";

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    AwaitingInit,
    Initialising,
    Running,
    ShuttingDown,
}

#[derive(Debug, Clone, Serialize)]
struct ServerInfo {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    protocol_version: String,
    #[serde(default)]
    client_info: Option<ClientInfo>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClientInfo {
    name: String,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Clone, Deserialize)]
struct PromptGetParams {
    name: String,
}

/// The gateway's MCP server.
pub struct McpServer<R, W> {
    state: ServerState,
    transport: LineTransport<R, W>,
    client: BridgeClient,
    protocol_version: Option<String>,
}

impl McpServer<tokio::io::BufReader<tokio::io::Stdin>, tokio::io::Stdout> {
    /// A server speaking over stdin/stdout.
    #[must_use]
    pub fn stdio(client: BridgeClient) -> Self {
        Self::new(StdioTransport::stdio(), client)
    }
}

impl<R, W> McpServer<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    #[must_use]
    pub const fn new(transport: LineTransport<R, W>, client: BridgeClient) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            transport,
            client,
            protocol_version: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Version agreed during `initialize`, if it has happened.
    #[must_use]
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Consumes the server and returns its transport.
    pub fn into_transport(self) -> LineTransport<R, W> {
        self.transport
    }

    /// Serves until end of input or a shutdown signal.
    ///
    /// # Errors
    ///
    /// Returns transport I/O failures.
    #[cfg(unix)]
    pub async fn run(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    info!("received SIGINT, shutting down");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, shutting down");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }
                line = self.transport.read_line() => {
                    if self.step(line?).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Serves until end of input or Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns transport I/O failures.
    #[cfg(windows)]
    pub async fn run(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("received Ctrl+C, shutting down");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }
                line = self.transport.read_line() => {
                    if self.step(line?).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Serves until end of input, ignoring signals.
    ///
    /// # Errors
    ///
    /// Returns transport I/O failures.
    pub async fn run_to_eof(&mut self) -> std::io::Result<()> {
        loop {
            let line = self.transport.read_line().await?;
            if self.step(line).await? {
                return Ok(());
            }
        }
    }

    /// Handles one read. Returns `true` when the server should stop.
    async fn step(&mut self, line: Option<String>) -> std::io::Result<bool> {
        let Some(line) = line else {
            debug!("input closed");
            self.state = ServerState::ShuttingDown;
            return Ok(true);
        };
        if line.trim().is_empty() {
            return Ok(false);
        }

        match parse_message(&line) {
            Ok(IncomingMessage::Request(req)) => {
                let reply = self.handle_request(&req).await;
                self.transport.send(&reply).await?;
            }
            Ok(IncomingMessage::Notification(n)) => self.handle_notification(&n),
            Err(error) => self.transport.send(&error).await?,
        }
        Ok(self.state == ServerState::ShuttingDown)
    }

    async fn handle_request(&mut self, req: &JsonRpcRequest) -> Reply {
        debug!(id = %req.id, method = %req.method, "request");
        match req.method.as_str() {
            "initialize" => self.handle_initialize(req).into(),
            "ping" => JsonRpcResponse::success(req.id.clone(), json!({})).into(),
            "tools/list" => self.handle_tools_list(req).into(),
            "tools/call" => self.handle_tools_call(req).await.into(),
            "prompts/list" => self.handle_prompts_list(req).into(),
            "prompts/get" => self.handle_prompts_get(req).into(),
            other => JsonRpcError::method_not_found(req.id.clone(), other).into(),
        }
    }

    fn handle_notification(&mut self, notification: &JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" if self.state == ServerState::Initialising => {
                info!("client initialised");
                self.state = ServerState::Running;
            }
            "notifications/cancelled" => {
                debug!("cancellation ignored, tool calls are not interruptible");
            }
            other => debug!(method = other, "notification ignored"),
        }
    }

    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::invalid_request(
                Some(req.id.clone()),
                "Server already initialised",
            ));
        }
        let params: InitializeParams = req.params_as()?;
        if params.protocol_version != MCP_PROTOCOL_VERSION {
            warn!(
                requested = %params.protocol_version,
                offered = MCP_PROTOCOL_VERSION,
                "client asked for a different protocol version"
            );
        }
        if let Some(client) = &params.client_info {
            info!(
                client = %client.name,
                version = client.version.as_deref().unwrap_or("unknown"),
                receiver = self.client.base_url(),
                "initialising"
            );
        }

        self.protocol_version = Some(MCP_PROTOCOL_VERSION.to_string());
        self.state = ServerState::Initialising;

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {},
                    "prompts": {},
                },
                "serverInfo": ServerInfo {
                    name: SERVER_NAME,
                    version: env!("CARGO_PKG_VERSION"),
                },
                "instructions": INSTRUCTIONS,
            }),
        ))
    }

    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state == ServerState::Running {
            Ok(())
        } else {
            Err(JsonRpcError::invalid_request(
                Some(id.clone()),
                "Server not initialised",
            ))
        }
    }

    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;
        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "tools": tools::definitions() }),
        ))
    }

    async fn handle_tools_call(
        &self,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;
        let params: ToolCallParams = req.params_as()?;
        let result = self.call_tool(&params.name, params.arguments).await;
        let value = serde_json::to_value(&result)
            .map_err(|e| JsonRpcError::internal_error(req.id.clone(), e.to_string()))?;
        Ok(JsonRpcResponse::success(req.id.clone(), value))
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallResult {
        let Some(target) = ToolTarget::resolve(name) else {
            return ToolCallResult::error(format!("Unknown tool: {name}"));
        };
        let arguments = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            _ => return ToolCallResult::error("Tool arguments must be a JSON object"),
        };
        debug!(tool = name, "calling tool");

        let reply = match target {
            ToolTarget::Operation(op) => {
                // Reject bad arguments here rather than after a round trip.
                if let Err(e) = op.build_args(&arguments) {
                    return ToolCallResult::error(e.to_string());
                }
                self.client.post(op, &arguments).await
            }
            ToolTarget::CountParameters => self.client.get("/count_parameters").await,
            ToolTarget::ListParameters => self.client.get("/list_parameters").await,
            ToolTarget::GetResult => {
                let Some(operation) = arguments.get("operation").and_then(Value::as_str) else {
                    return ToolCallResult::error("Missing required field 'operation'");
                };
                match ops::by_name(operation) {
                    Some(op) if op.kind != OperationKind::Inline => {
                        self.client.get(&format!("/{}", op.name)).await
                    }
                    _ => {
                        return ToolCallResult::error(format!(
                            "Unknown operation '{operation}'"
                        ))
                    }
                }
            }
        };

        match reply {
            Ok(value) => ToolCallResult::from_reply(&value),
            Err(e) => {
                warn!(tool = name, error = %e, "receiver request failed");
                ToolCallResult::error(describe(&e))
            }
        }
    }

    fn handle_prompts_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;
        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "prompts": prompts::all() }),
        ))
    }

    fn handle_prompts_get(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;
        let params: PromptGetParams = req.params_as()?;
        let prompt = prompts::by_name(&params.name).ok_or_else(|| {
            JsonRpcError::invalid_params(req.id.clone(), format!("Unknown prompt: {}", params.name))
        })?;
        Ok(JsonRpcResponse::success(req.id.clone(), prompt.render()))
    }
}

/// The error and its causes on one line.
fn describe(error: &GatewayError) -> String {
    let mut text = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;

    fn offline_client() -> BridgeClient {
        BridgeClient::new(&GatewayConfig {
            base_url: "http://127.0.0.1:9".into(),
            request_timeout_secs: 1,
            max_retries: 1,
            retry_delay_ms: 0,
            result_wait_ms: 0,
        })
        .unwrap()
    }

    async fn session(lines: &[Value]) -> (ServerState, Vec<Value>) {
        let input: String = lines.iter().map(|l| format!("{l}\n")).collect();
        let transport = LineTransport::new(input.as_bytes(), Vec::new());
        let mut server = McpServer::new(transport, offline_client());
        server.run_to_eof().await.unwrap();
        let state = server.state();
        let out = String::from_utf8(server.into_transport().into_writer()).unwrap();
        let replies = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (state, replies)
    }

    fn handshake() -> Vec<Value> {
        vec![
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "test", "version": "0"}
            }}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
        ]
    }

    #[tokio::test]
    async fn initialize_carries_instructions() {
        let (state, replies) = session(&handshake()).await;
        assert_eq!(state, ServerState::ShuttingDown);
        assert_eq!(replies.len(), 1);
        let result = &replies[0]["result"];
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert!(result["instructions"].as_str().unwrap().contains("1 unit = 1 cm"));
    }

    #[tokio::test]
    async fn tools_require_initialisation() {
        let (_, replies) = session(&[json!({"jsonrpc": "2.0", "id": 5, "method": "tools/list"})]).await;
        assert_eq!(replies[0]["error"]["code"], -32600);
        assert_eq!(replies[0]["id"], 5);
    }

    #[tokio::test]
    async fn lists_tools_and_prompts() {
        let mut lines = handshake();
        lines.push(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}));
        lines.push(json!({"jsonrpc": "2.0", "id": 3, "method": "prompts/list"}));
        lines.push(json!({"jsonrpc": "2.0", "id": 4, "method": "prompts/get", "params": {"name": "flange"}}));
        lines.push(json!({"jsonrpc": "2.0", "id": 5, "method": "prompts/get", "params": {"name": "teapot"}}));
        let (_, replies) = session(&lines).await;

        let tools = replies[1]["result"]["tools"].as_array().unwrap();
        assert!(tools.iter().any(|t| t["name"] == "draw_box"));
        assert!(tools.iter().any(|t| t["name"] == "get_result"));

        let prompts = replies[2]["result"]["prompts"].as_array().unwrap();
        assert_eq!(prompts.len(), prompts::all().len());
        assert!(prompts[0].get("text").is_none());

        assert_eq!(replies[3]["result"]["messages"][0]["role"], "user");
        assert_eq!(replies[4]["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn bad_tool_calls_fail_without_network() {
        let mut lines = handshake();
        lines.push(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
            "params": {"name": "no_such_tool"}}));
        lines.push(json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
            "params": {"name": "change_parameter", "arguments": {"name": "d1"}}}));
        lines.push(json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call",
            "params": {"name": "get_result", "arguments": {"operation": "test_connection"}}}));
        lines.push(json!({"jsonrpc": "2.0", "id": 5, "method": "unknown/method"}));
        let (_, replies) = session(&lines).await;

        assert_eq!(replies[1]["result"]["isError"], true);
        assert!(replies[1]["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("no_such_tool"));
        assert_eq!(
            replies[2]["result"]["content"][0]["text"],
            "Missing required field 'value'"
        );
        assert_eq!(replies[3]["result"]["isError"], true);
        assert_eq!(replies[4]["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn unreachable_receiver_is_a_tool_error() {
        let mut lines = handshake();
        lines.push(json!({"jsonrpc": "2.0", "id": 2, "method": "tools/call",
            "params": {"name": "undo", "arguments": {}}}));
        let (_, replies) = session(&lines).await;
        assert_eq!(replies[1]["result"]["isError"], true);
        assert!(replies[1]["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("failed after 1 attempt"));
    }

    #[tokio::test]
    async fn parse_errors_are_answered() {
        let transport = LineTransport::new(&b"{oops\n"[..], Vec::new());
        let mut server = McpServer::new(transport, offline_client());
        server.run_to_eof().await.unwrap();
        let out = String::from_utf8(server.into_transport().into_writer()).unwrap();
        let reply: Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(reply["error"]["code"], -32700);
    }
}
