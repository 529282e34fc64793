//! Model Context Protocol gateway.
//!
//! Exposes every receiver operation as an MCP tool over stdio. The server
//! itself is stateless apart from the handshake: tool calls are forwarded to
//! the command receiver over HTTP.
//!
//! ```text
//!  agent ──stdio──▶ transport ──▶ server ──▶ tools / prompts
//!                                   │
//!                                   ▼
//!                           BridgeClient ──HTTP──▶ receiver
//! ```
//!
//! Targets MCP protocol version 2024-11-05.

pub mod prompts;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::{McpServer, ServerState};
pub use transport::{LineTransport, StdioTransport};
