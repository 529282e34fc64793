//! cad-bridge-mcp: drive a desktop CAD application's modelling API from an
//! LLM agent.
//!
//! The host API may only be touched from its own thread. HTTP requests are
//! therefore never executed directly: they are validated, queued, and run by
//! a periodic pump on the host thread, with results stored for polling or
//! handed back to a waiting request.
//!
//! ```text
//!  agent ─MCP─▶ gateway ─HTTP─▶ receiver ─▶ queue ─▶ pump (host thread) ─▶ CadHost
//!                                  ▲                         │
//!                                  └──── results / waiters ◀─┘
//! ```
//!
//! # Modules
//!
//! - [`config`]: configuration loading and validation
//! - [`error`]: cross-component error types
//! - [`host`]: the [`host::CadHost`] contract and a simulated host
//! - [`ops`]: the operation catalogue shared by receiver and gateway
//! - [`bridge`]: queue, pump, result store, correlation and lifecycle
//! - [`handlers`]: one handler per queued operation
//! - [`receiver`]: the HTTP ingress
//! - [`gateway`]: HTTP client used by the MCP server
//! - [`mcp`]: MCP protocol, transport, tools and prompts

pub mod bridge;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod host;
pub mod mcp;
pub mod ops;
pub mod receiver;
