//! Tool gateway plumbing: the HTTP side of the MCP server.
//!
//! The gateway never talks to the CAD host. Each tool call becomes one POST
//! (or GET) against the command receiver, retried a fixed number of times on
//! transport failures and undecodable bodies.

pub mod client;

pub use client::BridgeClient;
