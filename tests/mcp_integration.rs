//! Integration tests for the MCP gateway.
//!
//! The first group checks JSON-RPC message parsing. The second drives a full
//! session over an in-memory transport against a live command receiver.

use std::time::Duration;

use serde_json::{json, Value};

use cad_bridge_mcp::bridge::{Bridge, BridgeOptions};
use cad_bridge_mcp::config::GatewayConfig;
use cad_bridge_mcp::gateway::BridgeClient;
use cad_bridge_mcp::host::SimulatedHost;
use cad_bridge_mcp::mcp::protocol::{parse_message, ErrorCode, IncomingMessage, RequestId};
use cad_bridge_mcp::mcp::{LineTransport, McpServer, ServerState};

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_tools_call_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": "call-7",
        "method": "tools/call",
        "params": {"name": "draw_box", "arguments": {"width": 2}}
    }"#;

    let IncomingMessage::Request(req) = parse_message(json).unwrap() else {
        panic!("Expected Request");
    };
    assert_eq!(req.method, "tools/call");
    assert_eq!(req.id, RequestId::String("call-7".into()));
    assert_eq!(req.params.unwrap()["arguments"]["width"], 2);
}

#[test]
fn test_parse_notification() {
    let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
    let message = parse_message(json).unwrap();
    assert!(matches!(message, IncomingMessage::Notification(_)));
    assert_eq!(message.method(), "notifications/initialized");
}

#[test]
fn test_parse_rejects_wrong_version() {
    let json = r#"{"jsonrpc": "1.0", "id": 1, "method": "ping"}"#;
    let err = parse_message(json).unwrap_err();
    assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
}

#[test]
fn test_parse_garbage() {
    let err = parse_message("not json at all").unwrap_err();
    assert_eq!(err.error.code, ErrorCode::ParseError.code());
    assert!(err.id.is_none());
}

// =============================================================================
// Live Session Tests
// =============================================================================

fn handshake() -> Vec<Value> {
    vec![
        json!({"jsonrpc": "2.0", "id": 0, "method": "initialize", "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {"name": "integration", "version": "0"}
        }}),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
    ]
}

fn call(id: u64, tool: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": tool, "arguments": arguments}
    })
}

/// Runs the given lines through a gateway wired to `base_url`.
async fn session(base_url: String, lines: Vec<Value>) -> (ServerState, Vec<Value>) {
    let client = BridgeClient::new(&GatewayConfig {
        base_url,
        result_wait_ms: 5_000,
        ..GatewayConfig::default()
    })
    .unwrap();
    let input: String = lines.iter().map(|l| format!("{l}\n")).collect();
    let mut server = McpServer::new(LineTransport::new(input.as_bytes(), Vec::new()), client);
    server.run_to_eof().await.unwrap();
    let state = server.state();
    let out = String::from_utf8(server.into_transport().into_writer()).unwrap();
    let replies = out
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    (state, replies)
}

/// The JSON payload carried in a tool reply's text content.
fn payload(reply: &Value) -> Value {
    let text = reply["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn tool_calls_reach_the_simulated_host() {
    let mut bridge = Bridge::new(
        Box::new(SimulatedHost::new()),
        BridgeOptions {
            bind: "127.0.0.1:0".into(),
            tick_interval: Duration::from_millis(10),
        },
    );
    let addr = bridge.start().await.unwrap();

    let mut lines = handshake();
    lines.push(call(1, "test_connection", json!({})));
    lines.push(call(2, "draw_box", json!({"width": 2, "height": 2, "depth": 2})));
    lines.push(call(3, "list_bodies", json!({})));
    lines.push(call(4, "get_result", json!({"operation": "draw_box"})));
    lines.push(call(5, "draw_cylinder", json!({"height": 3})));
    lines.push(call(6, "count_parameters", json!({})));

    let (state, replies) = session(format!("http://{addr}"), lines).await;
    assert_eq!(state, ServerState::ShuttingDown);
    assert_eq!(replies.len(), 7);

    assert_eq!(payload(&replies[1]), json!({"message": "Connection successful"}));

    let ack = payload(&replies[2]);
    assert_eq!(ack["message"], "Box requested");
    assert!(ack["request_id"].is_string());

    // Queries wait for their own result, which runs after the queued box.
    let bodies = payload(&replies[3]);
    assert_eq!(bodies["success"], true);
    assert_eq!(bodies["count"], 1);
    assert!((bodies["bodies"][0]["volume"].as_f64().unwrap() - 8.0).abs() < 1e-9);

    assert_eq!(payload(&replies[4])["success"], true);

    // Rejected by the gateway before any HTTP request.
    assert_eq!(replies[5]["result"]["isError"], true);
    assert_eq!(
        replies[5]["result"]["content"][0]["text"],
        "Missing required field 'radius'"
    );

    assert!(payload(&replies[6])["user_parameter_count"].is_u64());

    let report = bridge.stop().await.unwrap();
    assert_eq!(report.discarded, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_operation_is_flagged_as_tool_error() {
    let mut bridge = Bridge::new(
        Box::new(SimulatedHost::new()),
        BridgeOptions {
            bind: "127.0.0.1:0".into(),
            tick_interval: Duration::from_millis(10),
        },
    );
    let addr = bridge.start().await.unwrap();

    let mut lines = handshake();
    lines.push(call(1, "list_faces", json!({"body_id": 4})));
    let (_, replies) = session(format!("http://{addr}"), lines).await;

    let reply = &replies[1]["result"];
    assert_eq!(reply["isError"], true);
    let body = payload(&replies[1]);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    bridge.stop().await.unwrap();
}
