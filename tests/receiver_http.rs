//! End-to-end tests of the command receiver over real HTTP.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};

use cad_bridge_mcp::bridge::{Bridge, BridgeOptions};
use cad_bridge_mcp::error::BridgeError;
use cad_bridge_mcp::host::{CadHost, SimulatedHost};

fn options(tick_ms: u64) -> BridgeOptions {
    BridgeOptions {
        bind: "127.0.0.1:0".into(),
        tick_interval: Duration::from_millis(tick_ms),
    }
}

async fn started(tick_ms: u64) -> (Bridge, String) {
    let mut bridge = Bridge::new(Box::new(SimulatedHost::new()), options(tick_ms));
    let addr = bridge.start().await.unwrap();
    (bridge, format!("http://{addr}"))
}

/// Polls `GET path` until the stored result reports success.
async fn poll(client: &reqwest::Client, url: &str) -> Value {
    for _ in 0..200 {
        let body: Value = client.get(url).send().await.unwrap().json().await.unwrap();
        if body["success"] == true {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("no successful result at {url}");
}

#[tokio::test(flavor = "multi_thread")]
async fn post_acknowledges_then_result_can_be_polled() {
    let (mut bridge, base) = started(10).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/Box"))
        .json(&json!({"width": 2, "height": 3, "depth": 4}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let ack: Value = resp.json().await.unwrap();
    assert_eq!(ack["message"], "Box requested");
    assert!(ack["request_id"].as_str().is_some_and(|id| id.len() == 36));
    assert!(ack.get("note").is_none());

    let result = poll(&client, &format!("{base}/draw_box")).await;
    assert_eq!(result["success"], true);

    bridge.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn wait_ms_returns_the_commands_own_result() {
    let (mut bridge, base) = started(10).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{base}/sphere"))
        .json(&json!({"radius": 1}))
        .send()
        .await
        .unwrap();
    let resp = client
        .post(format!("{base}/list_bodies?wait_ms=5000"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 1);
    assert!(body["request_id"].is_string());

    bridge.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn wait_ms_timeout_answers_accepted() {
    // The pump never ticks during the test.
    let (mut bridge, base) = started(60_000).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/Box?wait_ms=50"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: Value = resp.json().await.unwrap();
    assert!(body["request_id"].is_string());
    assert!(body["note"].as_str().unwrap().contains("GET /draw_box"));
    assert_eq!(bridge.context().correlator.pending(), 0);

    let report = bridge.stop().await.unwrap();
    assert_eq!(report.discarded, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn get_before_any_post_is_no_data() {
    let (mut bridge, base) = started(10).await;
    let body: Value = reqwest::get(format!("{base}/list_faces"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "No data available. Call POST /list_faces first."
    );
    bridge.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn request_errors_are_reported_without_queueing() {
    let (mut bridge, base) = started(10).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/draw_cylinder"))
        .json(&json!({"height": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Missing required field 'radius'");

    let resp = client
        .post(format!("{base}/Box"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(resp.text().await.unwrap().starts_with("Invalid request body"));

    let resp = client
        .post(format!("{base}/no_such_tool"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"success": false, "error": "Not Found", "path": "/no_such_tool"}));

    let report = bridge.stop().await.unwrap();
    assert_eq!(report.discarded, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connection_answers_inline() {
    // No tick ever runs, so the answer cannot come from the pump.
    let (mut bridge, base) = started(60_000).await;
    let resp = reqwest::Client::new()
        .post(format!("{base}/test_connection"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"message": "Connection successful"}));
    assert!(bridge.context().queue.is_empty());
    bridge.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn parameter_snapshot_follows_the_model() {
    let (mut bridge, base) = started(10).await;
    let client = reqwest::Client::new();

    let count: Value = client
        .get(format!("{base}/count_parameters"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(count, json!({"user_parameter_count": 0}));

    client
        .post(format!("{base}/Box?wait_ms=5000"))
        .send()
        .await
        .unwrap();

    // The snapshot is refreshed at the start of the next tick.
    let mut listed = Value::Null;
    for _ in 0..200 {
        listed = client
            .get(format!("{base}/list_parameters"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if listed["ModelParameter"].as_array().is_some_and(|p| !p.is_empty()) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let entry = &listed["ModelParameter"][0];
    assert!(entry["Name"].is_string());
    assert!(entry["Expression"].is_string());

    bridge.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_discards_queue_and_cancels_waiters() {
    let (mut bridge, base) = started(60_000).await;
    let ctx = bridge.context();
    let client = reqwest::Client::new();

    for _ in 0..2 {
        client.post(format!("{base}/Box")).send().await.unwrap();
    }
    let waiting = tokio::spawn({
        let client = client.clone();
        let url = format!("{base}/list_bodies?wait_ms=30000");
        async move { client.post(url).send().await.unwrap() }
    });
    while ctx.correlator.pending() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let report = bridge.stop().await.unwrap();
    assert_eq!(report.discarded, 3);
    assert_eq!(report.cancelled, 1);

    let resp = waiting.await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Command discarded"));
    assert!(!bridge.is_running());

    // Discarded commands never reached the host.
    assert!(bridge.host().unwrap().bodies().is_empty());

    let addr = bridge.start().await.unwrap();
    assert!(ctx.queue.is_empty());
    assert_eq!(ctx.correlator.pending(), 0);
    let body: Value = reqwest::get(format!("http://{addr}/draw_box"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["error"], "No data available. Call POST /draw_box first.");
    let report = bridge.stop().await.unwrap();
    assert_eq!(report.discarded, 0);
    assert!(bridge.host().unwrap().bodies().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_get_path_is_json_not_found() {
    let (mut bridge, base) = started(10).await;
    let resp = reqwest::get(format!("{base}/not_a_real_endpoint"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({"success": false, "error": "Not Found", "path": "/not_a_real_endpoint"})
    );
    bridge.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn polling_does_not_change_the_stored_result() {
    let (mut bridge, base) = started(10).await;
    let client = reqwest::Client::new();
    client
        .post(format!("{base}/Box?wait_ms=5000"))
        .json(&json!({"width": 2}))
        .send()
        .await
        .unwrap();

    let url = format!("{base}/draw_box");
    let first = client.get(&url).send().await.unwrap().text().await.unwrap();
    let second = client.get(&url).send().await.unwrap().text().await.unwrap();
    assert_eq!(first, second);
    assert!(first.contains("\"success\":true"));
    assert!(bridge.context().queue.is_empty());

    bridge.stop().await.unwrap();
    assert_eq!(bridge.host().unwrap().bodies().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn safe_pocket_round_trip() {
    let (mut bridge, base) = started(10).await;
    let client = reqwest::Client::new();

    client
        .post(format!("{base}/Box?wait_ms=5000"))
        .send()
        .await
        .unwrap();
    // Sketch 1 sits on the block's top cap.
    client
        .post(format!("{base}/create_circle?wait_ms=5000"))
        .json(&json!({"radius": 1, "z": 5}))
        .send()
        .await
        .unwrap();

    let resp = client
        .post(format!("{base}/pocket_recess_safe"))
        .json(&json!({"body_id": 0, "sketch_id": 1, "depth": 0.5}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let ack: Value = resp.json().await.unwrap();
    assert_eq!(ack["message"], "Safe pocket requested");

    let result = poll(&client, &format!("{base}/pocket_recess_safe")).await;
    assert!(result["volume_removed"].as_f64().unwrap() > 0.0);
    assert_eq!(result["sketch_id"], 1);

    // Sketch 2 lies far outside the block.
    client
        .post(format!("{base}/create_circle?wait_ms=5000"))
        .json(&json!({"radius": 1, "x": 100, "z": 5}))
        .send()
        .await
        .unwrap();
    let missed: Value = client
        .post(format!("{base}/pocket_recess_safe?wait_ms=5000"))
        .json(&json!({"body_id": 0, "sketch_id": 2}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(missed["success"], false);
    assert!(missed["error"].as_str().unwrap().contains("intersect"));

    bridge.stop().await.unwrap();
    assert_eq!(bridge.host().unwrap().bodies().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn bridge_restarts_with_a_fresh_queue() {
    let (mut bridge, base) = started(10).await;
    reqwest::Client::new()
        .post(format!("{base}/Box?wait_ms=5000"))
        .send()
        .await
        .unwrap();
    bridge.stop().await.unwrap();
    assert_eq!(bridge.host().unwrap().bodies().len(), 1);

    let addr = bridge.start().await.unwrap();
    let body: Value = reqwest::Client::new()
        .post(format!("http://{addr}/list_bodies?wait_ms=5000"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["count"], 1);
    bridge.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn start_requires_an_open_design() {
    let mut bridge = Bridge::new(Box::new(SimulatedHost::without_design()), options(10));
    assert!(matches!(
        bridge.start().await,
        Err(BridgeError::NoActiveDesign)
    ));
    assert!(!bridge.is_running());
    assert!(bridge.host().is_some());
}
