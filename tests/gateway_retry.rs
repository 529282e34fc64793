//! Retry and error classification of the gateway's receiver client.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map};

use cad_bridge_mcp::config::GatewayConfig;
use cad_bridge_mcp::error::GatewayError;
use cad_bridge_mcp::gateway::BridgeClient;
use cad_bridge_mcp::ops;

#[derive(Default)]
struct Seen {
    hits: AtomicUsize,
    query: Mutex<Option<String>>,
}

type Shared = Arc<Seen>;

async fn serve_fake(seen: Shared) -> SocketAddr {
    let app = Router::new()
        .route(
            "/list_bodies",
            post(|State(seen): State<Shared>, RawQuery(query): RawQuery| async move {
                seen.hits.fetch_add(1, Ordering::SeqCst);
                *seen.query.lock().unwrap() = query;
                Json(json!({"success": true, "count": 0, "bodies": []}))
            }),
        )
        .route(
            "/Box",
            post(|State(seen): State<Shared>| async move {
                seen.hits.fetch_add(1, Ordering::SeqCst);
                "<html>not json</html>"
            }),
        )
        .route(
            "/Export_STL",
            post(|State(seen): State<Shared>| async move {
                seen.hits.fetch_add(1, Ordering::SeqCst);
                (StatusCode::INTERNAL_SERVER_ERROR, "Invalid request body: boom")
            }),
        )
        .route(
            "/draw_cylinder",
            post(|State(seen): State<Shared>| async move {
                seen.hits.fetch_add(1, Ordering::SeqCst);
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"success": false, "error": "Missing required field 'radius'"})),
                )
                    .into_response()
            }),
        )
        .route(
            "/draw_box",
            get(|| async { Json(json!({"success": true, "volume": 125.0})) }),
        )
        .with_state(seen);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
}

fn client(base_url: String, max_retries: u32) -> BridgeClient {
    BridgeClient::new(&GatewayConfig {
        base_url,
        max_retries,
        retry_delay_ms: 10,
        result_wait_ms: 1234,
        ..GatewayConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn query_tools_ask_the_receiver_to_wait() {
    let seen = Shared::default();
    let addr = serve_fake(Arc::clone(&seen)).await;
    let client = client(format!("http://{addr}/"), 3);

    let result = client
        .post(ops::by_name("list_bodies").unwrap(), &Map::new())
        .await
        .unwrap();
    assert_eq!(result["count"], 0);
    assert_eq!(seen.hits.load(Ordering::SeqCst), 1);
    assert_eq!(seen.query.lock().unwrap().as_deref(), Some("wait_ms=1234"));
}

#[tokio::test]
async fn undecodable_success_is_retried_then_reported() {
    let seen = Shared::default();
    let addr = serve_fake(Arc::clone(&seen)).await;
    let client = client(format!("http://{addr}"), 3);

    let err = client
        .post(ops::by_tool("draw_box").unwrap(), &Map::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Decode { attempts: 3, .. }));
    assert_eq!(seen.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn plain_text_error_status_is_not_retried() {
    let seen = Shared::default();
    let addr = serve_fake(Arc::clone(&seen)).await;
    let client = client(format!("http://{addr}"), 3);

    let err = client
        .post(ops::by_tool("export_stl").unwrap(), &Map::new())
        .await
        .unwrap_err();
    match err {
        GatewayError::Status { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "Invalid request body: boom");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(seen.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn json_error_body_is_returned_as_is() {
    let seen = Shared::default();
    let addr = serve_fake(Arc::clone(&seen)).await;
    let client = client(format!("http://{addr}"), 3);

    let result = client
        .post(ops::by_name("draw_cylinder").unwrap(), &Map::new())
        .await
        .unwrap();
    assert_eq!(result["success"], false);
    assert_eq!(seen.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn get_reads_stored_results() {
    let addr = serve_fake(Shared::default()).await;
    let client = client(format!("http://{addr}"), 1);
    let result = client.get("/draw_box").await.unwrap();
    assert_eq!(result, json!({"success": true, "volume": 125.0}));
}

#[tokio::test]
async fn unreachable_receiver_exhausts_attempts() {
    // Bind and release a port so nothing listens on it.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = client(format!("http://127.0.0.1:{port}"), 2);

    let err = client.get("/count_parameters").await.unwrap_err();
    match &err {
        GatewayError::Transport { url, attempts, .. } => {
            assert_eq!(*attempts, 2);
            assert!(url.ends_with("/count_parameters"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("after 2 attempt(s)"));
}
