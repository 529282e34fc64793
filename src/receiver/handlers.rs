//! Request handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{OriginalUri, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::oneshot;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::ReceiverError;
use crate::bridge::{Args, BridgeContext, Command, ResultStore};
use crate::ops::{FieldError, Operation, OperationKind};

/// Upper bound for `?wait_ms`.
pub const MAX_WAIT_MS: u64 = 30_000;

/// Query parameters accepted by every POST.
#[derive(Debug, Default, Deserialize)]
pub struct PostParams {
    /// Wait up to this long for the command's own result.
    pub wait_ms: Option<u64>,
}

/// Parses a POST body. An empty body is an empty object.
pub fn parse_body(bytes: &[u8]) -> Result<Map<String, Value>, FieldError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(FieldError::Body(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
        Err(e) => Err(FieldError::Body(e.to_string())),
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// `POST <op.path>`: validate, queue, acknowledge (or wait).
pub async fn enqueue(
    op: &'static Operation,
    ctx: Arc<BridgeContext>,
    params: PostParams,
    body: &[u8],
) -> Result<Response, ReceiverError> {
    if ctx.is_stopping() {
        return Err(ReceiverError::Stopping);
    }
    let body = parse_body(body)?;
    if op.kind == OperationKind::Inline {
        return Ok(Json(json!({ "message": op.ack })).into_response());
    }

    let values = op.build_args(&body)?;
    let command = Command::new(op.name, Args::named(op.fields, values));
    let id = command.id;
    let request_id = id.to_string();
    debug!(operation = op.name, request_id = %request_id, "queueing {command}");

    // Register before queueing so a fast pump cannot resolve an unknown id.
    let waiter = match params.wait_ms {
        Some(ms) => Some((register_waiter(&ctx, id)?, ms.min(MAX_WAIT_MS))),
        None => None,
    };
    ctx.submit(command);

    let Some((rx, wait_ms)) = waiter else {
        return Ok(Json(op.ack_body(&request_id)).into_response());
    };
    match tokio::time::timeout(Duration::from_millis(wait_ms), rx).await {
        Ok(Ok(mut result)) => {
            if let Value::Object(map) = &mut result {
                map.insert("request_id".into(), Value::String(request_id));
            }
            Ok(Json(result).into_response())
        }
        Ok(Err(_)) => {
            info!(operation = op.name, request_id = %request_id, "command discarded before it ran");
            Ok((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "Command discarded: the bridge stopped before it ran",
                    "request_id": request_id,
                })),
            )
                .into_response())
        }
        Err(_) => {
            ctx.correlator.forget(id);
            let mut ack = op.ack_body(&request_id);
            ack["note"] = json!(op.poll_note());
            Ok((StatusCode::ACCEPTED, Json(ack)).into_response())
        }
    }
}

/// Registers a waiter for command `id`.
///
/// A stop that began after the entry check may already have cancelled every
/// waiter, and the graceful shutdown would then hold this request open for
/// the whole wait. Such a waiter is dropped and the request fails at once.
fn register_waiter(
    ctx: &BridgeContext,
    id: Uuid,
) -> Result<oneshot::Receiver<Value>, ReceiverError> {
    let rx = ctx.correlator.register(id);
    if ctx.is_stopping() {
        ctx.correlator.forget(id);
        return Err(ReceiverError::Stopping);
    }
    Ok(rx)
}

/// `GET /<operation>`: latest stored result.
pub async fn latest_result(op: &'static Operation, ctx: Arc<BridgeContext>) -> Json<Value> {
    Json(
        ctx.results
            .get(op.name)
            .unwrap_or_else(|| ResultStore::no_data(op.name)),
    )
}

pub async fn count_parameters(State(ctx): State<Arc<BridgeContext>>) -> Json<Value> {
    Json(ctx.snapshot.count_json())
}

pub async fn list_parameters(State(ctx): State<Arc<BridgeContext>>) -> Json<Value> {
    Json(ctx.snapshot.list_json())
}

pub async fn not_found(OriginalUri(uri): OriginalUri) -> ReceiverError {
    ReceiverError::NotFound(uri.path().to_string())
}

/// Adapter used by the router for catalogue POST routes.
pub async fn post_route(
    op: &'static Operation,
    State(ctx): State<Arc<BridgeContext>>,
    Query(params): Query<PostParams>,
    body: Bytes,
) -> Result<Response, ReceiverError> {
    enqueue(op, ctx, params, &body).await
}
