//! HTTP command receiver.
//!
//! Every catalogue path accepts a POST that is validated, turned into a
//! [`Command`](crate::bridge::Command) and queued for the host thread. The
//! receiver never touches the CAD host itself; it answers from the shared
//! [`BridgeContext`] only.
//!
//! Routes:
//!
//! - `POST <op.path>[?wait_ms=N]`: queue the operation
//! - `GET /<op.name>`: latest result of that operation
//! - `GET /count_parameters`, `GET /list_parameters`: parameter snapshot

pub mod error;
pub mod handlers;

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::routing::{get, MethodRouter};
use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::ReceiverError;
pub use handlers::{parse_body, PostParams, MAX_WAIT_MS};

use crate::bridge::BridgeContext;
use crate::ops::{self, OperationKind};

type Ctx = Arc<BridgeContext>;

/// Builds the receiver router over a bridge context.
pub fn router(ctx: Ctx) -> Router {
    // A result GET may share a path with some POST, so method routers are
    // merged per path before registration.
    let mut routes: BTreeMap<String, MethodRouter<Ctx>> = BTreeMap::new();

    for op in ops::all() {
        let slot = routes.entry(op.path.to_string()).or_default();
        *slot = std::mem::take(slot).post(
            move |state: State<Ctx>, query: Query<PostParams>, body: Bytes| {
                handlers::post_route(op, state, query, body)
            },
        );

        if op.kind != OperationKind::Inline {
            let slot = routes.entry(format!("/{}", op.name)).or_default();
            *slot = std::mem::take(slot)
                .get(move |State(ctx): State<Ctx>| handlers::latest_result(op, ctx));
        }
    }

    let mut router = Router::new()
        .route("/count_parameters", get(handlers::count_parameters))
        .route("/list_parameters", get(handlers::list_parameters));
    for (path, method_router) in routes {
        router = router.route(&path, method_router);
    }

    router
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
