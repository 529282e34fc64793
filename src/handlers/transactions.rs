//! Advisory transactions over the host's undo history.

use serde_json::json;
use tracing::info;

use super::output;
use crate::bridge::{Args, HandlerContext, HandlerOutput};
use crate::host::{HostError, HostResult};

fn unknown(id: &str) -> HostError {
    HostError::NotFound {
        kind: "Transaction",
        name: id.to_string(),
    }
}

pub fn begin(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let name = args.text(0)?;
    let marker = cx.host.history_marker();
    let t = cx.transactions.begin(name, marker);
    info!(transaction = %t.id, name = %t.name, marker, "transaction started");
    Ok(output(json!({
        "transaction_id": t.id,
        "name": t.name,
        "history_marker": t.marker,
        "started_at": t.started_at.to_rfc3339(),
    })))
}

pub fn commit(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let id = args.text(0)?;
    let t = cx.transactions.finish(id).ok_or_else(|| unknown(id))?;
    info!(transaction = %t.id, operations = t.operations.len(), "transaction committed");
    Ok(output(json!({
        "transaction_id": t.id,
        "name": t.name,
        "operation_count": t.operations.len(),
        "operations": t.operations,
    })))
}

/// Undoes back to the marker taken at begin. Best effort: the host may have
/// fewer steps to undo than operations were recorded.
pub fn rollback(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let id = args.text(0)?;
    let t = cx.transactions.finish(id).ok_or_else(|| unknown(id))?;
    let current = cx.host.history_marker();
    let undone = if current > t.marker {
        cx.host.rollback_to(t.marker)?
    } else {
        0
    };
    info!(transaction = %t.id, undone, "transaction rolled back");
    Ok(output(json!({
        "transaction_id": t.id,
        "name": t.name,
        "undone_steps": undone,
        "operations": t.operations,
    })))
}

#[cfg(test)]
mod tests {
    use crate::bridge::TransactionLog;
    use crate::handlers::tests::run;
    use crate::host::{CadHost, HostError, SimulatedHost};
    use serde_json::json;

    #[test]
    fn rollback_restores_design() {
        let mut host = SimulatedHost::new();
        let mut log = TransactionLog::new();
        run(&mut host, &mut log, "draw_box", json!({})).unwrap();

        let begun = run(&mut host, &mut log, "begin_transaction", json!({"name": "holes"})).unwrap();
        let id = begun["transaction_id"].as_str().unwrap().to_string();
        // recording is the pump's job; emulate it
        run(&mut host, &mut log, "draw_cylinder", json!({"radius": 1, "x": 10})).unwrap();
        log.record("draw_cylinder");
        assert_eq!(host.bodies().len(), 2);

        let out = run(
            &mut host,
            &mut log,
            "rollback_transaction",
            json!({"transaction_id": id}),
        )
        .unwrap();
        assert_eq!(out["undone_steps"], 3);
        assert_eq!(out["operations"], json!(["draw_cylinder"]));
        assert_eq!(host.bodies().len(), 1);
        assert!(log.is_empty());
    }

    #[test]
    fn commit_unknown_transaction() {
        let mut host = SimulatedHost::new();
        let mut log = TransactionLog::new();
        let err = run(
            &mut host,
            &mut log,
            "commit_transaction",
            json!({"transaction_id": "nope"}),
        )
        .unwrap_err();
        assert!(matches!(err, HostError::NotFound { kind: "Transaction", .. }));
    }
}
