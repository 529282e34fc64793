//! The host-thread pump.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::command::Command;
use super::dispatch::{Dispatcher, HandlerContext, HandlerOutput};
use super::transactions::TransactionLog;
use super::BridgeContext;
use crate::host::{CadHost, HostResult};

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Commands handed to a handler.
    pub dispatched: usize,
    /// Commands with no registered handler.
    pub dropped: usize,
    /// Dispatched commands whose handler failed or panicked.
    pub failed: usize,
    /// The tick stopped early because the bridge is stopping.
    pub interrupted: bool,
}

/// Drains the command queue against the host. Runs only on the host thread.
#[derive(Debug)]
pub struct Pump {
    ctx: Arc<BridgeContext>,
    dispatcher: Dispatcher,
    transactions: TransactionLog,
}

impl Pump {
    #[must_use]
    pub fn new(ctx: Arc<BridgeContext>, dispatcher: Dispatcher) -> Self {
        Self {
            ctx,
            dispatcher,
            transactions: TransactionLog::new(),
        }
    }

    #[must_use]
    pub const fn transactions(&self) -> &TransactionLog {
        &self.transactions
    }

    /// Runs one tick: refreshes the parameter snapshot, then dispatches queued
    /// commands in FIFO order until the queue is empty or a stop begins.
    ///
    /// Does nothing while no design is open; queued commands wait.
    pub fn tick(&mut self, host: &mut dyn CadHost) -> TickReport {
        let mut report = TickReport::default();
        if !host.has_active_design() {
            return report;
        }
        self.ctx.snapshot.replace(host.model_parameters());

        loop {
            if self.ctx.is_stopping() {
                report.interrupted = true;
                break;
            }
            let Some(command) = self.ctx.queue.pop() else {
                break;
            };
            match self.dispatch(host, &command) {
                None => report.dropped += 1,
                Some(ok) => {
                    report.dispatched += 1;
                    if !ok {
                        report.failed += 1;
                    }
                }
            }
        }
        report
    }

    /// Runs one command. Returns `None` for an unknown operation, otherwise
    /// whether the handler succeeded.
    fn dispatch(&mut self, host: &mut dyn CadHost, command: &Command) -> Option<bool> {
        let Some(handler) = self.dispatcher.get(&command.operation) else {
            debug!(operation = %command.operation, request_id = %command.id, "no handler, command dropped");
            self.ctx.correlator.forget(command.id);
            return None;
        };
        debug!(request_id = %command.id, "dispatching {command}");

        let outcome = {
            let mut hctx = HandlerContext {
                host: &mut *host,
                transactions: &mut self.transactions,
            };
            panic::catch_unwind(AssertUnwindSafe(|| handler(&mut hctx, &command.args)))
        };
        let outcome: HostResult<HandlerOutput> = outcome.unwrap_or_else(|payload| {
            Err(crate::host::HostError::feature(
                "Handler",
                format!("panicked: {}", panic_message(payload.as_ref())),
            ))
        });

        let ok = outcome.is_ok();
        let result = match outcome {
            Ok(data) => {
                info!(operation = %command.operation, request_id = %command.id, "operation succeeded");
                normalise_success(data)
            }
            Err(e) => {
                warn!(operation = %command.operation, request_id = %command.id, error = %e, "operation failed");
                host.alert(&format!("Failed {}: {e}", command.operation));
                failure(&e.to_string())
            }
        };

        self.transactions.record(&command.operation);
        self.ctx.results.put(&command.operation, result.clone());
        self.ctx.correlator.resolve(command.id, &result);
        Some(ok)
    }
}

fn normalise_success(data: HandlerOutput) -> Value {
    let mut body = Map::with_capacity(data.len() + 1);
    body.insert("success".into(), Value::Bool(true));
    for (key, value) in data {
        if key != "success" {
            body.insert(key, value);
        }
    }
    Value::Object(body)
}

fn failure(message: &str) -> Value {
    let mut body = Map::new();
    body.insert("success".into(), Value::Bool(false));
    body.insert("error".into(), Value::String(message.to_string()));
    Value::Object(body)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostError, SimulatedHost};
    use serde_json::json;

    fn pump_with(dispatcher: Dispatcher) -> (Arc<BridgeContext>, Pump) {
        let ctx = Arc::new(BridgeContext::new());
        let pump = Pump::new(Arc::clone(&ctx), dispatcher);
        (ctx, pump)
    }

    #[test]
    fn results_are_normalised_and_stored() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("ok", |_, args| {
            let mut out = Map::new();
            out.insert("echo".into(), args.get(0).cloned().unwrap_or(Value::Null));
            Ok(out)
        });
        dispatcher.register("bad", |_, _| Err(HostError::NoBodies));
        let (ctx, mut pump) = pump_with(dispatcher);
        let mut host = SimulatedHost::new();

        ctx.submit(Command::new("ok", vec![json!(7)]));
        ctx.submit(Command::new("bad", Vec::new()));
        let report = pump.tick(&mut host);

        assert_eq!(report.dispatched, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(ctx.results.get("ok").unwrap(), json!({"success": true, "echo": 7}));
        assert_eq!(
            ctx.results.get("bad").unwrap(),
            json!({"success": false, "error": "No bodies found in the design"})
        );
        assert_eq!(host.alerts(), ["Failed bad: No bodies found in the design"]);
    }

    #[test]
    fn unknown_operations_are_dropped_silently() {
        let (ctx, mut pump) = pump_with(Dispatcher::new());
        let mut host = SimulatedHost::new();
        let id = ctx.submit(Command::new("nope", Vec::new()));
        let rx = ctx.correlator.register(id);

        let report = pump.tick(&mut host);
        assert_eq!(report.dropped, 1);
        assert!(ctx.results.is_empty());
        assert!(tokio_test::block_on(rx).is_err());
    }

    #[test]
    fn panics_are_contained() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register("boom", |_, _| panic!("kaboom"));
        dispatcher.register("after", |_, _| Ok(Map::new()));
        let (ctx, mut pump) = pump_with(dispatcher);
        let mut host = SimulatedHost::new();

        ctx.submit(Command::new("boom", Vec::new()));
        ctx.submit(Command::new("after", Vec::new()));
        let report = pump.tick(&mut host);

        assert_eq!(report.dispatched, 2);
        let boom = ctx.results.get("boom").unwrap();
        assert_eq!(boom["success"], false);
        assert!(boom["error"].as_str().unwrap().contains("kaboom"));
        assert_eq!(ctx.results.get("after").unwrap(), json!({"success": true}));
    }

    #[test]
    fn no_design_leaves_queue_untouched() {
        let (ctx, mut pump) = pump_with(Dispatcher::with_defaults());
        let mut host = SimulatedHost::without_design();
        ctx.submit(Command::new("undo", Vec::new()));
        assert_eq!(pump.tick(&mut host), TickReport::default());
        assert_eq!(ctx.queue.len(), 1);
    }

    #[test]
    fn stop_flag_halts_dispatch() {
        let (ctx, mut pump) = pump_with(Dispatcher::with_defaults());
        let mut host = SimulatedHost::new();
        ctx.submit(Command::new("list_bodies", Vec::new()));
        ctx.begin_stop();
        let report = pump.tick(&mut host);
        assert!(report.interrupted);
        assert_eq!(report.dispatched, 0);
        assert_eq!(ctx.queue.len(), 1);
    }

    #[test]
    fn waiter_receives_own_result() {
        let (ctx, mut pump) = pump_with(Dispatcher::with_defaults());
        let mut host = SimulatedHost::new();
        let command = Command::new("list_bodies", Vec::new());
        let rx = ctx.correlator.register(command.id);
        ctx.submit(command);
        pump.tick(&mut host);
        let result = tokio_test::block_on(rx).unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(result["count"], 0);
    }
}
