//! Ordering and isolation guarantees of the host-thread pump.

use std::sync::{Arc, Mutex};

use serde_json::{json, Map, Value};

use cad_bridge_mcp::bridge::{Args, BridgeContext, Command, Dispatcher, HandlerOutput, Pump};
use cad_bridge_mcp::host::{HostError, SimulatedHost};
use cad_bridge_mcp::ops;

fn command(operation: &str, body: Value) -> Command {
    let op = ops::by_name(operation).unwrap();
    let Value::Object(map) = body else {
        panic!("body must be an object");
    };
    let values = op.build_args(&map).unwrap();
    Command::new(op.name, Args::named(op.fields, values))
}

/// A dispatcher whose handlers only record their operation name.
fn recording(names: &[&'static str]) -> (Dispatcher, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut dispatcher = Dispatcher::new();
    for &name in names {
        let seen = Arc::clone(&seen);
        dispatcher.register(name, move |_, args| {
            seen.lock().unwrap().push(format!("{name}:{}", args.len()));
            Ok(HandlerOutput::new())
        });
    }
    (dispatcher, seen)
}

#[test]
fn commands_run_in_submission_order() {
    let ctx = Arc::new(BridgeContext::new());
    let (dispatcher, seen) = recording(&["a", "b", "c"]);
    let mut pump = Pump::new(Arc::clone(&ctx), dispatcher);
    let mut host = SimulatedHost::new();

    for (name, argc) in [("b", 0), ("a", 2), ("c", 1), ("a", 0)] {
        ctx.submit(Command::new(name, vec![json!(0); argc]));
    }
    let report = pump.tick(&mut host);
    assert_eq!(report.dispatched, 4);
    assert_eq!(
        *seen.lock().unwrap(),
        ["b:0", "a:2", "c:1", "a:0"].map(String::from)
    );
    assert!(ctx.queue.is_empty());
}

#[test]
fn failures_are_isolated_per_command() {
    let ctx = Arc::new(BridgeContext::new());
    let mut pump = Pump::new(Arc::clone(&ctx), Dispatcher::with_defaults());
    let mut host = SimulatedHost::new();

    // extruding with no sketch fails; the box after it must still be built
    ctx.submit(command("extrude_last_sketch", json!({})));
    ctx.submit(command("draw_box", json!({"width": 2, "height": 2, "depth": 2})));
    ctx.submit(command("list_bodies", json!({})));
    let report = pump.tick(&mut host);
    assert_eq!(report.dispatched, 3);
    assert_eq!(report.failed, 1);

    let failed = ctx.results.get("extrude_last_sketch").unwrap();
    assert_eq!(failed["success"], false);
    assert_eq!(failed["error"], HostError::NoSketches.to_string());
    assert_eq!(host.alerts().len(), 1);

    let listed = ctx.results.get("list_bodies").unwrap();
    assert_eq!(listed["success"], true);
    assert_eq!(listed["count"], 1);
    assert!((listed["bodies"][0]["volume"].as_f64().unwrap() - 8.0).abs() < 1e-9);
}

#[test]
fn latest_result_wins_per_operation() {
    let ctx = Arc::new(BridgeContext::new());
    let mut pump = Pump::new(Arc::clone(&ctx), Dispatcher::with_defaults());
    let mut host = SimulatedHost::new();

    ctx.submit(command("list_bodies", json!({})));
    ctx.submit(command("draw_cylinder", json!({"radius": 1})));
    ctx.submit(command("list_bodies", json!({})));
    pump.tick(&mut host);
    assert_eq!(ctx.results.get("list_bodies").unwrap()["count"], 1);
}

#[test]
fn waiter_gets_its_own_result() {
    let ctx = Arc::new(BridgeContext::new());
    let mut pump = Pump::new(Arc::clone(&ctx), Dispatcher::with_defaults());
    let mut host = SimulatedHost::new();

    let first = command("list_bodies", json!({}));
    let second = command("list_bodies", json!({}));
    let rx_first = ctx.correlator.register(first.id);
    let rx_second = ctx.correlator.register(second.id);
    ctx.submit(first);
    ctx.submit(command("draw_sphere", json!({"radius": 1})));
    ctx.submit(second);
    pump.tick(&mut host);

    let a = tokio_test::block_on(rx_first).unwrap();
    let b = tokio_test::block_on(rx_second).unwrap();
    assert_eq!(a["count"], 0);
    assert_eq!(b["count"], 1);
    assert_eq!(ctx.correlator.pending(), 0);
}

#[test]
fn stop_flag_halts_dispatch_between_commands() {
    let ctx = Arc::new(BridgeContext::new());
    let stopper = Arc::clone(&ctx);
    let mut dispatcher = Dispatcher::new();
    dispatcher.register("halt", move |_, _| {
        stopper.begin_stop();
        Ok(Map::new())
    });
    dispatcher.register("never", |_, _| panic!("dispatched after stop"));
    let mut pump = Pump::new(Arc::clone(&ctx), dispatcher);
    let mut host = SimulatedHost::new();

    ctx.submit(Command::new("halt", Vec::<Value>::new()));
    ctx.submit(Command::new("never", Vec::<Value>::new()));
    let report = pump.tick(&mut host);
    assert_eq!(report.dispatched, 1);
    assert!(report.interrupted);
    assert_eq!(ctx.queue.len(), 1);
}

#[test]
fn transaction_records_operations_in_order() {
    let ctx = Arc::new(BridgeContext::new());
    let mut pump = Pump::new(Arc::clone(&ctx), Dispatcher::with_defaults());
    let mut host = SimulatedHost::new();

    ctx.submit(command("begin_transaction", json!({"name": "plate"})));
    pump.tick(&mut host);
    let id = ctx.results.get("begin_transaction").unwrap()["transaction_id"]
        .as_str()
        .unwrap()
        .to_string();

    ctx.submit(command("draw_box", json!({})));
    ctx.submit(command("fillet_edges", json!({"radius": 0.2})));
    ctx.submit(command("commit_transaction", json!({"transaction_id": id})));
    pump.tick(&mut host);

    let committed = ctx.results.get("commit_transaction").unwrap();
    assert_eq!(committed["success"], true);
    assert_eq!(committed["operations"], json!(["draw_box", "fillet_edges"]));
    assert!(pump.transactions().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_posts_never_overlap_on_the_host() {
    use std::time::{Duration, Instant};

    use cad_bridge_mcp::bridge::{Bridge, BridgeOptions};

    // (thread name, entered, left) per handler call
    type Spans = Arc<Mutex<Vec<(Option<String>, Instant, Instant)>>>;
    let spans: Spans = Arc::default();
    let mut dispatcher = Dispatcher::new();
    for name in ["draw_box", "draw_sphere"] {
        let spans = Arc::clone(&spans);
        dispatcher.register(name, move |_, _| {
            let entered = Instant::now();
            std::thread::sleep(Duration::from_millis(2));
            let thread = std::thread::current().name().map(String::from);
            spans.lock().unwrap().push((thread, entered, Instant::now()));
            Ok(HandlerOutput::new())
        });
    }

    let mut bridge = Bridge::with_dispatcher(
        Box::new(SimulatedHost::new()),
        BridgeOptions {
            bind: "127.0.0.1:0".into(),
            tick_interval: Duration::from_millis(5),
        },
        dispatcher,
    );
    let addr = bridge.start().await.unwrap();
    let client = reqwest::Client::new();

    let requests: Vec<_> = (0..24)
        .map(|i| {
            let client = client.clone();
            let (path, body) = if i % 2 == 0 {
                ("Box", json!({}))
            } else {
                ("sphere", json!({"radius": 1}))
            };
            let url = format!("http://{addr}/{path}?wait_ms=10000");
            tokio::spawn(async move { client.post(url).json(&body).send().await.unwrap() })
        })
        .collect();
    for request in requests {
        let resp = request.await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["success"], true);
    }
    bridge.stop().await.unwrap();

    let mut spans = spans.lock().unwrap().clone();
    assert_eq!(spans.len(), 24);
    assert!(spans
        .iter()
        .all(|(thread, _, _)| thread.as_deref() == Some("cad-host")));
    spans.sort_by_key(|&(_, entered, _)| entered);
    for pair in spans.windows(2) {
        assert!(pair[0].2 <= pair[1].1, "handler calls overlapped");
    }
}
