//! Whole-body operations: booleans, moves, mirrors, patterns and offsets.

use serde_json::json;

use super::{body_or_last, bounded_count, last_body, output, MAX_INSTANCES};
use crate::bridge::{Args, HandlerContext, HandlerOutput};
use crate::host::{Axis, BooleanOp, HostError, HostResult, Pattern, Plane};

fn count(name: &'static str, value: i64) -> HostResult<u32> {
    bounded_count(name, value, 1)
}

/// Combines body 1 (tool) into body 0 (target).
pub fn boolean_operation(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let op: BooleanOp = args.parse(0)?;
    let bodies = cx.host.bodies().len();
    if bodies < 2 {
        return Err(HostError::feature(
            "Boolean operation",
            format!("needs at least two bodies, the design has {bodies}"),
        ));
    }
    let r = cx.host.combine(0, 1, op)?;
    Ok(output(json!({
        "operation": args.text(0)?.to_ascii_lowercase(),
        "body": r.body,
        "volume": r.volume,
    })))
}

pub fn move_body(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let delta = [args.number(0)?, args.number(1)?, args.number(2)?];
    let body = last_body(cx.host)?;
    cx.host.move_body(body, delta)?;
    Ok(output(json!({ "body": body, "delta": delta })))
}

pub fn mirror_feature(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let plane: Plane = args.parse(0)?;
    let body = body_or_last(cx.host, args.opt_integer(1)?)?;
    let mirrored = cx.host.mirror_body(body, plane)?;
    Ok(output(json!({
        "source": body,
        "body": mirrored,
        "plane": plane.as_str(),
    })))
}

/// Patterns the last body over 360 degrees. The plane argument is validated
/// but does not influence the result.
pub fn circular_pattern(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let quantity = count("quantity", args.integer(0)?)?;
    let axis: Axis = args.parse(1)?;
    args.plane(2)?;
    let body = last_body(cx.host)?;
    let copies = cx
        .host
        .pattern_body(body, Pattern::Circular { axis, quantity })?;
    Ok(output(json!({ "body": body, "copies": copies })))
}

pub fn rectangular_pattern(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let first_axis: Axis = args.parse(0)?;
    let second_axis: Axis = args.parse(1)?;
    let first = (first_axis, count("quantity_one", args.integer(2)?)?, args.number(4)?);
    let second = (second_axis, count("quantity_two", args.integer(3)?)?, args.number(5)?);
    let instances = u64::from(first.1) * u64::from(second.1);
    if instances > u64::from(MAX_INSTANCES) {
        return Err(HostError::invalid(
            "quantity_one",
            format!("{} x {} = {instances} instances exceeds {MAX_INSTANCES}", first.1, second.1),
        ));
    }
    args.plane(6)?;
    let body = last_body(cx.host)?;
    let copies = cx
        .host
        .pattern_body(body, Pattern::Rectangular { first, second })?;
    Ok(output(json!({ "body": body, "copies": copies })))
}

pub fn offset_surface(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let distance = args.number(0)?;
    let face = args.index(1)?;
    let body = last_body(cx.host)?;
    let surface = cx.host.offset_face(body, face, distance)?;
    Ok(output(json!({ "source": body, "face": face, "body": surface })))
}

#[cfg(test)]
mod tests {
    use crate::bridge::TransactionLog;
    use crate::handlers::tests::run;
    use crate::host::{CadHost, HostError, SimulatedHost};
    use serde_json::json;

    #[test]
    fn boolean_needs_two_bodies() {
        let mut host = SimulatedHost::new();
        let mut log = TransactionLog::new();
        run(&mut host, &mut log, "draw_box", json!({})).unwrap();
        let err = run(&mut host, &mut log, "boolean_operation", json!({})).unwrap_err();
        assert!(matches!(err, HostError::Feature { .. }));

        run(&mut host, &mut log, "draw_box", json!({"x": 2})).unwrap();
        let out = run(&mut host, &mut log, "boolean_operation", json!({"operation": "Join"})).unwrap();
        assert_eq!(out["operation"], "join");
        assert_eq!(host.bodies().len(), 1);
    }

    #[test]
    fn unknown_boolean_is_rejected() {
        let mut host = SimulatedHost::new();
        let mut log = TransactionLog::new();
        let err = run(&mut host, &mut log, "boolean_operation", json!({"operation": "xor"})).unwrap_err();
        assert!(err.to_string().contains("xor"));
    }

    #[test]
    fn move_shifts_last_body() {
        let mut host = SimulatedHost::new();
        let mut log = TransactionLog::new();
        run(&mut host, &mut log, "draw_box", json!({})).unwrap();
        run(&mut host, &mut log, "move_body", json!({"x": 10})).unwrap();
        let center = host.bodies()[0].bounding_box.center();
        assert!((center[0] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn mirror_defaults_to_last_body() {
        let mut host = SimulatedHost::new();
        let mut log = TransactionLog::new();
        run(&mut host, &mut log, "draw_box", json!({"x": 5})).unwrap();
        let out = run(&mut host, &mut log, "mirror_feature", json!({"mirror_plane": "YZ"})).unwrap();
        assert_eq!(out["source"], 0);
        assert_eq!(out["body"], 1);
        let center = host.bodies()[1].bounding_box.center();
        assert!((center[0] + 5.0).abs() < 1e-9);
    }

    #[test]
    fn circular_pattern_quantity() {
        let mut host = SimulatedHost::new();
        let mut log = TransactionLog::new();
        run(&mut host, &mut log, "draw_box", json!({"x": 10})).unwrap();
        let err = run(&mut host, &mut log, "circular_pattern", json!({"quantity": 0})).unwrap_err();
        assert!(err.to_string().contains("quantity"));
        let out = run(
            &mut host,
            &mut log,
            "circular_pattern",
            json!({"quantity": 4, "axis": "Z"}),
        )
        .unwrap();
        assert_eq!(out["copies"], 3);
        assert_eq!(host.bodies().len(), 4);
    }

    #[test]
    fn pattern_counts_are_capped() {
        let mut host = SimulatedHost::new();
        let mut log = TransactionLog::new();
        run(&mut host, &mut log, "draw_box", json!({})).unwrap();

        let err = run(&mut host, &mut log, "circular_pattern", json!({"quantity": 1001})).unwrap_err();
        assert!(err.to_string().contains("1000"));

        let err = run(
            &mut host,
            &mut log,
            "rectangular_pattern",
            json!({"quantity_one": 100_000, "quantity_two": 100_000}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("quantity_one"));

        // Each count is in range but the grid is not.
        let err = run(
            &mut host,
            &mut log,
            "rectangular_pattern",
            json!({"quantity_one": 40, "quantity_two": 30}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("1200"));
        assert_eq!(host.bodies().len(), 1);

        let out = run(
            &mut host,
            &mut log,
            "rectangular_pattern",
            json!({"quantity_one": 2, "quantity_two": 3, "distance_one": 10, "distance_two": 10}),
        )
        .unwrap();
        assert_eq!(out["copies"], 5);
    }

    #[test]
    fn offset_surface_adds_sheet() {
        let mut host = SimulatedHost::new();
        let mut log = TransactionLog::new();
        run(&mut host, &mut log, "draw_box", json!({})).unwrap();
        let out = run(&mut host, &mut log, "offset_surface", json!({"distance": 2})).unwrap();
        assert_eq!(out["body"], 1);
    }
}
