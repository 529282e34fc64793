//! Command handlers.
//!
//! One function per queued catalogue operation. Handlers read their
//! positional [`Args`] in catalogue field order, call into the host and
//! return the data part of the result; the pump wraps it into the
//! `{"success": ...}` envelope and alerts the host on failure.

mod bodies;
mod document;
mod features;
mod sketch;
mod topology;
mod transactions;

use serde_json::{Map, Value};

use crate::bridge::{Args, Dispatcher, HandlerContext, HandlerOutput};
use crate::host::{CadHost, HostError, HostResult, Plane, Point2, SketchTarget};

/// Handler function signature.
type HandlerFn = fn(&mut HandlerContext<'_>, &Args) -> HostResult<HandlerOutput>;

const HANDLERS: &[(&str, HandlerFn)] = &[
    // document
    ("set_parameter", document::set_parameter),
    ("undo", document::undo),
    ("export_stl", document::export_stl),
    ("export_step", document::export_step),
    ("delete_everything", document::delete_everything),
    ("select_body", document::select_body),
    ("select_sketch", document::select_sketch),
    // sketches and planes
    ("draw_lines", sketch::draw_lines),
    ("arc", sketch::arc),
    ("draw_one_line", sketch::draw_one_line),
    ("circle", sketch::circle),
    ("spline", sketch::spline),
    ("ellipsis", sketch::ellipsis),
    ("draw_2d_rectangle", sketch::draw_2d_rectangle),
    ("draw_polygon", sketch::draw_polygon),
    ("offsetplane", sketch::offsetplane),
    ("sketch_on_face", sketch::sketch_on_face),
    ("create_work_plane", sketch::create_work_plane),
    ("project_edges", sketch::project_edges),
    // solid features
    ("draw_box", features::draw_box),
    ("draw_cylinder", features::draw_cylinder),
    ("draw_sphere", features::draw_sphere),
    ("draw_text", features::draw_text),
    ("extrude_last_sketch", features::extrude_last_sketch),
    ("extrude_thin", features::extrude_thin),
    ("revolve_profile", features::revolve_profile),
    ("sweep", features::sweep),
    ("loft", features::loft),
    ("cut_extrude", features::cut_extrude),
    ("pocket_recess", features::pocket_recess),
    ("pocket_recess_safe", features::pocket_recess_safe),
    ("fillet_edges", features::fillet_edges),
    ("shell_body", features::shell_body),
    ("holes", features::holes),
    ("threaded", features::threaded),
    // body transforms
    ("boolean_operation", bodies::boolean_operation),
    ("move_body", bodies::move_body),
    ("mirror_feature", bodies::mirror_feature),
    ("circular_pattern", bodies::circular_pattern),
    ("rectangular_pattern", bodies::rectangular_pattern),
    ("offset_surface", bodies::offset_surface),
    // topology queries
    ("list_bodies", topology::list_bodies),
    ("list_faces", topology::list_faces),
    ("find_face", topology::find_face),
    // transactions
    ("begin_transaction", transactions::begin),
    ("commit_transaction", transactions::commit),
    ("rollback_transaction", transactions::rollback),
];

/// Registers every handler with `dispatcher`.
pub fn register_all(dispatcher: &mut Dispatcher) {
    for &(name, handler) in HANDLERS {
        dispatcher.register(name, handler);
    }
}

/// Converts a `json!` object literal into handler output.
fn output(value: Value) -> HandlerOutput {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Upper bound for generated instances: polygon sides and pattern copies.
pub const MAX_INSTANCES: u32 = 1000;

/// `value` as a count in `min..=MAX_INSTANCES`.
fn bounded_count(name: &'static str, value: i64, min: u32) -> HostResult<u32> {
    u32::try_from(value)
        .ok()
        .filter(|n| (min..=MAX_INSTANCES).contains(n))
        .ok_or_else(|| {
            HostError::invalid(
                name,
                format!("must be between {min} and {MAX_INSTANCES}, got {value}"),
            )
        })
}

/// Index of the most recent sketch.
fn last_sketch(host: &dyn CadHost) -> HostResult<usize> {
    host.sketch_count().checked_sub(1).ok_or(HostError::NoSketches)
}

/// Index of the most recent body.
fn last_body(host: &dyn CadHost) -> HostResult<usize> {
    host.bodies().len().checked_sub(1).ok_or(HostError::NoBodies)
}

/// `requested` if it names an existing body, otherwise the last body.
fn body_or_last(host: &dyn CadHost, requested: Option<i64>) -> HostResult<usize> {
    let last = last_body(host)?;
    Ok(requested
        .and_then(|i| usize::try_from(i).ok())
        .filter(|&i| i <= last)
        .unwrap_or(last))
}

/// Creates a sketch on `plane` through the world point `(x, y, z)` and returns
/// it with the point in sketch coordinates.
fn sketch_through(
    host: &mut dyn CadHost,
    plane: Plane,
    x: f64,
    y: f64,
    z: f64,
) -> HostResult<(usize, Point2)> {
    let (local, offset) = plane.split(x, y, z);
    let sketch = host.create_sketch(SketchTarget::Plane { plane, offset })?;
    Ok((sketch, local))
}

/// A sketch on an origin plane without offset.
fn sketch_on(host: &mut dyn CadHost, plane: Plane) -> HostResult<usize> {
    host.create_sketch(SketchTarget::Plane { plane, offset: 0.0 })
}

/// Sketch-plane coordinates of a point argument; `z` is ignored.
fn planar(p: [f64; 3]) -> Point2 {
    Point2::new(p[0], p[1])
}
