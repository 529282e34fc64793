//! Sketch curves and construction planes.

use serde_json::json;
use tracing::debug;

use super::{
    body_or_last, bounded_count, last_body, last_sketch, output, planar, sketch_on, sketch_through,
};
use crate::bridge::{Args, HandlerContext, HandlerOutput};
use crate::host::{
    CadHost, HostError, HostResult, Plane, PlaneDefinition, Point2, SketchCurve, SketchTarget,
};

const OPEN_PROFILE: &str = "Sketch has no closed profiles. Please draw a closed shape.";

/// Reports the sketch and warns (without failing) when it has no profile.
fn sketch_output(host: &mut dyn CadHost, sketch: usize) -> HostResult<HandlerOutput> {
    let info = host.sketch_info(sketch)?;
    let mut out = output(json!({
        "sketch": info.index,
        "sketch_name": info.name,
        "curves": info.curve_count,
        "profiles": info.profile_count,
    }));
    if info.profile_count == 0 {
        host.alert(OPEN_PROFILE);
        out.insert("warning".into(), json!(OPEN_PROFILE));
    }
    Ok(out)
}

pub fn draw_lines(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let points: Vec<Point2> = args.points(0)?.into_iter().map(planar).collect();
    let plane = args.plane(1)?;
    if points.len() < 2 {
        return Err(HostError::invalid("points", "at least two points are required"));
    }
    let sketch = sketch_on(cx.host, plane)?;
    for pair in points.windows(2) {
        cx.host.add_curve(
            sketch,
            SketchCurve::Line {
                start: pair[0],
                end: pair[1],
            },
        )?;
    }
    // close the polyline
    if let (Some(&first), Some(&last)) = (points.first(), points.last()) {
        if first != last {
            cx.host.add_curve(sketch, SketchCurve::Line { start: last, end: first })?;
        }
    }
    sketch_output(cx.host, sketch)
}

pub fn arc(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let start = planar(args.point(0)?);
    let through = planar(args.point(1)?);
    let end = planar(args.point(2)?);
    let connect = args.boolean(3)?;
    let plane = args.plane(4)?;

    let sketch = sketch_on(cx.host, plane)?;
    cx.host.add_curve(sketch, SketchCurve::Arc { start, through, end })?;
    if connect {
        cx.host.add_curve(sketch, SketchCurve::Line { start, end })?;
    }
    sketch_output(cx.host, sketch)
}

/// Adds a line to the last sketch instead of starting a new one.
pub fn draw_one_line(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let start = Point2::new(args.number(0)?, args.number(1)?);
    let end = Point2::new(args.number(3)?, args.number(4)?);
    let sketch = last_sketch(cx.host)?;
    cx.host.add_curve(sketch, SketchCurve::Line { start, end })?;
    sketch_output(cx.host, sketch)
}

pub fn circle(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let radius = args.number(0)?;
    let plane = args.plane(4)?;
    let (sketch, center) =
        sketch_through(cx.host, plane, args.number(1)?, args.number(2)?, args.number(3)?)?;
    cx.host.add_curve(sketch, SketchCurve::Circle { center, radius })?;
    sketch_output(cx.host, sketch)
}

pub fn spline(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let points: Vec<Point2> = args.points(0)?.into_iter().map(planar).collect();
    let plane = args.plane(1)?;
    let sketch = sketch_on(cx.host, plane)?;
    cx.host.add_curve(sketch, SketchCurve::Spline { points })?;
    sketch_output(cx.host, sketch)
}

pub fn ellipsis(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let center = Point2::new(args.number(0)?, args.number(1)?);
    let major = Point2::new(args.number(3)?, args.number(4)?);
    let through = Point2::new(args.number(6)?, args.number(7)?);
    let plane = args.plane(9)?;
    let sketch = sketch_on(cx.host, plane)?;
    cx.host.add_curve(
        sketch,
        SketchCurve::Ellipse {
            center,
            major,
            through,
        },
    )?;
    sketch_output(cx.host, sketch)
}

pub fn draw_2d_rectangle(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let plane = args.plane(6)?;
    let (sketch, corner) =
        sketch_through(cx.host, plane, args.number(0)?, args.number(1)?, args.number(2)?)?;
    let (opposite, _) = plane.split(args.number(3)?, args.number(4)?, args.number(5)?);
    cx.host
        .add_curve(sketch, SketchCurve::Rectangle { corner, opposite })?;
    sketch_output(cx.host, sketch)
}

pub fn draw_polygon(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let sides = bounded_count("sides", args.integer(0)?, 3)?;
    let radius = args.number(1)?;
    let plane = args.plane(5)?;
    let (sketch, center) =
        sketch_through(cx.host, plane, args.number(2)?, args.number(3)?, args.number(4)?)?;
    cx.host.add_curve(
        sketch,
        SketchCurve::Polygon {
            center,
            radius,
            sides,
        },
    )?;
    sketch_output(cx.host, sketch)
}

pub fn offsetplane(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let distance = args.number(0)?;
    let plane = args.plane(1)?;
    let index = cx
        .host
        .create_construction_plane(PlaneDefinition::Offset { plane, distance })?;
    Ok(output(json!({
        "plane": index,
        "base": plane.as_str(),
        "offset": distance,
    })))
}

pub fn sketch_on_face(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let body = body_or_last(cx.host, Some(args.integer(0)?))?;
    let face = args.index(1)?;
    let sketch = cx.host.create_sketch(SketchTarget::Face { body, face })?;
    debug!(body, face, sketch, "sketch created on face");
    Ok(output(json!({
        "sketch": sketch,
        "body": body,
        "face": face,
        "message": format!("Sketch created on face {face} of body {body}"),
    })))
}

pub fn create_work_plane(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let kind = args.text(0)?;
    let distance = args.number(1)?;
    let definition = match kind {
        "offset_xy" => PlaneDefinition::Offset {
            plane: Plane::Xy,
            distance,
        },
        "offset_xz" => PlaneDefinition::Offset {
            plane: Plane::Xz,
            distance,
        },
        "offset_yz" => PlaneDefinition::Offset {
            plane: Plane::Yz,
            distance,
        },
        "face_offset" => PlaneDefinition::FaceOffset {
            body: last_body(cx.host)?,
            face: args.index(2)?,
            distance,
        },
        other => {
            return Err(HostError::invalid(
                "plane_type",
                format!("unknown plane type '{other}', expected offset_xy, offset_xz, offset_yz or face_offset"),
            ))
        }
    };
    let index = cx.host.create_construction_plane(definition)?;
    Ok(output(json!({ "plane": index, "plane_type": kind })))
}

pub fn project_edges(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let sketch = last_sketch(cx.host)?;
    let body = body_or_last(cx.host, args.opt_integer(0)?)?;
    let edges = cx.host.project_body_edges(sketch, body)?;
    Ok(output(json!({
        "sketch": sketch,
        "body": body,
        "edges": edges,
    })))
}
