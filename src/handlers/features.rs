//! Solid features: primitives, extrusions, revolves, lofts and finishing.

use serde_json::json;

use super::{last_body, last_sketch, output, sketch_through};
use crate::bridge::{Args, HandlerContext, HandlerOutput};
use crate::host::{
    CadHost, Extrude, FeatureReport, HoleSpec, HostError, HostResult, Point2, SketchCurve,
    SurfaceKind, ThreadSpec,
};

fn report(r: FeatureReport) -> HandlerOutput {
    output(json!({ "body": r.body, "volume": r.volume }))
}

fn positive(name: &'static str, value: f64) -> HostResult<f64> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(HostError::invalid(name, format!("must be positive, got {value}")))
    }
}

/// Volume of a body as reported by the host.
fn body_volume(host: &dyn CadHost, body: usize) -> HostResult<f64> {
    let bodies = host.bodies();
    bodies
        .get(body)
        .map(|b| b.volume)
        .ok_or(HostError::BodyOutOfRange {
            index: body,
            count: bodies.len(),
        })
}

pub fn draw_box(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let height = positive("height", args.number(0)?)?;
    let width = positive("width", args.number(1)?)?;
    let depth = args.number(2)?;
    let plane = args.plane(6)?;
    let (sketch, center) =
        sketch_through(cx.host, plane, args.number(3)?, args.number(4)?, args.number(5)?)?;
    cx.host.add_curve(
        sketch,
        SketchCurve::Rectangle {
            corner: Point2::new(center.x - width / 2.0, center.y - height / 2.0),
            opposite: Point2::new(center.x + width / 2.0, center.y + height / 2.0),
        },
    )?;
    let r = cx.host.extrude(&Extrude::new_body(sketch, depth))?;
    Ok(report(r))
}

pub fn draw_cylinder(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let radius = positive("radius", args.number(0)?)?;
    let height = args.number(1)?;
    let plane = args.plane(5)?;
    let (sketch, center) =
        sketch_through(cx.host, plane, args.number(2)?, args.number(3)?, args.number(4)?)?;
    cx.host
        .add_curve(sketch, SketchCurve::Circle { center, radius })?;
    let r = cx.host.extrude(&Extrude::new_body(sketch, height))?;
    Ok(report(r))
}

/// A circle revolved a full turn about its horizontal diameter.
pub fn draw_sphere(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let radius = positive("radius", args.number(0)?)?;
    let plane = args.plane(4)?;
    let (sketch, center) =
        sketch_through(cx.host, plane, args.number(1)?, args.number(2)?, args.number(3)?)?;
    cx.host
        .add_curve(sketch, SketchCurve::Circle { center, radius })?;
    cx.host.add_curve(
        sketch,
        SketchCurve::Line {
            start: Point2::new(center.x - radius, center.y),
            end: Point2::new(center.x + radius, center.y),
        },
    )?;
    let r = cx.host.revolve(sketch, 360.0)?;
    Ok(report(r))
}

pub fn draw_text(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let content = args.text(0)?.to_string();
    let height = positive("thickness", args.number(1)?)?;
    let distance = args.number(8)?;
    let plane = args.plane(9)?;
    let (sketch, corner) =
        sketch_through(cx.host, plane, args.number(2)?, args.number(3)?, args.number(4)?)?;
    let (opposite, _) = plane.split(args.number(5)?, args.number(6)?, args.number(7)?);
    cx.host.add_curve(
        sketch,
        SketchCurve::Text {
            content,
            height,
            corner,
            opposite,
        },
    )?;
    let r = cx.host.extrude(&Extrude::new_body(sketch, distance))?;
    Ok(report(r))
}

pub fn extrude_last_sketch(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let distance = args.number(0)?;
    let taper = args.number(1)?;
    let sketch = last_sketch(cx.host)?;
    let r = cx.host.extrude(&Extrude {
        taper_deg: taper,
        ..Extrude::new_body(sketch, distance)
    })?;
    Ok(report(r))
}

pub fn extrude_thin(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let thickness = positive("thickness", args.number(0)?)?;
    let distance = args.number(1)?;
    let sketch = last_sketch(cx.host)?;
    let r = cx.host.extrude(&Extrude {
        thin: Some(thickness),
        ..Extrude::new_body(sketch, distance)
    })?;
    Ok(report(r))
}

pub fn revolve_profile(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let angle = args.number(0)?;
    let sketch = last_sketch(cx.host)?;
    let r = cx.host.revolve(sketch, angle)?;
    Ok(report(r))
}

/// Second-to-last sketch is the profile, the last sketch is the path.
pub fn sweep(cx: &mut HandlerContext<'_>, _args: &Args) -> HostResult<HandlerOutput> {
    let path = last_sketch(cx.host)?;
    let profile = path.checked_sub(1).ok_or_else(|| {
        HostError::feature("Sweep", "needs a profile sketch followed by a path sketch")
    })?;
    let r = cx.host.sweep(profile, path)?;
    Ok(report(r))
}

/// Lofts through the last `sketchcount` sketches, most recent first.
pub fn loft(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let count = args.index(0)?;
    let available = cx.host.sketch_count();
    if count < 2 {
        return Err(HostError::invalid("sketchcount", "a loft needs at least 2 sketches"));
    }
    if count > available {
        return Err(HostError::invalid(
            "sketchcount",
            format!("{count} sketches requested but the design has {available}"),
        ));
    }
    let sections: Vec<usize> = (available - count..available).rev().collect();
    let r = cx.host.loft(&sections)?;
    Ok(report(r))
}

pub fn cut_extrude(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let depth = args.number(0)?;
    let sketch = last_sketch(cx.host)?;
    let r = cx.host.extrude(&Extrude::cut(sketch, depth))?;
    Ok(output(json!({ "body": r.body, "volume_removed": r.volume })))
}

/// Cuts the last sketch into the bodies it overlaps. With a `face_index`, the
/// face must be a planar face of the last body and only that body is cut.
pub fn pocket_recess(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let depth = args.number(0)?.abs();
    let face = args.opt_integer(1)?;
    let target = match face {
        None => {
            last_body(cx.host)?;
            None
        }
        Some(face) => {
            let body = last_body(cx.host)?;
            let face = usize::try_from(face).map_err(|_| {
                HostError::invalid("face_index", format!("must not be negative, got {face}"))
            })?;
            let faces = cx.host.faces(body)?;
            let info = faces.get(face).ok_or(HostError::FaceOutOfRange {
                body,
                index: face,
                count: faces.len(),
            })?;
            if info.kind != SurfaceKind::Plane {
                return Err(HostError::NonPlanarFace { body, face });
            }
            Some(body)
        }
    };
    let sketch = last_sketch(cx.host)?;
    let r = cx.host.extrude(&Extrude {
        target,
        ..Extrude::cut(sketch, depth)
    })?;
    Ok(output(json!({ "body": r.body, "volume_removed": r.volume })))
}

/// Cuts one sketch into exactly one body and reports the volume change.
pub fn pocket_recess_safe(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let body = args.index(0)?;
    let sketch = args.index(1)?;
    let depth = args.number(2)?.abs();

    let before = body_volume(cx.host, body)?;
    let body_count = cx.host.bodies().len();
    let sketches = cx.host.sketch_count();
    if sketch >= sketches {
        return Err(HostError::SketchOutOfRange {
            index: sketch,
            count: sketches,
        });
    }
    let info = cx.host.sketch_info(sketch)?;
    if info.profile_count == 0 {
        return Err(HostError::NoProfile { sketch });
    }

    let r = cx.host.extrude(&Extrude {
        target: Some(body),
        ..Extrude::cut(sketch, depth)
    })?;
    // A cut that empties the body removes it.
    let after = if cx.host.bodies().len() == body_count {
        body_volume(cx.host, body)?
    } else {
        0.0
    };
    Ok(output(json!({
        "body_id": body,
        "sketch_id": sketch,
        "depth": depth,
        "volume_before": before,
        "volume_after": after,
        "volume_removed": r.volume,
    })))
}

pub fn fillet_edges(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let radius = args.number(0)?;
    let r = cx.host.fillet_edges(radius)?;
    if r.filleted == 0 && r.skipped > 0 {
        cx.host.alert(&format!(
            "No edge accepted a fillet of radius {radius}; {} edges skipped",
            r.skipped
        ));
    }
    Ok(output(json!({ "filleted": r.filleted, "skipped": r.skipped })))
}

/// Shells the first body.
pub fn shell_body(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let thickness = positive("thickness", args.number(0)?)?;
    let face = args.index(1)?;
    last_body(cx.host)?;
    cx.host.shell(0, face, thickness)?;
    Ok(output(json!({ "body": 0, "removed_face": face, "thickness": thickness })))
}

/// Holes on a planar face of the last body. Without a depth the holes are
/// 1 cm deep unless `through` is set.
pub fn holes(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let points: Vec<Point2> = args
        .points(0)?
        .into_iter()
        .map(|p| Point2::new(p[0], p[1]))
        .collect();
    let diameter = args.number(1)?;
    let through = args.boolean(3)?;
    let depth = if through {
        None
    } else {
        Some(args.opt_number(2)?.unwrap_or(1.0))
    };
    let face = args.index(4)?;
    let body = last_body(cx.host)?;
    let count = cx.host.hole(&HoleSpec {
        body,
        face,
        points,
        diameter,
        depth,
    })?;
    Ok(output(json!({ "body": body, "face": face, "holes": count })))
}

pub fn threaded(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let inside = args.boolean(0)?;
    let size_index = args.index(1)?;
    let designation = cx.host.thread(ThreadSpec { inside, size_index })?;
    Ok(output(json!({ "thread": designation })))
}
