//! Read-only topology queries.

use std::cmp::Ordering;

use serde_json::json;

use super::output;
use crate::bridge::{Args, HandlerContext, HandlerOutput};
use crate::host::{FaceInfo, HostError, HostResult, SurfaceKind, Vec3};

/// Minimum alignment between a face normal and the requested direction.
const MIN_ALIGNMENT: f64 = 0.5;

fn direction_vector(direction: &str) -> Option<Vec3> {
    Some(match direction {
        "top" => [0.0, 0.0, 1.0],
        "bottom" => [0.0, 0.0, -1.0],
        "right" => [1.0, 0.0, 0.0],
        "left" => [-1.0, 0.0, 0.0],
        "back" => [0.0, 1.0, 0.0],
        "front" => [0.0, -1.0, 0.0],
        _ => return None,
    })
}

fn dot(a: Vec3, b: Vec3) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn list_bodies(cx: &mut HandlerContext<'_>, _args: &Args) -> HostResult<HandlerOutput> {
    let bodies = cx.host.bodies();
    Ok(output(json!({
        "count": bodies.len(),
        "bodies": bodies,
    })))
}

pub fn list_faces(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let body = args.index(0)?;
    let faces = cx.host.faces(body)?;
    Ok(output(json!({
        "body_id": body,
        "count": faces.len(),
        "faces": faces,
    })))
}

/// The planar face whose outward normal best matches a named direction.
/// Ties go to the larger face.
pub fn find_face(cx: &mut HandlerContext<'_>, args: &Args) -> HostResult<HandlerOutput> {
    let body = args.index(0)?;
    let direction = args.text(1)?.to_ascii_lowercase();
    let wanted = direction_vector(&direction).ok_or_else(|| {
        HostError::invalid(
            "direction",
            format!("unknown direction '{direction}', expected top, bottom, left, right, front or back"),
        )
    })?;

    let faces = cx.host.faces(body)?;
    let best = faces
        .iter()
        .filter(|f| f.kind == SurfaceKind::Plane)
        .filter_map(|f| f.normal.map(|n| (dot(n, wanted), f)))
        .filter(|(alignment, _)| *alignment >= MIN_ALIGNMENT)
        .max_by(|(a, fa), (b, fb)| {
            a.partial_cmp(b)
                .unwrap_or(Ordering::Equal)
                .then_with(|| fa.area.partial_cmp(&fb.area).unwrap_or(Ordering::Equal))
        })
        .map(|(_, f)| f);

    let face: &FaceInfo = best.ok_or_else(|| {
        HostError::feature(
            "Find face",
            format!("no planar face of body {body} points {direction}"),
        )
    })?;
    Ok(output(json!({
        "body_id": body,
        "direction": direction,
        "face_index": face.index,
        "area": face.area,
        "centroid": face.centroid,
        "normal": face.normal,
    })))
}
