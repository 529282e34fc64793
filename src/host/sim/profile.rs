//! Closed-profile detection for sketch curves.
//!
//! Closed curves (circles, ellipses, rectangles, polygons, text) are profiles
//! on their own. Open curves (lines, arcs, splines) are chained end to end;
//! a chain that returns to its start point forms a profile.

use std::f64::consts::{PI, TAU};

use crate::host::{HostError, HostResult, Point2, SketchCurve};

const EPS: f64 = 1e-9;
const JOIN_TOLERANCE: f64 = 1e-6;
const ARC_SEGMENTS: usize = 24;

/// Fraction of a text box covered by glyphs.
const TEXT_FILL: f64 = 0.4;

/// Broad classification used to pick the shape of a feature body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    /// A full circle.
    Circle,
    /// Straight edges only.
    Polygon {
        /// Number of edges.
        edges: usize,
    },
    /// Anything with curved edges.
    Curved,
}

/// A closed region in sketch coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub kind: ProfileKind,
    pub area: f64,
    pub perimeter: f64,
    pub centroid: Point2,
    pub min: Point2,
    pub max: Point2,
}

impl Profile {
    /// Share of the bounding rectangle covered by the region.
    pub fn fill(&self) -> f64 {
        let rect = (self.max.x - self.min.x) * (self.max.y - self.min.y);
        if rect <= EPS {
            return 0.0;
        }
        (self.area / rect).min(1.0)
    }

    /// Largest distance from the centroid to a bounding-box corner.
    pub fn reach(&self) -> f64 {
        [
            self.min,
            self.max,
            Point2::new(self.min.x, self.max.y),
            Point2::new(self.max.x, self.min.y),
        ]
        .iter()
        .map(|c| c.distance(self.centroid))
        .fold(0.0, f64::max)
    }

    /// Axis-aligned rectangle with straight edges only.
    pub fn is_rectangle(&self) -> bool {
        matches!(self.kind, ProfileKind::Polygon { edges: 4 }) && (self.fill() - 1.0).abs() < 1e-6
    }

    fn circle(center: Point2, radius: f64) -> Self {
        Self {
            kind: ProfileKind::Circle,
            area: PI * radius * radius,
            perimeter: TAU * radius,
            centroid: center,
            min: Point2::new(center.x - radius, center.y - radius),
            max: Point2::new(center.x + radius, center.y + radius),
        }
    }

    /// Builds a profile from a closed vertex loop (last vertex may repeat the first).
    fn from_loop(points: &[Point2], kind: ProfileKind) -> Option<Self> {
        let mut pts: Vec<Point2> = points.to_vec();
        if pts.len() > 1 && pts[0].distance(pts[pts.len() - 1]) < JOIN_TOLERANCE {
            pts.pop();
        }
        if pts.len() < 3 {
            return None;
        }

        let mut twice_area = 0.0;
        let mut cx = 0.0;
        let mut cy = 0.0;
        let mut perimeter = 0.0;
        for (i, a) in pts.iter().enumerate() {
            let b = pts[(i + 1) % pts.len()];
            let cross = a.x.mul_add(b.y, -(b.x * a.y));
            twice_area += cross;
            cx += (a.x + b.x) * cross;
            cy += (a.y + b.y) * cross;
            perimeter += a.distance(b);
        }
        if twice_area.abs() < EPS {
            return None;
        }
        let centroid = Point2::new(cx / (3.0 * twice_area), cy / (3.0 * twice_area));
        let (min, max) = bounds(&pts);

        Some(Self {
            kind,
            area: twice_area.abs() / 2.0,
            perimeter,
            centroid,
            min,
            max,
        })
    }
}

fn bounds(points: &[Point2]) -> (Point2, Point2) {
    let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    (min, max)
}

/// Rejects degenerate curves before they enter a sketch.
pub fn validate(curve: &SketchCurve) -> HostResult<()> {
    match curve {
        SketchCurve::Line { start, end } => {
            if start.distance(*end) < EPS {
                return Err(HostError::invalid("line", "start and end points coincide"));
            }
        }
        SketchCurve::Circle { radius, .. } => {
            if *radius <= 0.0 {
                return Err(HostError::invalid("radius", "must be positive"));
            }
        }
        SketchCurve::Arc {
            start,
            through,
            end,
        } => {
            arc_center(*start, *through, *end)?;
        }
        SketchCurve::Ellipse {
            center,
            major,
            through,
        } => {
            ellipse_axes(*center, *major, *through)?;
        }
        SketchCurve::Rectangle { corner, opposite } => {
            if (corner.x - opposite.x).abs() < EPS || (corner.y - opposite.y).abs() < EPS {
                return Err(HostError::invalid("rectangle", "corners must span an area"));
            }
        }
        SketchCurve::Polygon { radius, sides, .. } => {
            if *sides < 3 {
                return Err(HostError::invalid("sides", "a polygon needs at least 3 sides"));
            }
            if *radius <= 0.0 {
                return Err(HostError::invalid("radius", "must be positive"));
            }
        }
        SketchCurve::Spline { points } => {
            if points.len() < 2 {
                return Err(HostError::invalid("points", "a spline needs at least 2 points"));
            }
        }
        SketchCurve::Text {
            content,
            height,
            corner,
            opposite,
        } => {
            if content.is_empty() {
                return Err(HostError::invalid("text", "must not be empty"));
            }
            if *height <= 0.0 {
                return Err(HostError::invalid("thickness", "text height must be positive"));
            }
            if (corner.x - opposite.x).abs() < EPS || (corner.y - opposite.y).abs() < EPS {
                return Err(HostError::invalid("text", "text box must span an area"));
            }
        }
    }
    Ok(())
}

fn arc_center(p1: Point2, p2: Point2, p3: Point2) -> HostResult<(Point2, f64)> {
    let d = 2.0 * (p1.x * (p2.y - p3.y) + p2.x * (p3.y - p1.y) + p3.x * (p1.y - p2.y));
    if d.abs() < EPS {
        return Err(HostError::invalid("arc", "the three points are collinear"));
    }
    let s1 = p1.x.mul_add(p1.x, p1.y * p1.y);
    let s2 = p2.x.mul_add(p2.x, p2.y * p2.y);
    let s3 = p3.x.mul_add(p3.x, p3.y * p3.y);
    let ux = (s1 * (p2.y - p3.y) + s2 * (p3.y - p1.y) + s3 * (p1.y - p2.y)) / d;
    let uy = (s1 * (p3.x - p2.x) + s2 * (p1.x - p3.x) + s3 * (p2.x - p1.x)) / d;
    let center = Point2::new(ux, uy);
    Ok((center, center.distance(p1)))
}

/// Signed sweep from `start` to `end` passing through `through`.
fn arc_sweep(center: Point2, start: Point2, through: Point2, end: Point2) -> (f64, f64) {
    let angle = |p: Point2| (p.y - center.y).atan2(p.x - center.x);
    let a1 = angle(start);
    let ccw = (angle(end) - a1).rem_euclid(TAU);
    let mid = (angle(through) - a1).rem_euclid(TAU);
    let sweep = if mid <= ccw { ccw } else { ccw - TAU };
    (a1, sweep)
}

fn sample_arc(start: Point2, through: Point2, end: Point2) -> Vec<Point2> {
    let Ok((center, radius)) = arc_center(start, through, end) else {
        return vec![start, end];
    };
    let (a1, sweep) = arc_sweep(center, start, through, end);
    let mut points = Vec::with_capacity(ARC_SEGMENTS + 1);
    points.push(start);
    for i in 1..ARC_SEGMENTS {
        #[allow(clippy::cast_precision_loss)]
        let t = a1 + sweep * (i as f64) / (ARC_SEGMENTS as f64);
        points.push(Point2::new(
            radius.mul_add(t.cos(), center.x),
            radius.mul_add(t.sin(), center.y),
        ));
    }
    points.push(end);
    points
}

/// Semi-axes and rotation of an ellipse.
fn ellipse_axes(center: Point2, major: Point2, through: Point2) -> HostResult<(f64, f64, f64)> {
    let a = center.distance(major);
    if a < EPS {
        return Err(HostError::invalid("ellipse", "major axis point equals the centre"));
    }
    let ex = (major.x - center.x) / a;
    let ey = (major.y - center.y) / a;
    let tx = (through.x - center.x).mul_add(ex, (through.y - center.y) * ey);
    let ty = (through.y - center.y).mul_add(ex, -(through.x - center.x) * ey);
    let ratio = tx / a;
    if ratio.abs() >= 1.0 {
        return Err(HostError::invalid(
            "ellipse",
            "through point lies outside the major axis span",
        ));
    }
    let b = ty.abs() / ratio.mul_add(-ratio, 1.0).sqrt();
    if b < EPS {
        return Err(HostError::invalid("ellipse", "through point lies on the major axis"));
    }
    Ok((a, b, ey.atan2(ex)))
}

fn regular_polygon(center: Point2, radius: f64, sides: u32) -> Vec<Point2> {
    (0..sides)
        .map(|i| {
            let angle = TAU * f64::from(i) / f64::from(sides);
            Point2::new(
                radius.mul_add(angle.cos(), center.x),
                radius.mul_add(angle.sin(), center.y),
            )
        })
        .collect()
}

fn rectangle(corner: Point2, opposite: Point2) -> Vec<Point2> {
    vec![
        corner,
        Point2::new(opposite.x, corner.y),
        opposite,
        Point2::new(corner.x, opposite.y),
    ]
}

/// Profile of a curve that is closed on its own.
fn closed_profile(curve: &SketchCurve) -> Option<Profile> {
    match curve {
        SketchCurve::Circle { center, radius } => Some(Profile::circle(*center, *radius)),
        SketchCurve::Ellipse {
            center,
            major,
            through,
        } => {
            let (a, b, theta) = ellipse_axes(*center, *major, *through).ok()?;
            let (sin, cos) = theta.sin_cos();
            let hx = (a * cos).hypot(b * sin);
            let hy = (a * sin).hypot(b * cos);
            let h = 3.0f64.mul_add(a + b, -(3.0f64.mul_add(a, b) * 3.0f64.mul_add(b, a)).sqrt());
            Some(Profile {
                kind: ProfileKind::Curved,
                area: PI * a * b,
                perimeter: PI * h,
                centroid: *center,
                min: Point2::new(center.x - hx, center.y - hy),
                max: Point2::new(center.x + hx, center.y + hy),
            })
        }
        SketchCurve::Rectangle { corner, opposite } => Profile::from_loop(
            &rectangle(*corner, *opposite),
            ProfileKind::Polygon { edges: 4 },
        ),
        SketchCurve::Polygon {
            center,
            radius,
            sides,
        } => Profile::from_loop(
            &regular_polygon(*center, *radius, *sides),
            ProfileKind::Polygon {
                edges: *sides as usize,
            },
        ),
        SketchCurve::Text {
            content,
            height,
            corner,
            opposite,
        } => {
            let (min, max) = bounds(&[*corner, *opposite]);
            let box_area = (max.x - min.x) * (max.y - min.y);
            #[allow(clippy::cast_precision_loss)]
            let glyphs = content.chars().filter(|c| !c.is_whitespace()).count() as f64;
            Some(Profile {
                kind: ProfileKind::Curved,
                area: box_area * TEXT_FILL,
                perimeter: glyphs * 3.0 * height,
                centroid: Point2::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0),
                min,
                max,
            })
        }
        SketchCurve::Line { .. } | SketchCurve::Arc { .. } | SketchCurve::Spline { .. } => None,
    }
}

/// An open curve as a polyline, with a flag telling whether it is straight.
fn open_polyline(curve: &SketchCurve) -> Option<(Vec<Point2>, bool)> {
    match curve {
        SketchCurve::Line { start, end } => Some((vec![*start, *end], true)),
        SketchCurve::Arc {
            start,
            through,
            end,
        } => Some((sample_arc(*start, *through, *end), false)),
        SketchCurve::Spline { points } => Some((points.clone(), false)),
        _ => None,
    }
}

/// All closed profiles of a sketch, closed curves first.
pub fn profiles(curves: &[SketchCurve]) -> Vec<Profile> {
    let mut found: Vec<Profile> = curves.iter().filter_map(closed_profile).collect();

    let segments: Vec<(Vec<Point2>, bool)> = curves.iter().filter_map(open_polyline).collect();
    let mut used = vec![false; segments.len()];

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut chain = segments[start].0.clone();
        let mut straight = segments[start].1;
        let mut edges = 1;

        loop {
            let first = chain[0];
            let last = chain[chain.len() - 1];
            if chain.len() > 2 && first.distance(last) < JOIN_TOLERANCE {
                let kind = if straight {
                    ProfileKind::Polygon { edges }
                } else {
                    ProfileKind::Curved
                };
                if let Some(profile) = Profile::from_loop(&chain, kind) {
                    found.push(profile);
                }
                break;
            }

            let next = segments.iter().enumerate().find_map(|(j, (pts, _))| {
                if used[j] {
                    return None;
                }
                if pts[0].distance(last) < JOIN_TOLERANCE {
                    Some((j, false))
                } else if pts[pts.len() - 1].distance(last) < JOIN_TOLERANCE {
                    Some((j, true))
                } else {
                    None
                }
            });
            let Some((j, reversed)) = next else {
                break;
            };
            used[j] = true;
            edges += 1;
            straight &= segments[j].1;
            let mut pts = segments[j].0.clone();
            if reversed {
                pts.reverse();
            }
            chain.extend(pts.into_iter().skip(1));
        }
    }

    found
}

/// Length of a curve, used for sweep paths.
pub fn length(curve: &SketchCurve) -> f64 {
    if let Some((points, _)) = open_polyline(curve) {
        return points.windows(2).map(|w| w[0].distance(w[1])).sum();
    }
    closed_profile(curve).map_or(0.0, |p| p.perimeter)
}

/// Sample points of a curve, used for bounding boxes of swept paths.
pub fn sample_points(curve: &SketchCurve) -> Vec<Point2> {
    if let Some((points, _)) = open_polyline(curve) {
        return points;
    }
    closed_profile(curve).map_or_else(Vec::new, |p| vec![p.min, p.max])
}

/// The first straight line of a sketch, used as a revolve axis.
pub fn first_line(curves: &[SketchCurve]) -> Option<(Point2, Point2)> {
    curves.iter().find_map(|c| match c {
        SketchCurve::Line { start, end } => Some((*start, *end)),
        _ => None,
    })
}
