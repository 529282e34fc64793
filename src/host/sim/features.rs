//! Modelling operations of the simulated host.
//!
//! Volumes are estimates: cuts remove the overlap of the profile's slab with
//! the body's bounding box, scaled by how much of each box is filled.

use std::f64::consts::{PI, TAU};

use crate::host::{
    Axis, BooleanOp, BoundingBox, Extrude, ExtrudeOperation, FaceInfo, FeatureReport,
    FilletReport, HoleSpec, HostError, HostResult, Pattern, Plane, PlaneDefinition, Point2,
    SketchCurve, SketchTarget, SurfaceKind, ThreadSpec, Vec3,
};

use super::model::{overlap, translate, union, volume_of, AxisDir, Body, Frame, Model, Shape};
use super::profile::{self, Profile, ProfileKind};

const EPS: f64 = 1e-9;

/// Inch thread sizes offered by the host's first thread type.
pub const THREAD_SIZES: [&str; 23] = [
    "1/4", "5/16", "3/8", "7/16", "1/2", "5/8", "3/4", "7/8", "1", "1 1/8", "1 1/4", "1 3/8",
    "1 1/2", "1 3/4", "2", "2 1/4", "2 1/2", "2 3/4", "3", "3 1/2", "4", "4 1/2", "5",
];

impl Model {
    pub fn create_sketch(&mut self, target: SketchTarget) -> HostResult<usize> {
        let frame = match target {
            SketchTarget::Plane { plane, offset } => {
                let frame = Frame::origin(plane, offset);
                if offset.abs() > EPS {
                    self.push_plane(frame);
                }
                frame
            }
            SketchTarget::Face { body, face } => self.planar_face_frame(body, face)?,
        };
        Ok(self.push_sketch(frame))
    }

    pub fn add_curve(&mut self, sketch: usize, curve: SketchCurve) -> HostResult<()> {
        profile::validate(&curve)?;
        let count = self.sketches.len();
        let target = self
            .sketches
            .get_mut(sketch)
            .ok_or(HostError::SketchOutOfRange {
                index: sketch,
                count,
            })?;
        target.curves.push(curve);
        Ok(())
    }

    pub fn create_construction_plane(&mut self, definition: PlaneDefinition) -> HostResult<usize> {
        let frame = match definition {
            PlaneDefinition::Offset { plane, distance } => Frame::origin(plane, distance),
            PlaneDefinition::FaceOffset {
                body,
                face,
                distance,
            } => {
                let mut frame = self.planar_face_frame(body, face)?;
                frame.level += frame.normal.sign * distance;
                frame
            }
        };
        Ok(self.push_plane(frame))
    }

    /// Projects the body's outline into the sketch as a rectangle.
    pub fn project_body_edges(&mut self, sketch: usize, body: usize) -> HostResult<usize> {
        let (bounds, edges) = {
            let b = self.body(body)?;
            (b.bounds, b.edges)
        };
        let frame = self.sketch(sketch)?.frame;
        let min = frame.to_local(bounds.min);
        let max = frame.to_local(bounds.max);

        let curve = if (max.x - min.x).abs() > EPS && (max.y - min.y).abs() > EPS {
            SketchCurve::Rectangle {
                corner: min,
                opposite: max,
            }
        } else if min.distance(max) > EPS {
            SketchCurve::Line {
                start: min,
                end: max,
            }
        } else {
            return Err(HostError::feature(
                "Project",
                "body projects to a single point on this sketch plane",
            ));
        };
        self.add_curve(sketch, curve)?;
        Ok(edges)
    }

    pub fn extrude(&mut self, spec: &Extrude) -> HostResult<FeatureReport> {
        if spec.distance.abs() < EPS {
            return Err(HostError::invalid("distance", "must not be zero"));
        }
        let sketch = self.sketch(spec.sketch)?;
        let frame = sketch.frame;
        let profile = sketch.first_profile(spec.sketch)?;
        match spec.operation {
            ExtrudeOperation::NewBody => self.extrude_body(frame, &profile, spec),
            ExtrudeOperation::Cut => self.extrude_cut(frame, &profile, spec),
        }
    }

    fn extrude_body(
        &mut self,
        frame: Frame,
        profile: &Profile,
        spec: &Extrude,
    ) -> HostResult<FeatureReport> {
        let length = spec.distance.abs();
        let axis = if spec.distance > 0.0 {
            frame.normal
        } else {
            frame.normal.flipped()
        };
        let end = frame.normal.sign.mul_add(spec.distance, frame.level);

        let (bounds, volume, shape, edges) = if let Some(thickness) = spec.thin {
            if thickness <= 0.0 {
                return Err(HostError::invalid("thickness", "must be positive"));
            }
            let half = thickness / 2.0;
            let min = Point2::new(profile.min.x - half, profile.min.y - half);
            let max = Point2::new(profile.max.x + half, profile.max.y + half);
            (
                frame.slab(min, max, frame.level, end),
                profile.perimeter * thickness * length,
                Shape::Capped { axis },
                4,
            )
        } else {
            let scale = taper_scale(profile, length, spec.taper_deg)?;
            let volume = profile.area * length * (1.0 + scale + scale * scale) / 3.0;
            let bounds = if scale > 1.0 {
                let grow = Point2::new(
                    (profile.max.x - profile.min.x) * (scale - 1.0) / 2.0,
                    (profile.max.y - profile.min.y) * (scale - 1.0) / 2.0,
                );
                frame.slab(
                    Point2::new(profile.min.x - grow.x, profile.min.y - grow.y),
                    Point2::new(profile.max.x + grow.x, profile.max.y + grow.y),
                    frame.level,
                    end,
                )
            } else {
                frame.slab(profile.min, profile.max, frame.level, end)
            };
            let tapered = spec.taper_deg.abs() > EPS;
            let (shape, edges) = match profile.kind {
                ProfileKind::Circle if !tapered => (Shape::Cylinder { axis }, 2),
                ProfileKind::Polygon { edges: 4 } if profile.is_rectangle() && !tapered => {
                    (Shape::Block { axis }, 12)
                }
                ProfileKind::Polygon { edges } => (Shape::Capped { axis }, 3 * edges),
                _ => (Shape::Capped { axis }, 2),
            };
            (bounds, volume, shape, edges)
        };

        let body = self.push_body(bounds, volume, shape, edges);
        self.push_parameter(length, "cm");
        if spec.taper_deg.abs() > EPS {
            self.push_parameter(spec.taper_deg, "deg");
        }
        Ok(FeatureReport { body, volume })
    }

    /// Removes material within `depth` on both sides of the sketch plane.
    fn extrude_cut(
        &mut self,
        frame: Frame,
        profile: &Profile,
        spec: &Extrude,
    ) -> HostResult<FeatureReport> {
        if self.bodies.is_empty() {
            return Err(HostError::NoBodies);
        }
        let depth = spec.distance.abs();
        let slab = frame.slab(
            profile.min,
            profile.max,
            frame.level - depth,
            frame.level + depth,
        );
        let targets: Vec<usize> = match spec.target {
            Some(index) => {
                self.body(index)?;
                vec![index]
            }
            None => (0..self.bodies.len()).collect(),
        };

        let axis = frame.normal.axis;
        let mut removed_total = 0.0;
        let mut first_touched = None;
        let mut emptied = Vec::new();

        for index in targets {
            let body = &mut self.bodies[index];
            if matches!(body.shape, Shape::Sheet { .. }) {
                continue;
            }
            let Some(shared) = overlap(&body.bounds, &slab) else {
                continue;
            };
            let removed = (volume_of(&shared) * profile.fill() * body.fill()).min(body.volume);
            if removed <= EPS {
                continue;
            }
            body.volume -= removed;

            let opens_below = frame.level >= shared.max[axis] - EPS;
            let opens_above = frame.level <= shared.min[axis] + EPS;
            let through = (shared.max[axis] - shared.min[axis])
                >= body.bounds.size()[axis] - EPS;
            if !through && (opens_below || opens_above) {
                let mut centroid = frame.to_world(profile.centroid);
                let (level, sign) = if opens_below {
                    (shared.min[axis], 1.0)
                } else {
                    (shared.max[axis], -1.0)
                };
                centroid[axis] = level;
                body.extra_faces.push(FaceInfo {
                    index: 0,
                    kind: SurfaceKind::Plane,
                    area: profile.area,
                    centroid,
                    normal: Some(AxisDir::new(axis, sign).vector()),
                });
            }
            let wall = if profile.kind == ProfileKind::Circle {
                SurfaceKind::Cylinder
            } else {
                SurfaceKind::Freeform
            };
            body.extra_faces.push(FaceInfo {
                index: 0,
                kind: wall,
                area: profile.perimeter * (shared.max[axis] - shared.min[axis]),
                centroid: shared.center(),
                normal: None,
            });

            if body.volume <= EPS {
                emptied.push(index);
            }
            removed_total += removed;
            first_touched.get_or_insert(index);
        }

        let Some(body) = first_touched else {
            return Err(HostError::NoIntersection);
        };
        for index in emptied.into_iter().rev() {
            self.bodies.remove(index);
        }
        self.push_parameter(depth, "cm");
        Ok(FeatureReport {
            body,
            volume: removed_total,
        })
    }

    pub fn revolve(&mut self, sketch: usize, angle_deg: f64) -> HostResult<FeatureReport> {
        if angle_deg <= 0.0 || angle_deg > 360.0 {
            return Err(HostError::invalid("angle", "must be in (0, 360]"));
        }
        let s = self.sketch(sketch)?;
        let frame = s.frame;
        let profile = s.first_profile(sketch)?;
        let (a, b) = profile::first_line(&s.curves)
            .ok_or_else(|| HostError::feature("Revolve", "sketch has no line to use as the axis"))?;

        let len = a.distance(b);
        let dir = Point2::new((b.x - a.x) / len, (b.y - a.y) / len);
        let perpendicular = |p: Point2| dir.x.mul_add(p.y - a.y, -(dir.y * (p.x - a.x)));
        let along = |p: Point2| dir.x.mul_add(p.x - a.x, dir.y * (p.y - a.y));

        let corners = [
            profile.min,
            profile.max,
            Point2::new(profile.min.x, profile.max.y),
            Point2::new(profile.max.x, profile.min.y),
        ];
        let reach = corners
            .iter()
            .map(|&c| perpendicular(c).abs())
            .fold(0.0, f64::max);
        let (t0, t1) = corners.iter().map(|&c| along(c)).fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(lo, hi), t| (lo.min(t), hi.max(t)),
        );

        let fraction = angle_deg / 360.0;
        let offset = perpendicular(profile.centroid).abs();
        let full = (angle_deg - 360.0).abs() < EPS;
        let (volume, shape) = if offset < 1e-6 {
            // The axis halves the profile; one half sweeps the solid.
            let volume = profile.area * 4.0 / 3.0 * reach * fraction;
            let shape = if profile.kind == ProfileKind::Circle && full {
                Shape::Sphere
            } else {
                Shape::Freeform
            };
            (volume, shape)
        } else {
            (profile.area * TAU * offset * fraction, Shape::Freeform)
        };

        let origin = frame.to_world(a);
        let mut axis3 = [0.0; 3];
        axis3[frame.u] = dir.x;
        axis3[frame.v] = dir.y;
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];
        for k in 0..3 {
            let p0 = axis3[k].mul_add(t0, origin[k]);
            let p1 = axis3[k].mul_add(t1, origin[k]);
            let spread = reach * axis3[k].mul_add(-axis3[k], 1.0).max(0.0).sqrt();
            min[k] = p0.min(p1) - spread;
            max[k] = p0.max(p1) + spread;
        }

        let body = self.push_body(BoundingBox { min, max }, volume, shape, 0);
        self.push_parameter(angle_deg, "deg");
        Ok(FeatureReport { body, volume })
    }

    pub fn sweep(&mut self, profile_sketch: usize, path_sketch: usize) -> HostResult<FeatureReport> {
        let ps = self.sketch(profile_sketch)?;
        let profile = ps.first_profile(profile_sketch)?;
        let path = self.sketch(path_sketch)?;
        if path.curves.is_empty() {
            return Err(HostError::feature("Sweep", "path sketch has no curves"));
        }
        let length: f64 = path.curves.iter().map(profile::length).sum();
        if length < EPS {
            return Err(HostError::feature("Sweep", "path has zero length"));
        }

        let mut points: Vec<Vec3> = path
            .curves
            .iter()
            .flat_map(profile::sample_points)
            .map(|p| path.frame.to_world(p))
            .collect();
        points.push(ps.frame.to_world(profile.centroid));
        let reach = profile.reach();
        let mut bounds = bounds_of(&points);
        for k in 0..3 {
            bounds.min[k] -= reach;
            bounds.max[k] += reach;
        }

        let volume = profile.area * length;
        let body = self.push_body(bounds, volume, Shape::Freeform, 2);
        Ok(FeatureReport { body, volume })
    }

    pub fn loft(&mut self, sketches: &[usize]) -> HostResult<FeatureReport> {
        if sketches.len() < 2 {
            return Err(HostError::invalid(
                "sketchcount",
                "a loft needs at least 2 sections",
            ));
        }
        let mut sections = Vec::with_capacity(sketches.len());
        for &index in sketches {
            let s = self.sketch(index)?;
            sections.push((s.frame, s.first_profile(index)?));
        }

        let mut volume = 0.0;
        let mut bounds: Option<BoundingBox> = None;
        for (i, (frame, profile)) in sections.iter().enumerate() {
            let footprint = frame.slab(profile.min, profile.max, frame.level, frame.level);
            bounds = Some(bounds.map_or(footprint, |b| union(&b, &footprint)));
            if let Some((next_frame, next)) = sections.get(i + 1) {
                let c0 = frame.to_world(profile.centroid);
                let c1 = next_frame.to_world(next.centroid);
                let h = ((c1[0] - c0[0]).powi(2) + (c1[1] - c0[1]).powi(2) + (c1[2] - c0[2]).powi(2))
                    .sqrt();
                if h < EPS {
                    return Err(HostError::feature("Loft", "sections are coplanar"));
                }
                volume += h / 3.0 * (profile.area + next.area + (profile.area * next.area).sqrt());
            }
        }
        let Some(bounds) = bounds else {
            return Err(HostError::feature("Loft", "no sections"));
        };

        let first = sections[0].0;
        let last = sections[sections.len() - 1].0;
        let parallel = sections
            .iter()
            .all(|(f, _)| f.normal.axis == first.normal.axis);
        let shape = if parallel {
            let sign = if last.level >= first.level { 1.0 } else { -1.0 };
            Shape::Capped {
                axis: AxisDir::new(first.normal.axis, sign),
            }
        } else {
            Shape::Freeform
        };

        let body = self.push_body(bounds, volume, shape, 2);
        Ok(FeatureReport { body, volume })
    }

    pub fn fillet_edges(&mut self, radius: f64) -> HostResult<FilletReport> {
        if radius <= 0.0 {
            return Err(HostError::invalid("radius", "must be positive"));
        }
        let mut report = FilletReport {
            filleted: 0,
            skipped: 0,
        };
        for body in &mut self.bodies {
            if body.edges == 0 {
                continue;
            }
            let size = body.bounds.size();
            let thinnest = size.iter().copied().fold(f64::INFINITY, f64::min);
            if body.filleted || radius * 2.0 >= thinnest {
                report.skipped += body.edges;
                continue;
            }
            let edge_length = match body.shape {
                Shape::Block { .. } => 4.0 * (size[0] + size[1] + size[2]),
                #[allow(clippy::cast_precision_loss)]
                _ => body.edges as f64 * (size[0] + size[1] + size[2]) / 3.0,
            };
            let removed = (1.0 - PI / 4.0) * radius * radius * edge_length;
            body.volume = (body.volume - removed).max(EPS);
            body.filleted = true;
            #[allow(clippy::cast_precision_loss)]
            let face_area = PI / 2.0 * radius * edge_length / body.edges as f64;
            let center = body.bounds.center();
            body.extra_faces.extend((0..body.edges).map(|_| FaceInfo {
                index: 0,
                kind: SurfaceKind::Cylinder,
                area: face_area,
                centroid: center,
                normal: None,
            }));
            report.filleted += body.edges;
        }
        if report.filleted > 0 {
            self.push_parameter(radius, "cm");
        }
        Ok(report)
    }

    pub fn shell(&mut self, body: usize, face: usize, thickness: f64) -> HostResult<()> {
        if thickness <= 0.0 {
            return Err(HostError::invalid("thickness", "must be positive"));
        }
        let opened = self.face(body, face)?;
        let open_axis = opened
            .normal
            .and_then(|n| (0..3).find(|&k| (n[k].abs() - 1.0).abs() < 1e-6));
        let b = self.body_mut(body)?;
        if matches!(b.shape, Shape::Sheet { .. }) {
            return Err(HostError::feature("Shell", "cannot shell a surface body"));
        }

        let size = b.bounds.size();
        let mut inner = 1.0;
        for (k, extent) in size.iter().enumerate() {
            let walls = if open_axis == Some(k) {
                thickness
            } else {
                2.0 * thickness
            };
            let ratio = (extent - walls) / extent;
            if ratio <= 0.0 {
                return Err(HostError::feature(
                    "Shell",
                    format!("thickness {thickness} is too large for the body"),
                ));
            }
            inner *= ratio;
        }
        b.volume -= b.volume * inner;
        let center = b.bounds.center();
        b.extra_faces.push(FaceInfo {
            index: 0,
            kind: SurfaceKind::Freeform,
            area: opened.area,
            centroid: center,
            normal: None,
        });
        self.push_parameter(thickness, "cm");
        Ok(())
    }

    pub fn hole(&mut self, spec: &HoleSpec) -> HostResult<usize> {
        if spec.diameter <= 0.0 {
            return Err(HostError::invalid("width", "hole diameter must be positive"));
        }
        if spec.points.is_empty() {
            return Err(HostError::invalid(
                "points",
                "at least one hole position is required",
            ));
        }
        if spec.depth.is_some_and(|d| d <= 0.0) {
            return Err(HostError::invalid("depth", "must be positive"));
        }
        let frame = self.planar_face_frame(spec.body, spec.face)?;
        let b = self.body_mut(spec.body)?;
        let axis = frame.normal.axis;
        let extent = b.bounds.size()[axis];
        let depth = spec.depth.map_or(extent, |d| d.min(extent));
        let radius = spec.diameter / 2.0;

        let lo = frame.to_local(b.bounds.min);
        let hi = frame.to_local(b.bounds.max);
        for p in &spec.points {
            if p.x < lo.x - EPS || p.x > hi.x + EPS || p.y < lo.y - EPS || p.y > hi.y + EPS {
                return Err(HostError::feature(
                    "Hole",
                    format!("hole at ({}, {}) lies outside face {}", p.x, p.y, spec.face),
                ));
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let removed = PI * radius * radius * depth * b.fill() * spec.points.len() as f64;
        if removed >= b.volume {
            return Err(HostError::feature(
                "Hole",
                "holes would remove the entire body",
            ));
        }
        b.volume -= removed;
        for p in &spec.points {
            let mut centroid = frame.to_world(*p);
            centroid[axis] -= frame.normal.sign * depth / 2.0;
            b.extra_faces.push(FaceInfo {
                index: 0,
                kind: SurfaceKind::Cylinder,
                area: TAU * radius * depth,
                centroid,
                normal: None,
            });
        }
        self.push_parameter(spec.diameter, "cm");
        Ok(spec.points.len())
    }

    pub fn thread(&mut self, spec: ThreadSpec) -> HostResult<String> {
        let size = THREAD_SIZES.get(spec.size_index).ok_or_else(|| {
            HostError::invalid(
                "allsizes",
                format!(
                    "thread size index {} out of range (0..{})",
                    spec.size_index,
                    THREAD_SIZES.len()
                ),
            )
        })?;
        let body = self
            .bodies
            .iter_mut()
            .rev()
            .find(|b| b.faces().iter().any(|f| f.kind == SurfaceKind::Cylinder))
            .ok_or_else(|| HostError::feature("Thread", "no cylindrical face to thread"))?;
        let designation = format!(
            "{size} UNC {}",
            if spec.inside { "internal" } else { "external" }
        );
        body.threads.push(designation.clone());
        Ok(designation)
    }

    pub fn combine(&mut self, target: usize, tool: usize, op: BooleanOp) -> HostResult<FeatureReport> {
        if target == tool {
            return Err(HostError::invalid(
                "operation",
                "target and tool body must differ",
            ));
        }
        let t = self.body(target)?.clone();
        let k = self.body(tool)?.clone();
        let common = overlap(&t.bounds, &k.bounds);
        let shared = common
            .map_or(0.0, |o| volume_of(&o) * t.fill() * k.fill())
            .min(t.volume)
            .min(k.volume);

        let (volume, bounds) = match op {
            BooleanOp::Join => (t.volume + k.volume - shared, union(&t.bounds, &k.bounds)),
            BooleanOp::Cut => {
                if shared <= EPS {
                    return Err(HostError::NoIntersection);
                }
                (t.volume - shared, t.bounds)
            }
            BooleanOp::Intersect => match common {
                Some(o) if shared > EPS => (shared, o),
                _ => return Err(HostError::NoIntersection),
            },
        };

        let b = &mut self.bodies[target];
        b.volume = volume;
        b.bounds = bounds;
        b.edges += k.edges;
        if op == BooleanOp::Cut {
            b.extra_faces.push(FaceInfo {
                index: 0,
                kind: SurfaceKind::Freeform,
                area: 0.0,
                centroid: k.bounds.center(),
                normal: None,
            });
        }
        self.bodies.remove(tool);
        let body = if tool < target { target - 1 } else { target };
        Ok(FeatureReport { body, volume })
    }

    pub fn move_body(&mut self, body: usize, delta: Vec3) -> HostResult<()> {
        let b = self.body_mut(body)?;
        b.bounds = translate(&b.bounds, delta);
        for face in &mut b.extra_faces {
            for (c, d) in face.centroid.iter_mut().zip(delta) {
                *c += d;
            }
        }
        Ok(())
    }

    pub fn mirror_body(&mut self, body: usize, plane: Plane) -> HostResult<usize> {
        let src = self.body(body)?.clone();
        let k = Frame::origin(plane, 0.0).normal.axis;
        let mut bounds = src.bounds;
        bounds.min[k] = -src.bounds.max[k];
        bounds.max[k] = -src.bounds.min[k];
        let shape = match src.shape {
            Shape::Block { axis } if axis.axis == k => Shape::Block {
                axis: axis.flipped(),
            },
            Shape::Cylinder { axis } if axis.axis == k => Shape::Cylinder {
                axis: axis.flipped(),
            },
            Shape::Capped { axis } if axis.axis == k => Shape::Capped {
                axis: axis.flipped(),
            },
            other => other,
        };
        let index = self.push_body(bounds, src.volume, shape, src.edges);
        let copy = &mut self.bodies[index];
        copy.extra_faces = src
            .extra_faces
            .iter()
            .map(|f| {
                let mut f = f.clone();
                f.centroid[k] = -f.centroid[k];
                if let Some(n) = f.normal.as_mut() {
                    n[k] = -n[k];
                }
                f
            })
            .collect();
        Ok(index)
    }

    pub fn pattern_body(&mut self, body: usize, pattern: Pattern) -> HostResult<usize> {
        let src = self.body(body)?.clone();
        match pattern {
            Pattern::Circular { axis, quantity } => {
                if quantity == 0 {
                    return Err(HostError::invalid("quantity", "must be at least 1"));
                }
                for i in 1..quantity {
                    let angle = TAU * f64::from(i) / f64::from(quantity);
                    let (bounds, shape) = rotated(&src, axis, angle);
                    self.push_body(bounds, src.volume, shape, src.edges);
                }
                Ok(quantity as usize - 1)
            }
            Pattern::Rectangular { first, second } => {
                let (a1, q1, d1) = first;
                let (a2, q2, d2) = second;
                if q1 == 0 || q2 == 0 {
                    return Err(HostError::invalid("quantity", "must be at least 1"));
                }
                let mut created = 0;
                for i in 0..q1 {
                    for j in 0..q2 {
                        if i == 0 && j == 0 {
                            continue;
                        }
                        let mut delta = [0.0; 3];
                        delta[a1.index()] += f64::from(i) * d1;
                        delta[a2.index()] += f64::from(j) * d2;
                        let index = self.push_body(
                            translate(&src.bounds, delta),
                            src.volume,
                            src.shape.clone(),
                            src.edges,
                        );
                        self.move_extra_faces_from(&src, index, delta);
                        created += 1;
                    }
                }
                Ok(created)
            }
        }
    }

    fn move_extra_faces_from(&mut self, src: &Body, index: usize, delta: Vec3) {
        let copy = &mut self.bodies[index];
        copy.extra_faces = src
            .extra_faces
            .iter()
            .map(|f| {
                let mut f = f.clone();
                for (c, d) in f.centroid.iter_mut().zip(delta) {
                    *c += d;
                }
                f
            })
            .collect();
    }

    pub fn offset_face(&mut self, body: usize, face: usize, distance: f64) -> HostResult<usize> {
        let info = self.face(body, face)?;
        let src = self.body(body)?.bounds;
        let bounds = if let Some(frame) = Frame::from_face(&info) {
            let level = frame.normal.sign.mul_add(distance, frame.level);
            let mut b = src;
            b.min[frame.normal.axis] = level;
            b.max[frame.normal.axis] = level;
            b
        } else {
            let mut b = src;
            for k in 0..3 {
                b.min[k] -= distance;
                b.max[k] += distance;
            }
            b
        };
        let shape = Shape::Sheet {
            kind: info.kind,
            normal: info.normal,
            area: info.area,
        };
        Ok(self.push_body(bounds, 0.0, shape, 0))
    }

    pub fn remove_body(&mut self, body: usize) -> HostResult<()> {
        self.body(body)?;
        self.bodies.remove(body);
        Ok(())
    }

    pub fn set_parameter_expression(&mut self, name: &str, expression: &str) -> HostResult<()> {
        let parameter = self
            .parameters
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| HostError::NotFound {
                kind: "Parameter",
                name: name.to_string(),
            })?;

        let mut tokens = expression.split_whitespace();
        let number: f64 = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| {
                HostError::invalid(
                    "value",
                    format!("expression '{expression}' is not a number with an optional unit"),
                )
            })?;
        let factor = match (parameter.unit.as_str(), tokens.next()) {
            (_, None) => 1.0,
            ("cm", Some("mm")) => 0.1,
            ("cm", Some("cm")) | ("deg", Some("deg")) => 1.0,
            ("cm", Some("m")) => 100.0,
            ("cm", Some("in")) => 2.54,
            (unit, Some(other)) => {
                return Err(HostError::invalid(
                    "value",
                    format!("unit '{other}' does not fit parameter unit '{unit}'"),
                ));
            }
        };
        parameter.value = number * factor;
        parameter.expression = expression.trim().to_string();
        Ok(())
    }
}

fn bounds_of(points: &[Vec3]) -> BoundingBox {
    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    for p in points {
        for k in 0..3 {
            min[k] = min[k].min(p[k]);
            max[k] = max[k].max(p[k]);
        }
    }
    BoundingBox { min, max }
}

/// Top-of-extrusion scale factor for a tapered extrusion.
fn taper_scale(profile: &Profile, length: f64, taper_deg: f64) -> HostResult<f64> {
    if taper_deg.abs() < EPS {
        return Ok(1.0);
    }
    if taper_deg.abs() >= 89.0 {
        return Err(HostError::invalid("taperangle", "must be between -89 and 89 degrees"));
    }
    let span = (profile.max.x - profile.min.x).min(profile.max.y - profile.min.y);
    let scale = 1.0 - 2.0 * length * taper_deg.to_radians().tan() / span;
    if scale <= 0.0 {
        return Err(HostError::feature(
            "Extrude",
            "taper closes the profile before reaching the distance",
        ));
    }
    Ok(scale)
}

/// Bounds and shape of a body rotated about a world axis through the origin.
fn rotated(src: &Body, axis: Axis, angle: f64) -> (BoundingBox, Shape) {
    let a = axis.index();
    let (i, j) = ((a + 1) % 3, (a + 2) % 3);
    let (sin, cos) = angle.sin_cos();
    let mut corners = Vec::with_capacity(8);
    for mask in 0..8u8 {
        let mut p = [0.0; 3];
        for (k, slot) in p.iter_mut().enumerate() {
            *slot = if mask & (1 << k) == 0 {
                src.bounds.min[k]
            } else {
                src.bounds.max[k]
            };
        }
        let (pi, pj) = (p[i], p[j]);
        p[i] = pi.mul_add(cos, -(pj * sin));
        p[j] = pi.mul_add(sin, pj * cos);
        corners.push(p);
    }
    let shape = match &src.shape {
        Shape::Sphere => Shape::Sphere,
        Shape::Block { axis: own } | Shape::Cylinder { axis: own } | Shape::Capped { axis: own }
            if own.axis == a =>
        {
            src.shape.clone()
        }
        _ => Shape::Freeform,
    };
    (bounds_of(&corners), shape)
}
