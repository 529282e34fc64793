//! In-memory design state of the simulated host.
//!
//! All geometry is axis-aligned: sketch planes are origin planes or planar
//! faces whose normals follow a world axis, and bodies are tracked as a
//! bounding box, a volume and a coarse shape class.

use std::f64::consts::PI;

use crate::host::{
    BodyInfo, BoundingBox, FaceInfo, HostError, HostResult, ModelParameter, Plane, Point2,
    Selection, SketchCurve, SketchInfo, SurfaceKind, Vec3,
};

use super::profile::{self, Profile};

const EPS: f64 = 1e-9;

/// A world axis with a direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisDir {
    pub axis: usize,
    pub sign: f64,
}

impl AxisDir {
    pub const fn new(axis: usize, sign: f64) -> Self {
        Self { axis, sign }
    }

    pub fn vector(self) -> Vec3 {
        let mut v = [0.0; 3];
        v[self.axis] = self.sign;
        v
    }

    pub fn flipped(self) -> Self {
        Self::new(self.axis, -self.sign)
    }
}

/// A sketch coordinate system.
///
/// Sketch `x` maps to world axis `u`, sketch `y` to world axis `v`; the plane
/// sits at world coordinate `level` on the normal's axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub u: usize,
    pub v: usize,
    pub normal: AxisDir,
    pub level: f64,
}

impl Frame {
    /// Frame of an origin plane shifted by `offset` along its normal axis.
    pub const fn origin(plane: Plane, offset: f64) -> Self {
        match plane {
            Plane::Xy => Self {
                u: 0,
                v: 1,
                normal: AxisDir::new(2, 1.0),
                level: offset,
            },
            // X x Z points along -Y.
            Plane::Xz => Self {
                u: 0,
                v: 2,
                normal: AxisDir::new(1, -1.0),
                level: offset,
            },
            Plane::Yz => Self {
                u: 1,
                v: 2,
                normal: AxisDir::new(0, 1.0),
                level: offset,
            },
        }
    }

    /// Frame of a planar face, or `None` if the face is curved.
    pub fn from_face(face: &FaceInfo) -> Option<Self> {
        let normal = face.normal?;
        let axis = (0..3).find(|&k| (normal[k].abs() - 1.0).abs() < 1e-6)?;
        let (u, v) = match axis {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        Some(Self {
            u,
            v,
            normal: AxisDir::new(axis, normal[axis].signum()),
            level: face.centroid[axis],
        })
    }

    pub fn to_world(&self, p: Point2) -> Vec3 {
        let mut w = [0.0; 3];
        w[self.u] = p.x;
        w[self.v] = p.y;
        w[self.normal.axis] = self.level;
        w
    }

    pub fn to_local(&self, w: Vec3) -> Point2 {
        Point2::new(w[self.u], w[self.v])
    }

    /// World box of a sketch rectangle swept between two normal-axis levels.
    pub fn slab(&self, min: Point2, max: Point2, a: f64, b: f64) -> BoundingBox {
        let mut lo = [0.0; 3];
        let mut hi = [0.0; 3];
        lo[self.u] = min.x;
        hi[self.u] = max.x;
        lo[self.v] = min.y;
        hi[self.v] = max.y;
        lo[self.normal.axis] = a.min(b);
        hi[self.normal.axis] = a.max(b);
        BoundingBox { min: lo, max: hi }
    }
}

/// Coarse shape class; drives the face list.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Rectangular block extruded along `axis`.
    Block { axis: AxisDir },
    /// Circular cylinder along `axis`.
    Cylinder { axis: AxisDir },
    /// Sphere.
    Sphere,
    /// Planar caps at both ends of `axis`, free-form side.
    Capped { axis: AxisDir },
    /// Single free-form face.
    Freeform,
    /// Zero-thickness surface body.
    Sheet { kind: SurfaceKind, normal: Option<Vec3>, area: f64 },
}

/// A solid (or surface) body.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub name: String,
    pub bounds: BoundingBox,
    pub volume: f64,
    pub shape: Shape,
    pub edges: usize,
    pub filleted: bool,
    pub extra_faces: Vec<FaceInfo>,
    pub threads: Vec<String>,
}

impl Body {
    pub fn new(name: String, bounds: BoundingBox, volume: f64, shape: Shape, edges: usize) -> Self {
        Self {
            name,
            bounds,
            volume,
            shape,
            edges,
            filleted: false,
            extra_faces: Vec::new(),
            threads: Vec::new(),
        }
    }

    /// Share of the bounding box occupied by material.
    pub fn fill(&self) -> f64 {
        let v = volume_of(&self.bounds);
        if v <= EPS {
            return 0.0;
        }
        (self.volume / v).min(1.0)
    }

    pub fn info(&self, index: usize) -> BodyInfo {
        BodyInfo {
            index,
            name: self.name.clone(),
            volume: self.volume,
            bounding_box: self.bounds,
            face_count: self.faces().len(),
        }
    }

    /// Face list: end cap, start cap, sides, then faces added by later features.
    pub fn faces(&self) -> Vec<FaceInfo> {
        let b = &self.bounds;
        let size = b.size();
        let center = b.center();
        let mut out = Vec::new();

        match &self.shape {
            Shape::Block { axis } => {
                out.push(self.cap(*axis));
                out.push(self.cap(axis.flipped()));
                for k in (0..3).filter(|&k| k != axis.axis) {
                    out.push(box_face(b, AxisDir::new(k, -1.0)));
                    out.push(box_face(b, AxisDir::new(k, 1.0)));
                }
            }
            Shape::Cylinder { axis } => {
                out.push(self.cap(*axis));
                out.push(self.cap(axis.flipped()));
                let across: Vec<f64> = (0..3)
                    .filter(|&k| k != axis.axis)
                    .map(|k| size[k])
                    .collect();
                let radius = (across[0] + across[1]) / 4.0;
                out.push(face(
                    SurfaceKind::Cylinder,
                    2.0 * PI * radius * size[axis.axis],
                    center,
                    None,
                ));
            }
            Shape::Sphere => {
                let radius = size[0] / 2.0;
                out.push(face(SurfaceKind::Sphere, 4.0 * PI * radius * radius, center, None));
            }
            Shape::Capped { axis } => {
                out.push(self.cap(*axis));
                out.push(self.cap(axis.flipped()));
                let length = size[axis.axis];
                let side = (self.volume / length.max(EPS)).sqrt() * 4.0 * length;
                out.push(face(SurfaceKind::Freeform, side, center, None));
            }
            Shape::Freeform => {
                let area = 2.0 * (size[0] * size[1] + size[1] * size[2] + size[0] * size[2]);
                out.push(face(SurfaceKind::Freeform, area, center, None));
            }
            Shape::Sheet { kind, normal, area } => {
                out.push(face(*kind, *area, center, *normal));
            }
        }

        out.extend(self.extra_faces.iter().cloned());
        for (i, f) in out.iter_mut().enumerate() {
            f.index = i;
        }
        out
    }

    fn cap(&self, dir: AxisDir) -> FaceInfo {
        let size = self.bounds.size();
        let length = size[dir.axis];
        let area = if length > EPS {
            self.volume / length
        } else {
            0.0
        };
        let mut centroid = self.bounds.center();
        centroid[dir.axis] = if dir.sign > 0.0 {
            self.bounds.max[dir.axis]
        } else {
            self.bounds.min[dir.axis]
        };
        face(SurfaceKind::Plane, area, centroid, Some(dir.vector()))
    }
}

fn face(kind: SurfaceKind, area: f64, centroid: Vec3, normal: Option<Vec3>) -> FaceInfo {
    FaceInfo {
        index: 0,
        kind,
        area,
        centroid,
        normal,
    }
}

fn box_face(b: &BoundingBox, dir: AxisDir) -> FaceInfo {
    let size = b.size();
    let area: f64 = (0..3).filter(|&k| k != dir.axis).map(|k| size[k]).product();
    let mut centroid = b.center();
    centroid[dir.axis] = if dir.sign > 0.0 {
        b.max[dir.axis]
    } else {
        b.min[dir.axis]
    };
    face(SurfaceKind::Plane, area, centroid, Some(dir.vector()))
}

pub fn volume_of(b: &BoundingBox) -> f64 {
    b.size().iter().map(|s| s.max(0.0)).product()
}

/// Intersection of two boxes, if they overlap with positive volume.
pub fn overlap(a: &BoundingBox, b: &BoundingBox) -> Option<BoundingBox> {
    let mut min = [0.0; 3];
    let mut max = [0.0; 3];
    for k in 0..3 {
        min[k] = a.min[k].max(b.min[k]);
        max[k] = a.max[k].min(b.max[k]);
        if max[k] - min[k] <= EPS {
            return None;
        }
    }
    Some(BoundingBox { min, max })
}

pub fn union(a: &BoundingBox, b: &BoundingBox) -> BoundingBox {
    let mut out = *a;
    for k in 0..3 {
        out.min[k] = a.min[k].min(b.min[k]);
        out.max[k] = a.max[k].max(b.max[k]);
    }
    out
}

pub fn translate(b: &BoundingBox, delta: Vec3) -> BoundingBox {
    let mut out = *b;
    for k in 0..3 {
        out.min[k] += delta[k];
        out.max[k] += delta[k];
    }
    out
}

/// A sketch and its curves.
#[derive(Debug, Clone, PartialEq)]
pub struct Sketch {
    pub name: String,
    pub frame: Frame,
    pub curves: Vec<SketchCurve>,
}

impl Sketch {
    pub fn profiles(&self) -> Vec<Profile> {
        profile::profiles(&self.curves)
    }

    pub fn first_profile(&self, index: usize) -> HostResult<Profile> {
        self.profiles()
            .into_iter()
            .next()
            .ok_or(HostError::NoProfile { sketch: index })
    }

    pub fn info(&self, index: usize) -> SketchInfo {
        SketchInfo {
            index,
            name: self.name.clone(),
            curve_count: self.curves.len(),
            profile_count: self.profiles().len(),
        }
    }
}

/// Whole design state. Cloned for every undo step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub bodies: Vec<Body>,
    pub sketches: Vec<Sketch>,
    pub planes: Vec<Frame>,
    pub parameters: Vec<ModelParameter>,
    pub selection: Option<Selection>,
    body_serial: usize,
    sketch_serial: usize,
    param_serial: usize,
}

impl Model {
    pub fn body(&self, index: usize) -> HostResult<&Body> {
        self.bodies.get(index).ok_or(HostError::BodyOutOfRange {
            index,
            count: self.bodies.len(),
        })
    }

    pub fn body_mut(&mut self, index: usize) -> HostResult<&mut Body> {
        let count = self.bodies.len();
        self.bodies
            .get_mut(index)
            .ok_or(HostError::BodyOutOfRange { index, count })
    }

    pub fn sketch(&self, index: usize) -> HostResult<&Sketch> {
        self.sketches.get(index).ok_or(HostError::SketchOutOfRange {
            index,
            count: self.sketches.len(),
        })
    }

    pub fn face(&self, body: usize, index: usize) -> HostResult<FaceInfo> {
        let faces = self.body(body)?.faces();
        let count = faces.len();
        faces
            .into_iter()
            .nth(index)
            .ok_or(HostError::FaceOutOfRange { body, index, count })
    }

    pub fn planar_face_frame(&self, body: usize, face: usize) -> HostResult<Frame> {
        let info = self.face(body, face)?;
        Frame::from_face(&info).ok_or(HostError::NonPlanarFace { body, face })
    }

    pub fn push_body(&mut self, bounds: BoundingBox, volume: f64, shape: Shape, edges: usize) -> usize {
        self.body_serial += 1;
        let name = format!("Body{}", self.body_serial);
        self.bodies.push(Body::new(name, bounds, volume, shape, edges));
        self.bodies.len() - 1
    }

    pub fn push_sketch(&mut self, frame: Frame) -> usize {
        self.sketch_serial += 1;
        self.sketches.push(Sketch {
            name: format!("Sketch{}", self.sketch_serial),
            frame,
            curves: Vec::new(),
        });
        self.sketches.len() - 1
    }

    pub fn push_plane(&mut self, frame: Frame) -> usize {
        self.planes.push(frame);
        self.planes.len() - 1
    }

    /// Records a feature dimension as a model parameter (`d1`, `d2`, ...).
    pub fn push_parameter(&mut self, value: f64, unit: &str) {
        self.param_serial += 1;
        let expression = if unit.is_empty() {
            format!("{value}")
        } else {
            format!("{value} {unit}")
        };
        self.parameters.push(ModelParameter {
            name: format!("d{}", self.param_serial),
            value,
            unit: unit.to_string(),
            expression,
        });
    }
}
