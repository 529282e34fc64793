//! Value types exchanged with a [`CadHost`](super::CadHost).
//!
//! Sketch geometry is expressed in sketch-local 2D coordinates. World-space
//! values (bounding boxes, centroids, normals, translations) use [`Vec3`].

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// A world-space vector or point `[x, y, z]`.
pub type Vec3 = [f64; 3];

/// One of the three origin construction planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Plane {
    /// The XY plane (normal along Z).
    #[serde(rename = "XY")]
    Xy,
    /// The XZ plane (normal along Y).
    #[serde(rename = "XZ")]
    Xz,
    /// The YZ plane (normal along X).
    #[serde(rename = "YZ")]
    Yz,
}

impl Plane {
    /// Returns the wire name (`"XY"`, `"XZ"`, `"YZ"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Xy => "XY",
            Self::Xz => "XZ",
            Self::Yz => "YZ",
        }
    }

    /// Splits a world point into the in-plane sketch coordinates and the
    /// offset of the plane holding it.
    ///
    /// XY keeps `(x, y)` with offset `z`; XZ keeps `(x, z)` with offset `y`;
    /// YZ keeps `(y, z)` with offset `x`.
    #[must_use]
    pub const fn split(self, x: f64, y: f64, z: f64) -> (Point2, f64) {
        match self {
            Self::Xy => (Point2::new(x, y), z),
            Self::Xz => (Point2::new(x, z), y),
            Self::Yz => (Point2::new(y, z), x),
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plane {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "XY" => Ok(Self::Xy),
            "XZ" => Ok(Self::Xz),
            "YZ" => Ok(Self::Yz),
            other => Err(format!("unknown plane '{other}', expected XY, XZ or YZ")),
        }
    }
}

/// A world axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Axis {
    /// The X axis.
    X,
    /// The Y axis.
    Y,
    /// The Z axis.
    Z,
}

impl Axis {
    /// Index of the axis in a [`Vec3`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

impl FromStr for Axis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "X" => Ok(Self::X),
            "Y" => Ok(Self::Y),
            "Z" => Ok(Self::Z),
            other => Err(format!("unknown axis '{other}', expected X, Y or Z")),
        }
    }
}

/// A point in sketch-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point2 {
    /// First in-plane coordinate.
    pub x: f64,
    /// Second in-plane coordinate.
    pub y: f64,
}

impl Point2 {
    /// Creates a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Where a new sketch is placed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SketchTarget {
    /// An origin plane, optionally shifted along its normal. A non-zero
    /// offset creates an offset construction plane first.
    Plane {
        /// Base plane.
        plane: Plane,
        /// Offset along the plane's normal axis.
        offset: f64,
    },
    /// A planar face of a body.
    Face {
        /// Body index.
        body: usize,
        /// Face index within the body.
        face: usize,
    },
}

/// A curve added to a sketch.
#[derive(Debug, Clone, PartialEq)]
pub enum SketchCurve {
    /// Straight line between two points.
    Line {
        /// Start point.
        start: Point2,
        /// End point.
        end: Point2,
    },
    /// Circle by centre and radius.
    Circle {
        /// Centre point.
        center: Point2,
        /// Radius.
        radius: f64,
    },
    /// Arc through three points.
    Arc {
        /// Start point.
        start: Point2,
        /// A point on the arc between start and end.
        through: Point2,
        /// End point.
        end: Point2,
    },
    /// Ellipse by centre, a point on the major axis and a point on the curve.
    Ellipse {
        /// Centre point.
        center: Point2,
        /// End of the major axis.
        major: Point2,
        /// Any other point on the ellipse.
        through: Point2,
    },
    /// Axis-aligned rectangle by two opposite corners.
    Rectangle {
        /// First corner.
        corner: Point2,
        /// Opposite corner.
        opposite: Point2,
    },
    /// Regular polygon by circumradius.
    Polygon {
        /// Centre point.
        center: Point2,
        /// Circumradius.
        radius: f64,
        /// Number of sides.
        sides: u32,
    },
    /// Fitted spline through the given points.
    Spline {
        /// Fit points.
        points: Vec<Point2>,
    },
    /// Multi-line text inside a box.
    Text {
        /// The text.
        content: String,
        /// Character height.
        height: f64,
        /// First corner of the text box.
        corner: Point2,
        /// Opposite corner of the text box.
        opposite: Point2,
    },
}

/// Summary of a sketch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SketchInfo {
    /// Sketch index.
    pub index: usize,
    /// Sketch name.
    pub name: String,
    /// Number of curves.
    pub curve_count: usize,
    /// Number of closed profiles.
    pub profile_count: usize,
}

/// How a construction plane is defined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaneDefinition {
    /// Offset from an origin plane.
    Offset {
        /// Base plane.
        plane: Plane,
        /// Offset distance.
        distance: f64,
    },
    /// Offset from a planar body face.
    FaceOffset {
        /// Body index.
        body: usize,
        /// Face index.
        face: usize,
        /// Offset distance along the face normal.
        distance: f64,
    },
}

/// What an extrusion does with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtrudeOperation {
    /// Create a new body.
    NewBody,
    /// Remove material from existing bodies.
    Cut,
}

/// Extrusion of a sketch's first profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Extrude {
    /// Sketch index.
    pub sketch: usize,
    /// Extent along the sketch normal.
    pub distance: f64,
    /// Taper angle in degrees.
    pub taper_deg: f64,
    /// New body or cut.
    pub operation: ExtrudeOperation,
    /// Wall thickness for a thin extrusion.
    pub thin: Option<f64>,
    /// Restrict a cut to one body.
    pub target: Option<usize>,
}

impl Extrude {
    /// A plain new-body extrusion.
    #[must_use]
    pub const fn new_body(sketch: usize, distance: f64) -> Self {
        Self {
            sketch,
            distance,
            taper_deg: 0.0,
            operation: ExtrudeOperation::NewBody,
            thin: None,
            target: None,
        }
    }

    /// A cut into all bodies.
    #[must_use]
    pub const fn cut(sketch: usize, depth: f64) -> Self {
        Self {
            sketch,
            distance: depth,
            taper_deg: 0.0,
            operation: ExtrudeOperation::Cut,
            thin: None,
            target: None,
        }
    }
}

/// Outcome of a solid feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureReport {
    /// Body created or modified.
    pub body: usize,
    /// Volume of a new body, or volume removed by a cut.
    pub volume: f64,
}

/// Outcome of a fillet pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilletReport {
    /// Edges that received a fillet.
    pub filleted: usize,
    /// Edges that could not be filleted.
    pub skipped: usize,
}

/// Simple drilled holes on a planar face.
#[derive(Debug, Clone, PartialEq)]
pub struct HoleSpec {
    /// Body index.
    pub body: usize,
    /// Face index.
    pub face: usize,
    /// Hole centres in face sketch coordinates.
    pub points: Vec<Point2>,
    /// Hole diameter.
    pub diameter: f64,
    /// Depth, or `None` for through-all.
    pub depth: Option<f64>,
}

/// Cosmetic/modelled thread on a cylindrical face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadSpec {
    /// Internal (`true`) or external thread.
    pub inside: bool,
    /// Index into the host's thread size table.
    pub size_index: usize,
}

/// Boolean combination of two bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    /// Union.
    Join,
    /// Subtract the tool from the target.
    Cut,
    /// Keep the common volume.
    Intersect,
}

impl FromStr for BooleanOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "join" => Ok(Self::Join),
            "cut" => Ok(Self::Cut),
            "intersect" => Ok(Self::Intersect),
            other => Err(format!(
                "unknown boolean operation '{other}', expected join, cut or intersect"
            )),
        }
    }
}

/// Body pattern definition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pattern {
    /// Copies spread evenly over 360 degrees around a world axis.
    Circular {
        /// Rotation axis.
        axis: Axis,
        /// Total instance count, including the original.
        quantity: u32,
    },
    /// Copies on a grid spanned by two world axes.
    Rectangular {
        /// First direction: axis, count, spacing.
        first: (Axis, u32, f64),
        /// Second direction: axis, count, spacing.
        second: (Axis, u32, f64),
    },
}

/// Body or sketch selection by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A body.
    Body(String),
    /// A sketch.
    Sketch(String),
}

/// Export file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// ISO 10303-21.
    Step,
    /// Stereolithography mesh.
    Stl,
}

impl ExportFormat {
    /// File extension without the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Stl => "stl",
        }
    }
}

/// Axis-aligned world bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl BoundingBox {
    /// Centre of the box.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }

    /// Extent along each axis.
    #[must_use]
    pub fn size(&self) -> Vec3 {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

/// Summary of a solid body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyInfo {
    /// Body index (valid until the next topology change).
    pub index: usize,
    /// Body name.
    pub name: String,
    /// Volume.
    pub volume: f64,
    /// World bounding box.
    pub bounding_box: BoundingBox,
    /// Number of faces.
    pub face_count: usize,
}

/// Surface geometry of a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    /// Flat face.
    Plane,
    /// Cylindrical face.
    Cylinder,
    /// Spherical face.
    Sphere,
    /// Anything else.
    Freeform,
}

/// Summary of a body face.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceInfo {
    /// Face index within the body.
    pub index: usize,
    /// Surface type.
    pub kind: SurfaceKind,
    /// Area.
    pub area: f64,
    /// Approximate centroid.
    pub centroid: Vec3,
    /// Outward normal for planar faces.
    pub normal: Option<Vec3>,
}

/// A named design parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParameter {
    /// Parameter name.
    pub name: String,
    /// Current value in the parameter's unit.
    pub value: f64,
    /// Unit string (may be empty).
    pub unit: String,
    /// Expression text.
    pub expression: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_parses_case_insensitively() {
        assert_eq!("xz".parse::<Plane>().unwrap(), Plane::Xz);
        assert_eq!(" YZ ".parse::<Plane>().unwrap(), Plane::Yz);
        assert!("QQ".parse::<Plane>().is_err());
    }

    #[test]
    fn plane_split_maps_world_coordinates() {
        assert_eq!(Plane::Xy.split(1.0, 2.0, 3.0), (Point2::new(1.0, 2.0), 3.0));
        assert_eq!(Plane::Xz.split(1.0, 2.0, 3.0), (Point2::new(1.0, 3.0), 2.0));
        assert_eq!(Plane::Yz.split(1.0, 2.0, 3.0), (Point2::new(2.0, 3.0), 1.0));
    }

    #[test]
    fn boolean_op_parses() {
        assert_eq!("Join".parse::<BooleanOp>().unwrap(), BooleanOp::Join);
        assert!("merge".parse::<BooleanOp>().is_err());
    }

    #[test]
    fn bounding_box_helpers() {
        let bb = BoundingBox {
            min: [0.0, -1.0, 2.0],
            max: [2.0, 1.0, 6.0],
        };
        assert_eq!(bb.center(), [1.0, 0.0, 4.0]);
        assert_eq!(bb.size(), [2.0, 2.0, 4.0]);
    }
}
