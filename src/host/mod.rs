//! The CAD host contract.
//!
//! A [`CadHost`] is the embedded application's modelling API. It is not
//! thread-safe: the bridge moves the host onto a single host thread and only
//! the pump ever calls into it. `Send` is required so the host can be handed
//! to that thread; `Sync` is deliberately not.
//!
//! [`SimulatedHost`] is an in-memory implementation used by the `receiver`
//! binary and the test-suite.

mod error;
mod sim;
mod types;

pub use error::{HostError, HostResult};
pub use sim::{SimulatedHost, THREAD_SIZES};
pub use types::{
    Axis, BodyInfo, BooleanOp, BoundingBox, Extrude, ExtrudeOperation, ExportFormat, FaceInfo,
    FeatureReport, FilletReport, HoleSpec, ModelParameter, Pattern, Plane, PlaneDefinition,
    Point2, Selection, SketchCurve, SketchInfo, SketchTarget, SurfaceKind, ThreadSpec, Vec3,
};

use std::path::PathBuf;

/// The host application's modelling API.
///
/// Indices (bodies, sketches, faces, construction planes) are ordinals into
/// the current design and are only stable until the next topology change.
pub trait CadHost: Send {
    // -- document -----------------------------------------------------------

    /// Returns `true` when a design is open.
    fn has_active_design(&self) -> bool;

    /// Shows a non-fatal notice to the user.
    fn alert(&mut self, message: &str);

    /// Returns the design's model (non-user) parameters.
    fn model_parameters(&self) -> Vec<ModelParameter>;

    /// Sets a parameter's expression.
    ///
    /// # Errors
    ///
    /// Fails if the parameter does not exist or the expression is invalid.
    fn set_parameter_expression(&mut self, name: &str, expression: &str) -> HostResult<()>;

    // -- sketches -----------------------------------------------------------

    /// Creates an empty sketch and returns its index.
    ///
    /// # Errors
    ///
    /// Fails if a face target does not exist or is not planar.
    fn create_sketch(&mut self, target: SketchTarget) -> HostResult<usize>;

    /// Adds a curve to a sketch.
    ///
    /// # Errors
    ///
    /// Fails if the sketch does not exist or the curve is degenerate.
    fn add_curve(&mut self, sketch: usize, curve: SketchCurve) -> HostResult<()>;

    /// Number of sketches in the design.
    fn sketch_count(&self) -> usize;

    /// Describes a sketch.
    ///
    /// # Errors
    ///
    /// Fails if the sketch does not exist.
    fn sketch_info(&self, sketch: usize) -> HostResult<SketchInfo>;

    /// Projects a body's edges into a sketch, returning the number of edges.
    ///
    /// # Errors
    ///
    /// Fails if the sketch or the body does not exist.
    fn project_body_edges(&mut self, sketch: usize, body: usize) -> HostResult<usize>;

    /// Creates a construction plane and returns its index.
    ///
    /// # Errors
    ///
    /// Fails if a referenced face does not exist or is not planar.
    fn create_construction_plane(&mut self, definition: PlaneDefinition) -> HostResult<usize>;

    // -- features -----------------------------------------------------------

    /// Extrudes the first profile of a sketch.
    ///
    /// # Errors
    ///
    /// Fails if the sketch has no profile, or a cut removes nothing.
    fn extrude(&mut self, extrude: &Extrude) -> HostResult<FeatureReport>;

    /// Revolves the first profile of a sketch about the sketch's first line.
    ///
    /// # Errors
    ///
    /// Fails if the sketch has no profile or no line to use as the axis.
    fn revolve(&mut self, sketch: usize, angle_deg: f64) -> HostResult<FeatureReport>;

    /// Sweeps the first profile of `profile` along all curves of `path`.
    ///
    /// # Errors
    ///
    /// Fails if the profile sketch has no profile or the path is empty.
    fn sweep(&mut self, profile: usize, path: usize) -> HostResult<FeatureReport>;

    /// Lofts through the first profile of each sketch, in order.
    ///
    /// # Errors
    ///
    /// Fails if a sketch has no profile or the sections are coplanar.
    fn loft(&mut self, sketches: &[usize]) -> HostResult<FeatureReport>;

    /// Fillets every edge of every body that accepts the radius.
    ///
    /// # Errors
    ///
    /// Fails only when the radius is not positive.
    fn fillet_edges(&mut self, radius: f64) -> HostResult<FilletReport>;

    /// Shells a body, removing one face.
    ///
    /// # Errors
    ///
    /// Fails if the body or face does not exist or the wall is too thick.
    fn shell(&mut self, body: usize, face: usize, thickness: f64) -> HostResult<()>;

    /// Drills holes into a planar face, returning the number of holes.
    ///
    /// # Errors
    ///
    /// Fails if the face is not planar or a hole misses the face.
    fn hole(&mut self, spec: &HoleSpec) -> HostResult<usize>;

    /// Threads the most recent cylindrical face, returning the designation.
    ///
    /// # Errors
    ///
    /// Fails if the size index is out of range or there is no cylindrical face.
    fn thread(&mut self, spec: ThreadSpec) -> HostResult<String>;

    /// Combines `tool` into `target`; the tool body is consumed.
    ///
    /// # Errors
    ///
    /// Fails if either body is missing or a cut/intersect has no overlap.
    fn combine(&mut self, target: usize, tool: usize, op: BooleanOp) -> HostResult<FeatureReport>;

    /// Translates a body.
    ///
    /// # Errors
    ///
    /// Fails if the body does not exist.
    fn move_body(&mut self, body: usize, delta: Vec3) -> HostResult<()>;

    /// Mirrors a body across an origin plane, returning the new body index.
    ///
    /// # Errors
    ///
    /// Fails if the body does not exist.
    fn mirror_body(&mut self, body: usize, plane: Plane) -> HostResult<usize>;

    /// Patterns a body, returning the number of copies created.
    ///
    /// # Errors
    ///
    /// Fails if the body does not exist or a quantity is zero.
    fn pattern_body(&mut self, body: usize, pattern: Pattern) -> HostResult<usize>;

    /// Offsets a face into a new surface body, returning its index.
    ///
    /// # Errors
    ///
    /// Fails if the body or face does not exist.
    fn offset_face(&mut self, body: usize, face: usize, distance: f64) -> HostResult<usize>;

    /// Removes a body.
    ///
    /// # Errors
    ///
    /// Fails if the body does not exist.
    fn remove_body(&mut self, body: usize) -> HostResult<()>;

    // -- topology -----------------------------------------------------------

    /// Lists all bodies.
    fn bodies(&self) -> Vec<BodyInfo>;

    /// Lists the faces of a body.
    ///
    /// # Errors
    ///
    /// Fails if the body does not exist.
    fn faces(&self, body: usize) -> HostResult<Vec<FaceInfo>>;

    // -- selection ----------------------------------------------------------

    /// Selects a body or sketch by name.
    ///
    /// # Errors
    ///
    /// Fails if nothing has that name.
    fn select(&mut self, selection: &Selection) -> HostResult<()>;

    // -- history / export ---------------------------------------------------

    /// Undoes the most recent modelling step.
    ///
    /// # Errors
    ///
    /// Fails if there is nothing to undo.
    fn undo(&mut self) -> HostResult<()>;

    /// Returns the current position in the undo history.
    fn history_marker(&self) -> usize;

    /// Undoes steps until the history is back at `marker`, returning the
    /// number of steps undone.
    ///
    /// # Errors
    ///
    /// Fails if `marker` lies ahead of the current position.
    fn rollback_to(&mut self, marker: usize) -> HostResult<usize>;

    /// Exports the design and returns the written file.
    ///
    /// # Errors
    ///
    /// Fails if the name is unusable, the design is empty, or writing fails.
    fn export(&mut self, format: ExportFormat, name: &str) -> HostResult<PathBuf>;
}
