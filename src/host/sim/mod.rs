//! An in-memory [`CadHost`].
//!
//! Keeps a coarse, axis-aligned model of the design so that every bridge
//! operation has observable effects: bodies gain volume and faces, sketches
//! gain curves, parameters appear and undo restores earlier states.

mod export;
mod features;
mod model;
mod profile;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::SimulationConfig;
use crate::host::{
    BodyInfo, BooleanOp, CadHost, ExportFormat, Extrude, FaceInfo, FeatureReport, FilletReport,
    HoleSpec, HostError, HostResult, ModelParameter, Pattern, Plane, PlaneDefinition, Selection,
    SketchCurve, SketchInfo, SketchTarget, ThreadSpec, Vec3,
};

use model::Model;

pub use features::THREAD_SIZES;

/// Simulated CAD host with linear undo history.
#[derive(Debug)]
pub struct SimulatedHost {
    model: Model,
    history: Vec<Model>,
    active_design: bool,
    alerts: Vec<String>,
    export_dir: PathBuf,
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedHost {
    /// Creates a host with an empty, active design.
    #[must_use]
    pub fn new() -> Self {
        Self::with_export_dir(default_export_dir())
    }

    /// Creates a host that writes exports into `dir`.
    #[must_use]
    pub fn with_export_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            model: Model::default(),
            history: Vec::new(),
            active_design: true,
            alerts: Vec::new(),
            export_dir: dir.into(),
        }
    }

    /// Creates a host from the `simulation` configuration section.
    #[must_use]
    pub fn from_config(config: &SimulationConfig) -> Self {
        config
            .export_dir
            .clone()
            .map_or_else(Self::new, Self::with_export_dir)
    }

    /// Creates a host with no design open.
    #[must_use]
    pub fn without_design() -> Self {
        Self {
            active_design: false,
            ..Self::new()
        }
    }

    /// Alerts shown so far, oldest first.
    #[must_use]
    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    /// Directory exports are written to.
    #[must_use]
    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Runs a modelling step; a failed step leaves the design untouched and
    /// a step that changes nothing leaves no history entry.
    fn transact<T>(&mut self, step: impl FnOnce(&mut Model) -> HostResult<T>) -> HostResult<T> {
        let before = self.model.clone();
        match step(&mut self.model) {
            Ok(value) => {
                if self.model != before {
                    self.history.push(before);
                }
                Ok(value)
            }
            Err(e) => {
                self.model = before;
                Err(e)
            }
        }
    }
}

fn default_export_dir() -> PathBuf {
    std::env::temp_dir().join("cad-bridge-exports")
}

impl CadHost for SimulatedHost {
    fn has_active_design(&self) -> bool {
        self.active_design
    }

    fn alert(&mut self, message: &str) {
        warn!(target: "cad_bridge_mcp::host", "{message}");
        self.alerts.push(message.to_string());
    }

    fn model_parameters(&self) -> Vec<ModelParameter> {
        self.model.parameters.clone()
    }

    fn set_parameter_expression(&mut self, name: &str, expression: &str) -> HostResult<()> {
        self.transact(|m| m.set_parameter_expression(name, expression))
    }

    fn create_sketch(&mut self, target: SketchTarget) -> HostResult<usize> {
        self.transact(|m| m.create_sketch(target))
    }

    fn add_curve(&mut self, sketch: usize, curve: SketchCurve) -> HostResult<()> {
        self.transact(|m| m.add_curve(sketch, curve))
    }

    fn sketch_count(&self) -> usize {
        self.model.sketches.len()
    }

    fn sketch_info(&self, sketch: usize) -> HostResult<SketchInfo> {
        Ok(self.model.sketch(sketch)?.info(sketch))
    }

    fn project_body_edges(&mut self, sketch: usize, body: usize) -> HostResult<usize> {
        self.transact(|m| m.project_body_edges(sketch, body))
    }

    fn create_construction_plane(&mut self, definition: PlaneDefinition) -> HostResult<usize> {
        self.transact(|m| m.create_construction_plane(definition))
    }

    fn extrude(&mut self, extrude: &Extrude) -> HostResult<FeatureReport> {
        self.transact(|m| m.extrude(extrude))
    }

    fn revolve(&mut self, sketch: usize, angle_deg: f64) -> HostResult<FeatureReport> {
        self.transact(|m| m.revolve(sketch, angle_deg))
    }

    fn sweep(&mut self, profile: usize, path: usize) -> HostResult<FeatureReport> {
        self.transact(|m| m.sweep(profile, path))
    }

    fn loft(&mut self, sketches: &[usize]) -> HostResult<FeatureReport> {
        self.transact(|m| m.loft(sketches))
    }

    fn fillet_edges(&mut self, radius: f64) -> HostResult<FilletReport> {
        self.transact(|m| m.fillet_edges(radius))
    }

    fn shell(&mut self, body: usize, face: usize, thickness: f64) -> HostResult<()> {
        self.transact(|m| m.shell(body, face, thickness))
    }

    fn hole(&mut self, spec: &HoleSpec) -> HostResult<usize> {
        self.transact(|m| m.hole(spec))
    }

    fn thread(&mut self, spec: ThreadSpec) -> HostResult<String> {
        self.transact(|m| m.thread(spec))
    }

    fn combine(&mut self, target: usize, tool: usize, op: BooleanOp) -> HostResult<FeatureReport> {
        self.transact(|m| m.combine(target, tool, op))
    }

    fn move_body(&mut self, body: usize, delta: Vec3) -> HostResult<()> {
        self.transact(|m| m.move_body(body, delta))
    }

    fn mirror_body(&mut self, body: usize, plane: Plane) -> HostResult<usize> {
        self.transact(|m| m.mirror_body(body, plane))
    }

    fn pattern_body(&mut self, body: usize, pattern: Pattern) -> HostResult<usize> {
        self.transact(|m| m.pattern_body(body, pattern))
    }

    fn offset_face(&mut self, body: usize, face: usize, distance: f64) -> HostResult<usize> {
        self.transact(|m| m.offset_face(body, face, distance))
    }

    fn remove_body(&mut self, body: usize) -> HostResult<()> {
        self.transact(|m| m.remove_body(body))
    }

    fn bodies(&self) -> Vec<BodyInfo> {
        self.model
            .bodies
            .iter()
            .enumerate()
            .map(|(i, b)| b.info(i))
            .collect()
    }

    fn faces(&self, body: usize) -> HostResult<Vec<FaceInfo>> {
        Ok(self.model.body(body)?.faces())
    }

    // Selection is UI state, not a modelling step.
    fn select(&mut self, selection: &Selection) -> HostResult<()> {
        let found = match selection {
            Selection::Body(name) => self.model.bodies.iter().any(|b| &b.name == name),
            Selection::Sketch(name) => self.model.sketches.iter().any(|s| &s.name == name),
        };
        if !found {
            let (kind, name) = match selection {
                Selection::Body(name) => ("Body", name),
                Selection::Sketch(name) => ("Sketch", name),
            };
            return Err(HostError::NotFound {
                kind,
                name: name.clone(),
            });
        }
        self.model.selection = Some(selection.clone());
        Ok(())
    }

    fn undo(&mut self) -> HostResult<()> {
        let previous = self.history.pop().ok_or(HostError::NothingToUndo)?;
        self.model = previous;
        debug!(remaining = self.history.len(), "Undid one step");
        Ok(())
    }

    fn history_marker(&self) -> usize {
        self.history.len()
    }

    fn rollback_to(&mut self, marker: usize) -> HostResult<usize> {
        if marker > self.history.len() {
            return Err(HostError::invalid(
                "marker",
                format!(
                    "history marker {marker} lies ahead of the current position {}",
                    self.history.len()
                ),
            ));
        }
        let steps = self.history.len() - marker;
        if steps > 0 {
            self.model = self.history[marker].clone();
            self.history.truncate(marker);
        }
        Ok(steps)
    }

    fn export(&mut self, format: ExportFormat, name: &str) -> HostResult<PathBuf> {
        export::write(&self.export_dir, format, name, &self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Point2;

    fn host_with_box() -> SimulatedHost {
        let mut host = SimulatedHost::new();
        let sketch = host
            .create_sketch(SketchTarget::Plane {
                plane: Plane::Xy,
                offset: 0.0,
            })
            .unwrap();
        host.add_curve(
            sketch,
            SketchCurve::Rectangle {
                corner: Point2::new(0.0, 0.0),
                opposite: Point2::new(2.0, 3.0),
            },
        )
        .unwrap();
        host.extrude(&Extrude::new_body(sketch, 4.0)).unwrap();
        host
    }

    #[test]
    fn failed_step_leaves_design_untouched() {
        let mut host = host_with_box();
        let marker = host.history_marker();
        assert!(host.shell(0, 0, 50.0).is_err());
        assert_eq!(host.history_marker(), marker);
        assert!((host.bodies()[0].volume - 24.0).abs() < 1e-9);
    }

    #[test]
    fn undo_and_rollback() {
        let mut host = host_with_box();
        assert_eq!(host.history_marker(), 3);
        host.undo().unwrap();
        assert!(host.bodies().is_empty());

        let undone = host.rollback_to(0).unwrap();
        assert_eq!(undone, 2);
        assert_eq!(host.sketch_count(), 0);
        assert!(matches!(host.undo(), Err(HostError::NothingToUndo)));
        assert!(host.rollback_to(1).is_err());
    }

    #[test]
    fn select_by_name() {
        let mut host = host_with_box();
        host.select(&Selection::Body("Body1".into())).unwrap();
        let err = host.select(&Selection::Sketch("Nope".into())).unwrap_err();
        assert_eq!(err.to_string(), "Sketch 'Nope' could not be found");
        // selection does not create an undo step
        assert_eq!(host.history_marker(), 3);
    }

    #[test]
    fn alerts_are_recorded() {
        let mut host = SimulatedHost::without_design();
        assert!(!host.has_active_design());
        host.alert("Failed: boom");
        assert_eq!(host.alerts(), ["Failed: boom".to_string()]);
    }
}
