//! Errors reported by a CAD host.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;

/// Errors a host operation can fail with.
///
/// These never escape the pump: each one becomes a
/// `{"success": false, "error": ...}` result plus a host alert.
#[derive(Debug, Error)]
pub enum HostError {
    /// No design/document is open.
    #[error("No active design is open")]
    NoActiveDesign,

    /// An argument has an unusable value.
    #[error("Invalid argument '{name}': {message}")]
    InvalidArgument {
        /// Argument name.
        name: String,
        /// Description of what's wrong.
        message: String,
    },

    /// The design has no bodies.
    #[error("No bodies found in the design")]
    NoBodies,

    /// The design has no sketches.
    #[error("No sketch found. Please create a sketch first.")]
    NoSketches,

    /// Body index out of range.
    #[error("Body index {index} out of range. Design has {count} bodies.")]
    BodyOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of bodies.
        count: usize,
    },

    /// Sketch index out of range.
    #[error("Sketch index {index} out of range. Design has {count} sketches.")]
    SketchOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of sketches.
        count: usize,
    },

    /// Face index out of range.
    #[error("Face index {index} out of range. Body {body} has {count} faces.")]
    FaceOutOfRange {
        /// Body index.
        body: usize,
        /// Requested face index.
        index: usize,
        /// Number of faces on the body.
        count: usize,
    },

    /// A planar face was required.
    #[error("Face {face} of body {body} is not planar")]
    NonPlanarFace {
        /// Body index.
        body: usize,
        /// Face index.
        face: usize,
    },

    /// The sketch has no closed profile.
    #[error("Sketch {sketch} has no closed profiles. Please draw a closed shape.")]
    NoProfile {
        /// Sketch index.
        sketch: usize,
    },

    /// A cut or boolean did not touch any material.
    #[error("The profile does not intersect with any existing body")]
    NoIntersection,

    /// A named entity does not exist.
    #[error("{kind} '{name}' could not be found")]
    NotFound {
        /// Entity kind ("Body", "Sketch", "Parameter").
        kind: &'static str,
        /// Requested name.
        name: String,
    },

    /// The undo history is empty.
    #[error("Nothing to undo")]
    NothingToUndo,

    /// A feature could not be built from valid inputs.
    #[error("{feature} failed: {message}")]
    Feature {
        /// Feature name.
        feature: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// Writing an export file failed.
    #[error("Failed to write export file: {path}")]
    Export {
        /// Target path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl HostError {
    /// Creates an [`HostError::InvalidArgument`].
    pub fn invalid(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an [`HostError::Feature`].
    pub fn feature(feature: &'static str, message: impl Into<String>) -> Self {
        Self::Feature {
            feature,
            message: message.into(),
        }
    }
}
