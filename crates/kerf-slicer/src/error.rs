//! Error types for the slicer.

use thiserror::Error;

/// Errors that can occur during slicing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SlicerError {
    /// Mesh has no triangles.
    #[error("mesh is empty")]
    EmptyMesh,

    /// Mesh has degenerate geometry.
    #[error("mesh has degenerate geometry: {0}")]
    DegenerateMesh(String),

    /// A requested slice level is not a finite number.
    #[error("invalid slice level {0}")]
    InvalidLevel(f64),

    /// A step size that cannot produce levels.
    #[error("invalid interval step {0}")]
    InvalidStep(f64),
}

/// Result type for slicer operations.
pub type Result<T> = std::result::Result<T, SlicerError>;
