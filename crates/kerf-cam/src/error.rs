//! Error types for the toolpath pipeline.

use kerf_geom::GeomError;
use kerf_slicer::SlicerError;
use thiserror::Error;

use crate::config::{Axis, Units};

/// Errors that abort a job.
///
/// Configuration errors are raised before any geometry work. Recoverable
/// anomalies (a level with no rings, a path that cannot be tabbed) are not
/// errors; they are logged and the job continues.
#[derive(Error, Debug)]
pub enum CamError {
    /// Configured stock is smaller than the part along an axis.
    #[error("stock {axis} too small for part. disable stock or use offset stock")]
    StockTooSmall {
        /// Offending axis.
        axis: Axis,
    },

    /// The per-pass slice depth is too small to be useful.
    #[error("invalid slice depth ({depth:.2} {units})")]
    InvalidSliceDepth {
        /// Computed slice depth.
        depth: f64,
        /// Units of the job.
        units: Units,
    },

    /// Nothing to do.
    #[error("no processes selected")]
    NoProcesses,

    /// Z bottom is at or above the part top.
    #[error("invalid z bottom >= bounds z max {z_max}")]
    InvalidZBottom {
        /// Top of the part.
        z_max: f64,
    },

    /// A tool number that the resolver does not know.
    #[error("unknown tool {0}")]
    UnknownTool(u32),

    /// A parameter outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The job was cancelled between operations.
    #[error("job cancelled")]
    Cancelled,

    /// Polygon backend failure.
    #[error(transparent)]
    Geometry(#[from] GeomError),

    /// Cross-section provider failure.
    #[error(transparent)]
    Slicer(#[from] SlicerError),

    /// Malformed configuration document.
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CAM operations.
pub type Result<T> = std::result::Result<T, CamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = CamError::StockTooSmall { axis: Axis::X };
        assert_eq!(
            e.to_string(),
            "stock X too small for part. disable stock or use offset stock"
        );
        let e = CamError::InvalidSliceDepth {
            depth: 0.02,
            units: Units::Millimeters,
        };
        assert_eq!(e.to_string(), "invalid slice depth (0.02 mm)");
        let e = CamError::InvalidZBottom { z_max: 3.0 };
        assert_eq!(e.to_string(), "invalid z bottom >= bounds z max 3");
    }
}
