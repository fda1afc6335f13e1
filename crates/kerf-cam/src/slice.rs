//! Output records of the pipeline.

use kerf_geom::{Path, Shape};
use serde::{Deserialize, Serialize};

/// The operation that produced a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CamMode {
    /// Facing pass over the stock top.
    Level,
    /// Roughing pass.
    Rough,
    /// Outline (profile) pass.
    Outline,
    /// Surface contour walking along X.
    ContourX,
    /// Surface contour walking along Y.
    ContourY,
    /// Drilling or registration plunge.
    Drill,
}

/// One output record: a Z level, its operation, and its toolpaths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    /// Position in the output sequence.
    pub index: usize,
    /// Height of the pass.
    pub z: f64,
    /// Producing operation.
    pub mode: CamMode,
    /// Raw cross-section at this level, if any.
    pub tops: Vec<Shape>,
    /// Material at or above this level when the pass was planned.
    pub shadow: Option<Vec<Shape>>,
    /// Final toolpaths.
    pub cam_lines: Vec<Path>,
}

impl Slice {
    /// A slice with no tops, shadow or paths yet.
    pub fn new(z: f64, mode: CamMode) -> Self {
        Self {
            index: 0,
            z,
            mode,
            tops: Vec::new(),
            shadow: None,
            cam_lines: Vec::new(),
        }
    }

    /// Attach toolpaths.
    pub fn with_lines(mut self, cam_lines: Vec<Path>) -> Self {
        self.cam_lines = cam_lines;
        self
    }
}
