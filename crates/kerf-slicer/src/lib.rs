#![warn(missing_docs)]

//! Mesh cross-sectioning for the kerf CAM kernel.
//!
//! The toolpath pipeline only needs three things from part geometry: its
//! bounds, the heights of its planar shelves ("flats"), and cross-sections
//! at requested levels. Those are expressed by [`CrossSectionProvider`];
//! [`MeshSlicer`] implements it for triangle meshes.
//!
//! # Example
//!
//! ```ignore
//! use kerf_slicer::{CrossSectionProvider, IntervalOptions, MeshSlicer, SliceOptions, TriangleMesh};
//!
//! let slicer = MeshSlicer::new(&mesh)?;
//! let levels = slicer.interval(1.0, &IntervalOptions { down: true, fit: true, ..Default::default() })?;
//! let sections = slicer.slice(&levels, &SliceOptions::default())?;
//! ```

pub mod error;
pub mod mesh;
pub mod slice;

pub use error::{Result, SlicerError};
pub use mesh::TriangleMesh;
pub use slice::MeshSlicer;

use kerf_geom::{Bounds3, Point3, Shape};
use serde::{Deserialize, Serialize};

/// Two levels closer than this are the same level.
pub const LEVEL_EPSILON: f64 = 1e-6;

/// Plane orientation for slicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SliceAxis {
    /// Horizontal planes at constant Z.
    #[default]
    Z,
    /// Vertical planes at constant X.
    X,
}

/// What to produce at each level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliceOptions {
    /// Plane orientation.
    pub axis: SliceAxis,
    /// Produce closed top shapes (Z axis only).
    pub tops: bool,
    /// Produce raw 3D intersection segments.
    pub lines: bool,
}

impl Default for SliceOptions {
    fn default() -> Self {
        Self {
            axis: SliceAxis::Z,
            tops: true,
            lines: false,
        }
    }
}

/// Level schedule parameters for [`CrossSectionProvider::interval`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IntervalOptions {
    /// Lowest level; clamped to the part bottom.
    pub min: Option<f64>,
    /// Shrink the step so it divides the range evenly.
    pub fit: bool,
    /// Return levels top down.
    pub down: bool,
    /// Merge the part's flat levels into the schedule.
    pub flats: bool,
    /// When positive, the first level sits this far below the top instead
    /// of one full step below it.
    pub offset: f64,
}

/// One cross-section of the part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossSection {
    /// Requested level (Z for horizontal slices, X for vertical ones).
    pub z: f64,
    /// Closed material regions with their holes.
    pub tops: Vec<Shape>,
    /// Raw intersection segments.
    pub lines: Vec<[Point3; 2]>,
}

/// Source of part cross-sections.
pub trait CrossSectionProvider: Send + Sync {
    /// Part bounding box.
    fn bounds(&self) -> Bounds3;

    /// Heights of planar horizontal shelves, highest first.
    fn flats(&self) -> &[f64];

    /// Cross-sections at each level, in the order given.
    fn slice(&self, levels: &[f64], options: &SliceOptions) -> Result<Vec<CrossSection>>;

    /// Schedule of Z levels spaced by `step` between the part top and
    /// `options.min`.
    fn interval(&self, step: f64, options: &IntervalOptions) -> Result<Vec<f64>> {
        if !step.is_finite() || step <= 0.0 {
            return Err(SlicerError::InvalidStep(step));
        }

        let bounds = self.bounds();
        let lo = options.min.map_or(bounds.min.z, |m| m.max(bounds.min.z));
        let offset = options.offset.max(0.0);
        let top = bounds.max.z - offset;
        let range = top - lo;
        if range < -LEVEL_EPSILON {
            return Ok(Vec::new());
        }

        let mut step = step;
        if options.fit && range > LEVEL_EPSILON {
            let count = (range / step - 1e-9).ceil().max(1.0);
            step = range / count;
        }

        let mut levels = Vec::new();
        if offset > 0.0 {
            levels.push(top);
        }
        let mut k = 1.0;
        loop {
            let mut z = top - k * step;
            if (z - lo).abs() < LEVEL_EPSILON {
                z = lo;
            }
            if z < lo {
                break;
            }
            levels.push(z);
            k += 1.0;
        }

        if options.flats {
            levels.extend(
                self.flats()
                    .iter()
                    .copied()
                    .filter(|f| *f >= lo - LEVEL_EPSILON && *f <= top + LEVEL_EPSILON),
            );
        }

        levels.sort_by(|a, b| b.total_cmp(a));
        levels.dedup_by(|a, b| (*a - *b).abs() < LEVEL_EPSILON);
        if !options.down {
            levels.reverse();
        }
        Ok(levels)
    }
}
