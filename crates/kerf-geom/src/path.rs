//! 3D toolpath polylines.

use serde::{Deserialize, Serialize};

use crate::{Point2, Point3, Ring};

/// A toolpath: an ordered list of 3D points.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Path {
    /// Points in cutting order.
    pub points: Vec<Point3>,
    /// Whether the cutter returns to the first point.
    pub closed: bool,
    /// Offset pass that produced this path (0 for the outermost).
    pub depth: u32,
}

impl Path {
    /// An open path.
    pub fn open(points: Vec<Point3>) -> Self {
        Self {
            points,
            closed: false,
            depth: 0,
        }
    }

    /// A closed path following `ring` at height `z`.
    pub fn from_ring(ring: &Ring, z: f64, depth: u32) -> Self {
        Self {
            points: ring.points.iter().map(|p| Point3::new(p.x, p.y, z)).collect(),
            closed: true,
            depth,
        }
    }

    /// An open path following 2D points at height `z`.
    pub fn from_points_2d(points: &[Point2], z: f64, depth: u32) -> Self {
        Self {
            points: points.iter().map(|p| Point3::new(p.x, p.y, z)).collect(),
            closed: false,
            depth,
        }
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the path has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Highest Z on the path.
    pub fn max_z(&self) -> Option<f64> {
        self.points.iter().map(|p| p.z).reduce(f64::max)
    }

    /// Travel length, including the closing move for closed paths.
    pub fn length(&self) -> f64 {
        let mut len: f64 = self.points.windows(2).map(|w| (w[1] - w[0]).norm()).sum();
        if self.closed && self.points.len() > 2 {
            if let (Some(first), Some(last)) = (self.points.first(), self.points.last()) {
                len += (first - last).norm();
            }
        }
        len
    }

    /// Project onto the XY plane as a ring.
    pub fn to_ring(&self) -> Ring {
        Ring::new(self.points.iter().map(|p| Point2::new(p.x, p.y)).collect())
    }
}
