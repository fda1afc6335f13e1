#![warn(missing_docs)]

//! Planar geometry for the kerf CAM kernel.
//!
//! Thin wrappers around nalgebra for points, plus the polygon types the
//! toolpath pipeline works in:
//!
//! - [`Ring`] - a single closed loop
//! - [`Shape`] - an outer ring that owns its hole rings
//! - [`Path`] - an open or closed 3D toolpath polyline
//!
//! Boolean union and offsetting go through the [`PolygonOps`] capability so
//! the pipeline never depends on a particular geometry backend. The default
//! backend, [`ContourOps`], uses `geo` for unions and `cavalier_contours` for
//! offsets.

mod contour_ops;
mod error;
mod ops;
mod path;
mod ring;
mod shape;

pub use contour_ops::ContourOps;
pub use error::{GeomError, Result};
pub use ops::PolygonOps;
pub use path::Path;
pub use ring::{Ring, RingHit};
pub use shape::{flatten, nest, Shape};

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// A point in the XY plane.
pub type Point2 = nalgebra::Point2<f64>;

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in the XY plane.
pub type Vec2 = Vector2<f64>;

/// Distance below which two coordinates are considered coincident.
pub const EPSILON: f64 = 1e-9;

/// Unit vector pointing along `degrees`, measured counter-clockwise from +X.
pub fn slope_from_angle(degrees: f64) -> Vec2 {
    let (s, c) = degrees.to_radians().sin_cos();
    Vec2::new(c, s)
}

/// Axis-aligned bounding box in 3D.
///
/// Invariant: `min <= max` on every axis for any box built from points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Bounds3 {
    /// Create a box from two corners, sorting each axis.
    pub fn new(a: Point3, b: Point3) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Smallest box containing every point, or `None` for an empty input.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bounds.include(p);
        }
        Some(bounds)
    }

    /// Grow the box to contain `p`.
    pub fn include(&mut self, p: &Point3) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    /// Extent along X.
    pub fn size_x(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Extent along Y.
    pub fn size_y(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Extent along Z.
    pub fn size_z(&self) -> f64 {
        self.max.z - self.min.z
    }

    /// Center of the box.
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_from_points() {
        let pts = [
            Point3::new(1.0, -2.0, 3.0),
            Point3::new(-1.0, 4.0, 0.5),
            Point3::new(0.0, 0.0, 9.0),
        ];
        let b = Bounds3::from_points(&pts).unwrap();
        assert_eq!(b.min, Point3::new(-1.0, -2.0, 0.5));
        assert_eq!(b.max, Point3::new(1.0, 4.0, 9.0));
        assert!((b.size_y() - 6.0).abs() < 1e-12);
        assert!(Bounds3::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_bounds_new_sorts_axes() {
        let b = Bounds3::new(Point3::new(5.0, 0.0, 2.0), Point3::new(1.0, 3.0, -2.0));
        assert!(b.min.x <= b.max.x && b.min.y <= b.max.y && b.min.z <= b.max.z);
        assert_eq!(b.center(), Point3::new(3.0, 1.5, 0.0));
    }

    #[test]
    fn test_slope_from_angle() {
        let s = slope_from_angle(90.0);
        assert!(s.x.abs() < 1e-12);
        assert!((s.y - 1.0).abs() < 1e-12);
    }
}
