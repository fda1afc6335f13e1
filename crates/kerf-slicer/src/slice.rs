//! Mesh slicing - intersect a triangle mesh with axis-aligned planes.

use rayon::prelude::*;
use tracing::debug;

use kerf_geom::{nest, Bounds3, Point2, Point3, Ring};

use crate::error::{Result, SlicerError};
use crate::{CrossSection, CrossSectionProvider, SliceAxis, SliceOptions, TriangleMesh};

/// Distance a level that lands on a flat shelf is moved off the shelf.
const FLAT_NUDGE: f64 = 1e-3;

/// Two flats closer than this are the same shelf.
const FLAT_TOLERANCE: f64 = 1e-4;

/// Endpoint distance under which chained segments connect.
const CHAIN_EPSILON: f64 = 1e-6;

/// A triangle with its per-axis extents.
#[derive(Debug, Clone, Copy)]
struct Triangle {
    v: [Point3; 3],
    min: [f64; 3],
    max: [f64; 3],
}

impl Triangle {
    fn new(v: [Point3; 3]) -> Self {
        let mut min = [f64::MAX; 3];
        let mut max = [f64::MIN; 3];
        for p in &v {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        Self { v, min, max }
    }

    fn is_horizontal(&self) -> bool {
        self.max[2] - self.min[2] < FLAT_TOLERANCE
    }
}

/// Cross-section provider over a triangle mesh.
#[derive(Debug, Clone)]
pub struct MeshSlicer {
    triangles: Vec<Triangle>,
    bounds: Bounds3,
    flats: Vec<f64>,
}

impl MeshSlicer {
    /// Index a mesh for slicing.
    pub fn new(mesh: &TriangleMesh) -> Result<Self> {
        let triangles: Vec<Triangle> = mesh.triangles()?.into_iter().map(Triangle::new).collect();
        let bounds = mesh.bounds().ok_or(SlicerError::EmptyMesh)?;
        let flats = find_flats(&triangles);
        debug!(
            triangles = triangles.len(),
            flats = flats.len(),
            "indexed mesh for slicing"
        );
        Ok(Self {
            triangles,
            bounds,
            flats,
        })
    }

    /// Move a level that sits exactly on a shelf just below it, or just
    /// above it when the shelf is the part floor.
    fn evaluation_level(&self, z: f64) -> f64 {
        if !self.flats.iter().any(|f| (f - z).abs() < FLAT_TOLERANCE) {
            return z;
        }
        if z - FLAT_NUDGE > self.bounds.min.z {
            z - FLAT_NUDGE
        } else {
            z + FLAT_NUDGE
        }
    }

    fn slice_level(&self, level: f64, options: &SliceOptions) -> CrossSection {
        let (axis, at) = match options.axis {
            SliceAxis::Z => (2, self.evaluation_level(level)),
            SliceAxis::X => (0, level),
        };

        let segments: Vec<[Point3; 2]> = self
            .triangles
            .iter()
            .filter(|t| t.min[axis] <= at && t.max[axis] >= at)
            .filter_map(|t| triangle_plane_intersection(t, axis, at))
            .collect();

        let tops = if options.tops && options.axis == SliceAxis::Z {
            let flat: Vec<[Point2; 2]> = segments
                .iter()
                .map(|[a, b]| [Point2::new(a.x, a.y), Point2::new(b.x, b.y)])
                .collect();
            nest(chain_segments(flat))
        } else {
            Vec::new()
        };

        CrossSection {
            z: level,
            tops,
            lines: if options.lines { segments } else { Vec::new() },
        }
    }
}

impl CrossSectionProvider for MeshSlicer {
    fn bounds(&self) -> Bounds3 {
        self.bounds
    }

    fn flats(&self) -> &[f64] {
        &self.flats
    }

    fn slice(&self, levels: &[f64], options: &SliceOptions) -> Result<Vec<CrossSection>> {
        if let Some(bad) = levels.iter().find(|z| !z.is_finite()) {
            return Err(SlicerError::InvalidLevel(*bad));
        }

        let sections: Vec<CrossSection> = levels
            .par_iter()
            .map(|&z| self.slice_level(z, options))
            .collect();

        debug!(levels = sections.len(), axis = ?options.axis, "sliced");
        Ok(sections)
    }
}

/// Heights of horizontal triangles, rounded to 4 decimals, highest first.
fn find_flats(triangles: &[Triangle]) -> Vec<f64> {
    let mut flats: Vec<f64> = triangles
        .iter()
        .filter(|t| t.is_horizontal())
        .map(|t| (t.max[2] * 1e4).round() / 1e4)
        .collect();
    flats.sort_by(|a, b| b.total_cmp(a));
    flats.dedup_by(|a, b| (*a - *b).abs() < FLAT_TOLERANCE);
    flats
}

/// Intersect a triangle with the plane `p[axis] == at`.
fn triangle_plane_intersection(tri: &Triangle, axis: usize, at: f64) -> Option<[Point3; 2]> {
    let eps = 1e-10;
    let d = tri.v.map(|p| p[axis] - at);

    if d.iter().all(|&x| x > eps) || d.iter().all(|&x| x < -eps) {
        return None;
    }

    let mut points: Vec<Point3> = Vec::with_capacity(2);
    for i in 0..3 {
        let j = (i + 1) % 3;
        let (va, vb, da, db) = (tri.v[i], tri.v[j], d[i], d[j]);

        if (da > eps && db < -eps) || (da < -eps && db > eps) {
            let t = da / (da - db);
            points.push(va + (vb - va) * t);
        } else if da.abs() <= eps && db.abs() > eps {
            points.push(va);
        } else if db.abs() <= eps && da.abs() > eps {
            points.push(vb);
        }
    }

    points.dedup_by(|a, b| (*a - *b).norm() < eps);
    match points.as_slice() {
        [a, b, ..] if (a - b).norm() >= eps => Some([*a, *b]),
        _ => None,
    }
}

/// Chain 2D segments into closed rings. Open chains are dropped.
fn chain_segments(segments: Vec<[Point2; 2]>) -> Vec<Ring> {
    let mut remaining = segments;
    let mut rings = Vec::new();

    while let Some([start, end]) = remaining.pop() {
        let mut chain = vec![start, end];

        let mut extended = true;
        while extended {
            extended = false;
            let mut i = 0;
            while i < remaining.len() {
                let head = chain[0];
                let tail = chain[chain.len() - 1];
                let [a, b] = remaining[i];

                let joined = if (a - tail).norm() < CHAIN_EPSILON {
                    chain.push(b);
                    true
                } else if (b - tail).norm() < CHAIN_EPSILON {
                    chain.push(a);
                    true
                } else if (b - head).norm() < CHAIN_EPSILON {
                    chain.insert(0, a);
                    true
                } else if (a - head).norm() < CHAIN_EPSILON {
                    chain.insert(0, b);
                    true
                } else {
                    false
                };

                if joined {
                    remaining.swap_remove(i);
                    extended = true;
                } else {
                    i += 1;
                }
            }
        }

        let closes = chain.len() >= 4 && (chain[0] - chain[chain.len() - 1]).norm() < CHAIN_EPSILON;
        if closes {
            chain.pop();
            rings.push(Ring::new(chain));
        }
    }

    rings
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cube() -> MeshSlicer {
        let mesh = TriangleMesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 10.0));
        MeshSlicer::new(&mesh).unwrap()
    }

    #[test]
    fn test_flats_of_cube() {
        let slicer = cube();
        assert_eq!(slicer.flats(), &[10.0, 0.0]);
    }

    #[test]
    fn test_slice_cube_tops() {
        let slicer = cube();
        let sections = slicer.slice(&[2.5, 7.5], &SliceOptions::default()).unwrap();
        assert_eq!(sections.len(), 2);
        for s in &sections {
            assert_eq!(s.tops.len(), 1);
            assert!(s.tops[0].holes.is_empty());
            assert_relative_eq!(s.tops[0].area(), 100.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_slice_on_flat_is_nudged() {
        let slicer = cube();
        // both the top and the floor sit on shelves
        let sections = slicer.slice(&[10.0, 0.0], &SliceOptions::default()).unwrap();
        assert_eq!(sections[0].z, 10.0);
        assert_eq!(sections[0].tops.len(), 1);
        assert_eq!(sections[1].tops.len(), 1);
    }

    #[test]
    fn test_slice_x_lines() {
        let slicer = cube();
        let opts = SliceOptions {
            axis: SliceAxis::X,
            tops: false,
            lines: true,
        };
        let sections = slicer.slice(&[5.0], &opts).unwrap();
        let lines = &sections[0].lines;
        assert!(!lines.is_empty());
        assert!(lines.iter().all(|[a, b]| (a.x - 5.0).abs() < 1e-9 && (b.x - 5.0).abs() < 1e-9));
        // top face seen as horizontal segments at z=10
        assert!(lines.iter().any(|[a, b]| a.z == 10.0 && b.z == 10.0));
    }

    #[test]
    fn test_chain_square() {
        let p = |x: f64, y: f64| Point2::new(x, y);
        let rings = chain_segments(vec![
            [p(0.0, 0.0), p(1.0, 0.0)],
            [p(1.0, 1.0), p(0.0, 1.0)],
            [p(1.0, 0.0), p(1.0, 1.0)],
            [p(0.0, 1.0), p(0.0, 0.0)],
        ]);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].len(), 4);
    }

    #[test]
    fn test_non_finite_level() {
        let slicer = cube();
        assert!(matches!(
            slicer.slice(&[f64::NAN], &SliceOptions::default()),
            Err(SlicerError::InvalidLevel(_))
        ));
    }
}
