//! Default polygon backend: `geo` unions and `cavalier_contours` offsets.

use std::panic::{self, AssertUnwindSafe};

use cavalier_contours::polyline::{PlineSource, PlineSourceMut, Polyline};
use cavalier_contours::shape_algorithms::{Shape as CcShape, ShapeOffsetOptions};
use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use tracing::debug;

use crate::{nest, GeomError, Point2, PolygonOps, Result, Ring, Shape, EPSILON};

/// Polygon algebra on top of `geo` and `cavalier_contours`.
#[derive(Debug, Clone, Copy)]
pub struct ContourOps {
    /// Segments used to tessellate a full circle of offset arc.
    pub arc_segments: usize,
    /// Vertices closer than this are merged before and after offsetting.
    pub clean_tolerance: f64,
}

impl Default for ContourOps {
    fn default() -> Self {
        Self {
            arc_segments: 64,
            clean_tolerance: 1e-6,
        }
    }
}

impl ContourOps {
    /// Create a backend with default tessellation.
    pub fn new() -> Self {
        Self::default()
    }

    fn ring_to_polyline(&self, ring: &Ring) -> Polyline<f64> {
        let mut pline = Polyline::new_closed();
        for p in &ring.cleaned(self.clean_tolerance).points {
            pline.add(p.x, p.y, 0.0);
        }
        pline
    }

    /// Flatten bulge arcs back into line segments.
    fn polyline_to_ring(&self, pline: &Polyline<f64>) -> Ring {
        let count = pline.vertex_count();
        let mut points = Vec::with_capacity(count);

        for i in 0..count {
            let v1 = pline.at(i);
            let v2 = pline.at((i + 1) % count);
            points.push(Point2::new(v1.x, v1.y));

            if v1.bulge.abs() <= 1e-5 {
                continue;
            }
            let chord = ((v2.x - v1.x).powi(2) + (v2.y - v1.y).powi(2)).sqrt();
            if chord <= 1e-5 {
                continue;
            }

            let sweep = 4.0 * v1.bulge.atan();
            let radius = chord / (2.0 * (sweep / 2.0).sin().abs());
            let dist_to_center = radius * (sweep.abs() / 2.0).cos();
            let (mx, my) = ((v1.x + v2.x) / 2.0, (v1.y + v2.y) / 2.0);
            let (nx, ny) = (-(v2.y - v1.y) / chord, (v2.x - v1.x) / chord);
            let sign = v1.bulge.signum();
            let (cx, cy) = (mx + nx * dist_to_center * sign, my + ny * dist_to_center * sign);

            let start = (v1.y - cy).atan2(v1.x - cx);
            let segments = ((sweep.abs() / std::f64::consts::TAU) * self.arc_segments as f64)
                .ceil()
                .max(2.0) as usize;
            for j in 1..segments {
                let a = start + sweep * j as f64 / segments as f64;
                points.push(Point2::new(cx + radius * a.cos(), cy + radius * a.sin()));
            }
        }

        Ring::new(points).cleaned(self.clean_tolerance)
    }

    fn to_geo(shape: &Shape) -> Polygon<f64> {
        let line = |ring: &Ring| {
            LineString::from(
                ring.points
                    .iter()
                    .map(|p| Coord { x: p.x, y: p.y })
                    .collect::<Vec<_>>(),
            )
        };
        Polygon::new(line(&shape.outer), shape.holes.iter().map(line).collect())
    }

    fn from_geo(multi: &MultiPolygon<f64>, tolerance: f64) -> Vec<Ring> {
        let ring = |ls: &LineString<f64>| {
            Ring::new(ls.coords().map(|c| Point2::new(c.x, c.y)).collect()).cleaned(tolerance)
        };
        let mut rings = Vec::new();
        for poly in &multi.0 {
            rings.push(ring(poly.exterior()));
            rings.extend(poly.interiors().iter().map(ring));
        }
        rings
    }
}

fn check_finite(shapes: &[Shape]) -> Result<()> {
    let finite = shapes
        .iter()
        .flat_map(|s| s.rings())
        .flat_map(|r| r.points.iter())
        .all(|p| p.x.is_finite() && p.y.is_finite());
    if finite {
        Ok(())
    } else {
        Err(GeomError::NonFinite)
    }
}

fn panic_reason(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "backend panic".to_string())
}

impl PolygonOps for ContourOps {
    fn union(&self, shapes: &[Shape], tolerance: f64) -> Result<Vec<Shape>> {
        check_finite(shapes)?;
        if shapes.is_empty() {
            return Ok(Vec::new());
        }

        let merged = panic::catch_unwind(AssertUnwindSafe(|| {
            shapes.iter().fold(MultiPolygon::new(Vec::new()), |acc, shape| {
                acc.union(&MultiPolygon::new(vec![Self::to_geo(shape)]))
            })
        }))
        .map_err(|e| GeomError::UnionFailed(panic_reason(e)))?;

        Ok(nest(Self::from_geo(&merged, tolerance.max(EPSILON))))
    }

    fn offset(&self, shapes: &[Shape], distance: f64) -> Result<Vec<Shape>> {
        check_finite(shapes)?;
        if !distance.is_finite() {
            return Err(GeomError::NonFinite);
        }
        if distance == 0.0 {
            return Ok(shapes.to_vec());
        }

        let mut out = Vec::new();
        for shape in shapes {
            out.extend(self.offset_shape(shape, distance)?);
        }
        // grown islands may now overlap
        if distance > 0.0 && out.len() > 1 {
            out = self.union(&out, self.clean_tolerance)?;
        }
        debug!(distance, shapes = out.len(), "offset");
        Ok(out)
    }
}

impl ContourOps {
    /// Offset one outer with its holes. Open or degenerate result loops are
    /// dropped, so a collapsed pass comes back empty.
    fn offset_shape(&self, shape: &Shape, distance: f64) -> Result<Vec<Shape>> {
        let mut outer = shape.outer.cleaned(self.clean_tolerance);
        if outer.is_degenerate() {
            return Ok(Vec::new());
        }
        outer.ensure_ccw();
        let mut inputs = vec![outer];
        for hole in &shape.holes {
            let mut hole = hole.cleaned(self.clean_tolerance);
            if hole.is_degenerate() {
                continue;
            }
            hole.ensure_cw();
            inputs.push(hole);
        }
        let plines: Vec<Polyline<f64>> = inputs.iter().map(|r| self.ring_to_polyline(r)).collect();

        // cavalier offsets toward the left of travel, which shrinks ccw outers
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            CcShape::from_plines(plines).parallel_offset(-distance, ShapeOffsetOptions::new())
        }))
        .map_err(|e| GeomError::OffsetFailed {
            distance,
            reason: panic_reason(e),
        })?;

        // loops that come closer to the input than the offset distance are
        // left over from islands swallowing their outer
        let reach = distance.abs() * (1.0 - 1e-6) - self.clean_tolerance;
        let rings: Vec<Ring> = result
            .ccw_plines
            .iter()
            .chain(result.cw_plines.iter())
            .map(|ip| &ip.polyline)
            .filter(|pline| pline.is_closed() && pline.vertex_count() >= 3)
            .map(|pline| self.polyline_to_ring(pline))
            .filter(|ring| !ring.is_degenerate())
            .filter(|ring| {
                ring.points
                    .iter()
                    .all(|p| inputs.iter().all(|input| input.distance_to(p) >= reach))
            })
            .collect();
        Ok(nest(rings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(size: f64) -> Shape {
        Shape::new(Ring::rectangle(0.0, 0.0, size, size))
    }

    #[test]
    fn test_union_overlapping_squares() {
        let ops = ContourOps::new();
        let a = square(10.0);
        let b = Shape::new(Ring::rectangle(5.0, 0.0, 15.0, 10.0));
        let merged = ops.union(&[a, b], 0.01).unwrap();
        assert_eq!(merged.len(), 1);
        assert_relative_eq!(merged[0].area(), 150.0, epsilon = 1e-6);
    }

    #[test]
    fn test_union_keeps_holes() {
        let ops = ContourOps::new();
        let frame = Shape::with_holes(
            Ring::rectangle(0.0, 0.0, 10.0, 10.0),
            vec![Ring::rectangle(2.0, 2.0, 8.0, 8.0)],
        );
        let merged = ops.union(&[frame], 0.01).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].holes.len(), 1);
        assert_relative_eq!(merged[0].area(), 64.0, epsilon = 1e-6);
    }

    #[test]
    fn test_offset_inward_shrinks() {
        let ops = ContourOps::new();
        let shrunk = ops.offset(&[square(10.0)], -1.0).unwrap();
        assert_eq!(shrunk.len(), 1);
        assert_relative_eq!(shrunk[0].area(), 64.0, epsilon = 1e-6);
    }

    #[test]
    fn test_offset_outward_grows_with_rounded_corners() {
        let ops = ContourOps::new();
        let grown = ops.offset(&[square(10.0)], 1.0).unwrap();
        assert_eq!(grown.len(), 1);
        let exact = 100.0 + 40.0 + std::f64::consts::PI;
        assert!((grown[0].area() - exact).abs() < 0.05);
    }

    #[test]
    fn test_offset_consumes_shape() {
        let ops = ContourOps::new();
        assert!(ops.offset(&[square(2.0)], -1.5).unwrap().is_empty());
    }

    #[test]
    fn test_offset_rings_steps_until_empty() {
        let ops = ContourOps::new();
        let rings = ops.offset_rings(&[square(10.0)], -1.0, -1.5, None).unwrap();
        // 8x8, 5x5, 2x2
        assert_eq!(rings.len(), 3);
        let depths: Vec<u32> = rings.iter().map(|(d, _)| *d).collect();
        assert_eq!(depths, vec![0, 1, 2]);
        assert_relative_eq!(rings[2].1[0].area(), 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_island_swallowing_outer_vanishes() {
        let ops = ContourOps::new();
        let part = square(20.0);
        let shell = ops.offset(&[part.clone()], 1.0).unwrap();
        let band = Shape::with_holes(shell[0].outer.clone(), vec![part.outer]);
        assert!(ops.offset(&[band], -1.5).unwrap().is_empty());
    }

    #[test]
    fn test_offset_rings_around_an_island() {
        // clearing band between a shell and a boss
        let ops = ContourOps::new();
        let band = Shape::with_holes(
            Ring::rectangle(-1.0, -1.0, 21.0, 21.0),
            vec![Ring::rectangle(8.0, 8.0, 12.0, 12.0)],
        );
        let rings = ops.offset_rings(&[band], -1.0, -0.8, None).unwrap();
        assert!(rings.len() >= 3, "only {} passes", rings.len());
        for (k, (depth, shapes)) in rings.iter().enumerate() {
            assert_eq!(*depth as usize, k);
            let clearance = 1.0 + 0.8 * k as f64;
            for p in shapes.iter().flat_map(|s| s.rings()).flat_map(|r| r.points.iter()) {
                let dx = (8.0 - p.x).max(p.x - 12.0).max(0.0);
                let dy = (8.0 - p.y).max(p.y - 12.0).max(0.0);
                assert!(dx.hypot(dy) >= clearance - 1e-3, "{p:?} at pass {k}");
                assert!(p.x >= -1e-6 && p.x <= 20.0 + 1e-6);
            }
        }
    }

    #[test]
    fn test_offset_fixes_hole_winding() {
        let ops = ContourOps::new();
        let shape = Shape {
            outer: Ring::rectangle(0.0, 0.0, 20.0, 20.0),
            holes: vec![Ring::rectangle(8.0, 8.0, 12.0, 12.0)],
        };
        let shrunk = ops.offset(&[shape], -1.0).unwrap();
        assert_eq!(shrunk.len(), 1);
        assert_eq!(shrunk[0].holes.len(), 1);
        let exact = 324.0 - (32.0 + std::f64::consts::PI);
        assert!((shrunk[0].area() - exact).abs() < 0.05);
    }

    #[test]
    fn test_grown_islands_merge() {
        let ops = ContourOps::new();
        let a = square(4.0);
        let b = Shape::new(Ring::rectangle(5.0, 0.0, 9.0, 4.0));
        let grown = ops.offset(&[a, b], 1.0).unwrap();
        assert_eq!(grown.len(), 1);
        assert!(grown[0].holes.is_empty());
    }

    #[test]
    fn test_non_finite_rejected() {
        let ops = ContourOps::new();
        let bad = Shape::new(Ring::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(f64::NAN, 0.0),
            Point2::new(1.0, 1.0),
        ]));
        assert_eq!(ops.offset(&[bad], 1.0), Err(GeomError::NonFinite));
    }
}
