//! Closed polygon loops.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::{Point2, EPSILON};

/// A closed loop of 2D points.
///
/// The closing edge from the last point back to the first is implicit; the
/// first point is never repeated at the end.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ring {
    /// Vertices of the loop in order.
    pub points: Vec<Point2>,
}

/// Where a query segment crosses a ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingHit {
    /// Intersection point.
    pub point: Point2,
    /// Index of the crossed edge (edge `i` runs from vertex `i` to `i + 1`).
    pub edge: usize,
    /// Parameter along the crossed edge, in `[0, 1)`.
    pub edge_t: f64,
    /// Parameter along the query segment, in `[0, 1]`.
    pub seg_t: f64,
}

impl Ring {
    /// Create a new ring from points.
    pub fn new(points: Vec<Point2>) -> Self {
        Self { points }
    }

    /// Axis-aligned rectangle, counter-clockwise.
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(vec![
            Point2::new(min_x, min_y),
            Point2::new(max_x, min_y),
            Point2::new(max_x, max_y),
            Point2::new(min_x, max_y),
        ])
    }

    /// Regular polygon approximating a circle, counter-clockwise.
    pub fn circle(center: Point2, radius: f64, segments: usize) -> Self {
        let segments = segments.max(3);
        let points = (0..segments)
            .map(|i| {
                let a = 2.0 * PI * i as f64 / segments as f64;
                Point2::new(center.x + radius * a.cos(), center.y + radius * a.sin())
            })
            .collect();
        Self::new(points)
    }

    /// Check if the ring has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// A ring needs three vertices and some area to bound anything.
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3 || self.area() < EPSILON
    }

    /// Signed area. Positive for counter-clockwise, negative for clockwise.
    pub fn signed_area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut area = 0.0;
        for i in 0..n {
            let j = (i + 1) % n;
            area += self.points[i].x * self.points[j].y;
            area -= self.points[j].x * self.points[i].y;
        }
        area / 2.0
    }

    /// Unsigned area.
    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Is the ring counter-clockwise?
    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Reverse the winding order.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Ensure counter-clockwise winding.
    pub fn ensure_ccw(&mut self) {
        if !self.is_ccw() {
            self.reverse();
        }
    }

    /// Ensure clockwise winding.
    pub fn ensure_cw(&mut self) {
        if self.is_ccw() {
            self.reverse();
        }
    }

    /// Perimeter length including the closing edge.
    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| (self.points[(i + 1) % n] - self.points[i]).norm())
            .sum()
    }

    /// Area centroid. Falls back to the vertex average for zero-area rings.
    pub fn centroid(&self) -> Point2 {
        let n = self.points.len();
        if n == 0 {
            return Point2::origin();
        }
        let a = self.signed_area();
        if a.abs() < EPSILON {
            let sum = self
                .points
                .iter()
                .fold(Point2::origin(), |acc, p| Point2::new(acc.x + p.x, acc.y + p.y));
            return Point2::new(sum.x / n as f64, sum.y / n as f64);
        }
        let (mut cx, mut cy) = (0.0, 0.0);
        for i in 0..n {
            let p = self.points[i];
            let q = self.points[(i + 1) % n];
            let cross = p.x * q.y - q.x * p.y;
            cx += (p.x + q.x) * cross;
            cy += (p.y + q.y) * cross;
        }
        Point2::new(cx / (6.0 * a), cy / (6.0 * a))
    }

    /// Shape regularity: 1.0 for a perfect circle, smaller for anything else.
    pub fn circularity(&self) -> f64 {
        let p = self.perimeter();
        if p < EPSILON {
            return 0.0;
        }
        4.0 * PI * self.area() / (p * p)
    }

    /// 2D bounding box as `(min, max)`.
    pub fn bounds(&self) -> Option<(Point2, Point2)> {
        let first = *self.points.first()?;
        let (mut min, mut max) = (first, first);
        for p in &self.points[1..] {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some((min, max))
    }

    /// Even-odd point containment.
    pub fn contains(&self, point: &Point2) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = n - 1;

        for i in 0..n {
            let pi = &self.points[i];
            let pj = &self.points[j];

            if ((pi.y > point.y) != (pj.y > point.y))
                && (point.x < (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x)
            {
                inside = !inside;
            }
            j = i;
        }

        inside
    }

    /// Whether two rings describe the same loop within `tolerance`,
    /// regardless of start vertex or winding.
    pub fn is_equivalent(&self, other: &Ring, tolerance: f64) -> bool {
        let (Some((amin, amax)), Some((bmin, bmax))) = (self.bounds(), other.bounds()) else {
            return false;
        };
        if (amin - bmin).norm() > tolerance || (amax - bmax).norm() > tolerance {
            return false;
        }
        let scale = self.perimeter().max(other.perimeter()).max(1.0);
        if (self.area() - other.area()).abs() > tolerance * scale {
            return false;
        }
        (self.centroid() - other.centroid()).norm() <= tolerance
    }

    /// Copy with consecutive points closer than `tolerance` merged and a
    /// repeated closing point removed.
    pub fn cleaned(&self, tolerance: f64) -> Ring {
        let mut points: Vec<Point2> = Vec::with_capacity(self.points.len());
        for p in &self.points {
            match points.last() {
                Some(last) if (p - last).norm() <= tolerance => {}
                _ => points.push(*p),
            }
        }
        while points.len() > 1 {
            let first = points[0];
            let last = points[points.len() - 1];
            if (last - first).norm() <= tolerance {
                points.pop();
            } else {
                break;
            }
        }
        Ring::new(points)
    }

    /// Edge `i` as a `(start, end)` pair.
    pub fn edge(&self, i: usize) -> (Point2, Point2) {
        let n = self.points.len();
        (self.points[i % n], self.points[(i + 1) % n])
    }

    /// Shortest distance from `point` to the ring boundary.
    pub fn distance_to(&self, point: &Point2) -> f64 {
        (0..self.points.len())
            .map(|i| {
                let (a, b) = self.edge(i);
                let ab = b - a;
                let len2 = ab.norm_squared();
                let t = if len2 < EPSILON {
                    0.0
                } else {
                    ((point - a).dot(&ab) / len2).clamp(0.0, 1.0)
                };
                (point - (a + ab * t)).norm()
            })
            .fold(f64::INFINITY, f64::min)
    }

    /// Every crossing of the segment `from -> to` with this ring, ordered by
    /// distance from `from`.
    pub fn intersections(&self, from: Point2, to: Point2) -> Vec<RingHit> {
        let n = self.points.len();
        let mut hits = Vec::new();
        if n < 2 {
            return hits;
        }

        let d = to - from;
        for i in 0..n {
            let (a, b) = self.edge(i);
            let e = b - a;
            let denom = d.x * e.y - d.y * e.x;
            if denom.abs() < EPSILON {
                continue;
            }
            let w = a - from;
            let seg_t = (w.x * e.y - w.y * e.x) / denom;
            let edge_t = (w.x * d.y - w.y * d.x) / denom;
            // half-open on the edge so a crossing through a vertex counts once
            if (0.0..=1.0).contains(&seg_t) && (0.0..1.0).contains(&edge_t) {
                hits.push(RingHit {
                    point: a + e * edge_t,
                    edge: i,
                    edge_t,
                    seg_t,
                });
            }
        }

        hits.sort_by(|a, b| a.seg_t.total_cmp(&b.seg_t));
        hits
    }

    /// The open polyline that follows this ring's winding from `start` to `end`.
    ///
    /// When both hits lie on the same edge with `end` behind `start`, the
    /// walk goes all the way around the ring.
    pub fn emit_segment(&self, start: &RingHit, end: &RingHit) -> Vec<Point2> {
        let n = self.points.len();
        let mut out = vec![start.point];
        if n == 0 {
            return out;
        }

        if start.edge != end.edge || end.edge_t < start.edge_t {
            let mut i = (start.edge + 1) % n;
            loop {
                push_distinct(&mut out, self.points[i]);
                if i == end.edge {
                    break;
                }
                i = (i + 1) % n;
            }
        }

        push_distinct(&mut out, end.point);
        out
    }
}

fn push_distinct(points: &mut Vec<Point2>, p: Point2) {
    if points.last().map_or(true, |last| (p - last).norm() > EPSILON) {
        points.push(p);
    }
}
