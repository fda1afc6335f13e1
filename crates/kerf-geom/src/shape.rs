//! Outer/hole polygon trees.

use serde::{Deserialize, Serialize};

use crate::{Point2, Ring};

/// An outer ring that owns its holes.
///
/// Outers are counter-clockwise and holes clockwise once built through
/// [`Shape::new`], [`Shape::with_holes`] or [`nest`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Shape {
    /// Material boundary.
    pub outer: Ring,
    /// Voids inside the outer boundary.
    pub holes: Vec<Ring>,
}

impl Shape {
    /// A shape without holes.
    pub fn new(mut outer: Ring) -> Self {
        outer.ensure_ccw();
        Self {
            outer,
            holes: Vec::new(),
        }
    }

    /// A shape with holes, normalizing winding.
    pub fn with_holes(outer: Ring, holes: Vec<Ring>) -> Self {
        let mut shape = Self::new(outer);
        for mut hole in holes {
            hole.ensure_cw();
            shape.holes.push(hole);
        }
        shape
    }

    /// Net material area (outer minus holes).
    pub fn area(&self) -> f64 {
        self.outer.area() - self.holes.iter().map(Ring::area).sum::<f64>()
    }

    /// Point lies in material: inside the outer and outside every hole.
    pub fn contains(&self, point: &Point2) -> bool {
        self.outer.contains(point) && !self.holes.iter().any(|h| h.contains(point))
    }

    /// The outer ring followed by the holes.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    /// Bounding box of the outer ring.
    pub fn bounds(&self) -> Option<(Point2, Point2)> {
        self.outer.bounds()
    }
}

/// Rebuild outer/hole relationships from a loose set of rings.
///
/// Every non-degenerate ring ends up either as the outer of a shape or as a
/// hole of the smallest ring that contains it. Nesting alternates, so an
/// island inside a hole becomes a new outer.
pub fn nest(rings: Vec<Ring>) -> Vec<Shape> {
    let mut rings: Vec<Ring> = rings.into_iter().filter(|r| !r.is_degenerate()).collect();
    rings.sort_by(|a, b| b.area().total_cmp(&a.area()));

    let n = rings.len();
    let mut parent: Vec<Option<usize>> = vec![None; n];
    let mut depth = vec![0usize; n];

    for i in 0..n {
        let sample = rings[i].points[0];
        // sorted by area, so scanning backwards finds the tightest container first
        for j in (0..i).rev() {
            if rings[j].contains(&sample) {
                parent[i] = Some(j);
                depth[i] = depth[j] + 1;
                break;
            }
        }
    }

    let mut shapes = Vec::new();
    let mut shape_of: Vec<Option<usize>> = vec![None; n];
    let mut pending_holes = Vec::new();

    for (i, ring) in rings.into_iter().enumerate() {
        if depth[i] % 2 == 0 {
            shape_of[i] = Some(shapes.len());
            shapes.push(Shape::new(ring));
        } else {
            pending_holes.push((i, ring));
        }
    }

    for (i, mut hole) in pending_holes {
        if let Some(idx) = parent[i].and_then(|p| shape_of[p]) {
            hole.ensure_cw();
            shapes[idx].holes.push(hole);
        }
    }

    shapes
}

/// Break shapes back into rings: every outer, then every hole.
///
/// Degenerate rings are dropped. The result can be passed back to [`nest`].
pub fn flatten(shapes: &[Shape]) -> Vec<Ring> {
    let mut rings = Vec::new();
    for shape in shapes {
        if !shape.outer.is_degenerate() {
            rings.push(shape.outer.clone());
        }
    }
    for shape in shapes {
        for hole in &shape.holes {
            if !hole.is_degenerate() {
                rings.push(hole.clone());
            }
        }
    }
    rings
}
