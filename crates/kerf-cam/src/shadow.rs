//! Running top-down union of cross-sections.

use kerf_geom::{PolygonOps, Shape};

use crate::error::Result;

/// Union tolerance that absorbs slicing noise.
pub const SHADOW_TOLERANCE: f64 = 0.01;

/// Accumulates the material seen from the top of the part down to the
/// current level. Levels must be added in descending Z order.
pub struct ShadowAccumulator<'a> {
    ops: &'a dyn PolygonOps,
    shapes: Vec<Shape>,
}

impl<'a> ShadowAccumulator<'a> {
    /// An empty shadow.
    pub fn new(ops: &'a dyn PolygonOps) -> Self {
        Self {
            ops,
            shapes: Vec::new(),
        }
    }

    /// Union `tops` into the shadow and return the updated shadow.
    pub fn add(&mut self, tops: &[Shape]) -> Result<&[Shape]> {
        if !tops.is_empty() {
            let mut all = std::mem::take(&mut self.shapes);
            all.extend_from_slice(tops);
            self.shapes = self.ops.union(&all, SHADOW_TOLERANCE)?;
        }
        Ok(&self.shapes)
    }

    /// Current shadow.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Net area of the current shadow.
    pub fn area(&self) -> f64 {
        self.shapes.iter().map(Shape::area).sum()
    }

    /// Take the final shadow.
    pub fn into_shapes(self) -> Vec<Shape> {
        self.shapes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerf_geom::{ContourOps, Ring};

    #[test]
    fn test_shadow_grows_monotonically() {
        let ops = ContourOps::new();
        let mut shadow = ShadowAccumulator::new(&ops);
        // a stepped pyramid seen from the top down
        let levels = [
            vec![Shape::new(Ring::rectangle(4.0, 4.0, 6.0, 6.0))],
            vec![Shape::new(Ring::rectangle(2.0, 2.0, 8.0, 8.0))],
            vec![],
            vec![Shape::new(Ring::rectangle(5.0, 0.0, 10.0, 3.0))],
            vec![Shape::new(Ring::rectangle(0.0, 0.0, 10.0, 10.0))],
        ];
        let mut last = 0.0;
        for tops in &levels {
            shadow.add(tops).unwrap();
            let area = shadow.area();
            assert!(area + 1e-9 >= last, "shadow shrank: {area} < {last}");
            last = area;
        }
        assert!((last - 100.0).abs() < 1e-6);
        assert_eq!(shadow.shapes().len(), 1);
    }

    #[test]
    fn test_shadow_keeps_disjoint_regions() {
        let ops = ContourOps::new();
        let mut shadow = ShadowAccumulator::new(&ops);
        shadow.add(&[Shape::new(Ring::rectangle(0.0, 0.0, 1.0, 1.0))]).unwrap();
        shadow.add(&[Shape::new(Ring::rectangle(3.0, 0.0, 4.0, 1.0))]).unwrap();
        assert_eq!(shadow.into_shapes().len(), 2);
    }
}
