//! Level schedules and the sequential shadow pass shared by roughing and
//! outlining.

use kerf_geom::{Path, PolygonOps, Shape};
use kerf_slicer::{CrossSectionProvider, IntervalOptions, SliceOptions};

use crate::error::Result;
use crate::progress::PhaseTracker;
use crate::shadow::ShadowAccumulator;

/// Injected flats sit this far below their shelf.
const FLAT_INSET: f64 = 0.01;

/// Levels closer than this are the same level.
const LEVEL_MATCH: f64 = 1e-6;

/// A planned cutting level.
#[derive(Debug, Clone)]
pub struct Level {
    /// Height.
    pub z: f64,
    /// Cross-section at this height.
    pub tops: Vec<Shape>,
    /// Material at or above this height.
    pub shadow: Vec<Shape>,
}

/// A descending schedule plus the extra levels only there to complete the
/// shadow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    /// Every level to slice, highest first.
    pub levels: Vec<f64>,
    /// Levels sliced for the shadow but not cut.
    pub injected: Vec<f64>,
}

impl Schedule {
    /// Down-stepped levels from the part top to `z_bottom`.
    pub fn stepped(provider: &dyn CrossSectionProvider, step: f64, z_bottom: f64) -> Result<Self> {
        let levels = provider.interval(
            step,
            &IntervalOptions {
                min: Some(z_bottom),
                fit: true,
                down: true,
                ..Default::default()
            },
        )?;
        Ok(Self {
            levels,
            injected: Vec::new(),
        })
    }

    /// Add a level just under every flat so shelves reach the shadow.
    pub fn inject_flats(mut self, flats: &[f64], z_floor: f64) -> Self {
        for &flat in flats {
            let z = round_to(flat - FLAT_INSET, 5);
            if z > z_floor && !contains(&self.levels, z) {
                self.levels.push(z);
                self.injected.push(z);
            }
        }
        sort_down(&mut self.levels);
        self
    }

    /// Cut on every flat at or above `z_bottom`, moving a level that sits
    /// just above a flat up to halfway between its neighbours.
    pub fn snap_to_flats(mut self, flats: &[f64], z_bottom: f64) -> Self {
        let flats: Vec<f64> = flats
            .iter()
            .map(|f| round_to(*f, 4))
            .filter(|f| *f >= z_bottom)
            .collect();
        for &flat in &flats {
            if !contains(&self.levels, flat) {
                self.levels.push(flat);
            }
        }
        sort_down(&mut self.levels);

        let n = self.levels.len();
        for i in 1..n.saturating_sub(1) {
            let prev = self.levels[i - 1];
            let curr = self.levels[i];
            let next = self.levels[i + 1];
            if !contains(&flats, curr) && contains(&flats, next) {
                self.levels[i] = next + (prev - next) / 2.0;
            }
        }
        self
    }

    /// Whether `z` was added only for the shadow.
    pub fn is_injected(&self, z: f64) -> bool {
        contains(&self.injected, z)
    }
}

/// Slice every scheduled level top down, growing the shadow as it goes.
///
/// Returns the cut levels with their shadow snapshots and the final shadow.
pub fn accumulate(
    provider: &dyn CrossSectionProvider,
    ops: &dyn PolygonOps,
    schedule: &Schedule,
    tracker: &PhaseTracker<'_>,
) -> Result<(Vec<Level>, Vec<Shape>)> {
    let sections = provider.slice(&schedule.levels, &SliceOptions::default())?;
    let total = sections.len();
    let mut shadow = ShadowAccumulator::new(ops);
    let mut levels = Vec::new();

    for (index, section) in sections.into_iter().enumerate() {
        let snapshot = shadow.add(&section.tops)?.to_vec();
        tracker.step(index + 1, total, None);
        if schedule.is_injected(section.z) {
            continue;
        }
        levels.push(Level {
            z: section.z,
            tops: section.tops,
            shadow: snapshot,
        });
    }

    Ok((levels, shadow.into_shapes()))
}

/// Closed paths for every ring of `shapes` at `z`.
pub fn shape_paths(shapes: &[Shape], z: f64, depth: u32) -> Vec<Path> {
    shapes
        .iter()
        .flat_map(|s| s.rings())
        .map(|r| Path::from_ring(r, z, depth))
        .collect()
}

/// Closed paths for a progressive offset, each ring tagged with its pass.
pub fn ring_paths(rings: &[(u32, Vec<Shape>)], z: f64) -> Vec<Path> {
    rings
        .iter()
        .flat_map(|(depth, shapes)| shape_paths(shapes, z, *depth))
        .collect()
}

fn round_to(v: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (v * scale).round() / scale
}

fn contains(levels: &[f64], z: f64) -> bool {
    levels.iter().any(|l| (l - z).abs() < LEVEL_MATCH)
}

fn sort_down(levels: &mut Vec<f64>) {
    levels.sort_by(|a, b| b.total_cmp(a));
    levels.dedup_by(|a, b| (*a - *b).abs() < LEVEL_MATCH);
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerf_geom::{ContourOps, Point3, Ring};
    use kerf_slicer::{MeshSlicer, TriangleMesh};

    use crate::progress::NoProgress;

    fn schedule(levels: &[f64]) -> Schedule {
        Schedule {
            levels: levels.to_vec(),
            injected: Vec::new(),
        }
    }

    #[test]
    fn test_inject_flats() {
        let s = schedule(&[8.0, 6.0, 4.0, 2.0, 0.0]).inject_flats(&[5.0, 0.0], 0.0);
        assert_eq!(s.levels, vec![8.0, 6.0, 4.99, 4.0, 2.0, 0.0]);
        assert_eq!(s.injected, vec![4.99]);
        assert!(s.is_injected(4.99));
        assert!(!s.is_injected(4.0));
    }

    #[test]
    fn test_snap_to_flats_moves_level_above() {
        let s = schedule(&[8.0, 6.0, 4.0, 2.0]).snap_to_flats(&[3.5, 1.0], 2.0);
        // 3.5 merged; 4.0 sits above it and moves halfway up to 6.0
        assert_eq!(s.levels, vec![8.0, 6.0, 4.75, 3.5, 2.0]);
        assert!(s.injected.is_empty());
    }

    #[test]
    fn test_accumulate_skips_injected() {
        let mesh = TriangleMesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 4.0));
        let slicer = MeshSlicer::new(&mesh).unwrap();
        let ops = ContourOps::new();
        let tracker = PhaseTracker::new(&NoProgress, Vec::new());

        let s = Schedule::stepped(&slicer, 2.0, 0.0)
            .unwrap()
            .inject_flats(slicer.flats(), 0.0);
        assert!(s.is_injected(3.99));
        let (levels, shadow) = accumulate(&slicer, &ops, &s, &tracker).unwrap();
        assert!(levels.iter().all(|l| (l.z - 3.99).abs() > 1e-9));
        assert_eq!(levels.len(), s.levels.len() - 1);
        assert!((shadow.iter().map(Shape::area).sum::<f64>() - 100.0).abs() < 1e-6);
        assert!(levels.iter().all(|l| !l.shadow.is_empty()));
    }

    #[test]
    fn test_ring_paths_carry_depth() {
        let shape = Shape::with_holes(
            Ring::rectangle(0.0, 0.0, 10.0, 10.0),
            vec![Ring::rectangle(4.0, 4.0, 6.0, 6.0)],
        );
        let paths = ring_paths(&[(0, vec![shape.clone()]), (3, vec![shape])], 1.5);
        assert_eq!(paths.len(), 4);
        assert_eq!(paths[2].depth, 3);
        assert_eq!(paths[3].depth, 3);
        assert!(paths.iter().all(|p| p.closed && p.points[0].z == 1.5));
    }
}
