//! Roughing: clear stock around the part one level at a time without
//! cutting into material that is still present above the level.

use std::sync::atomic::{AtomicUsize, Ordering};

use kerf_geom::{flatten, nest, Path, PolygonOps, Ring, Shape};
use rayon::prelude::*;
use tracing::debug;

use super::levels::{accumulate, ring_paths, Level, Schedule};
use super::{Mapping, PhaseContext, PhaseOutput};
use crate::error::Result;
use crate::progress::{Phase, PhaseTracker};
use crate::shadow::SHADOW_TOLERANCE;
use crate::slice::{CamMode, Slice};
use crate::tabs::cut_tabs;

/// Rings within this distance of a through-hole are that hole.
const THRU_HOLE_MATCH: f64 = 0.05;

/// Build the roughing slices.
///
/// Levels that end up with no toolpaths are dropped.
pub fn rough_slices(
    ctx: &PhaseContext<'_>,
    tool_diameter: f64,
    mapping: &Mapping,
    tracker: &mut PhaseTracker<'_>,
) -> Result<PhaseOutput> {
    let config = ctx.config;
    let d = tool_diameter;
    let leave = config.rough_stock;
    let flats = ctx.provider.flats();

    tracker.enter(Phase::Roughing);
    let schedule = Schedule::stepped(ctx.provider, config.rough_down, config.z_bottom)?;
    let schedule = if config.rough_flat {
        schedule.snap_to_flats(flats, config.z_bottom)
    } else {
        schedule.inject_flats(flats, ctx.plan.bounds.min.z)
    };
    let (levels, shadow) = accumulate(ctx.provider, ctx.ops, &schedule, tracker)?;

    let mut all = shadow;
    all.extend_from_slice(mapping.shadow_top());
    let shadow = ctx.ops.union(&all, SHADOW_TOLERANCE)?;
    let shadow = resolve_thru_holes(
        ctx.ops,
        &shadow,
        &mapping.thru_holes(),
        config.rough_voids,
        d / 2.0 + leave,
    )?;

    let grow = if config.rough_inside { d / 4.0 } else { d / 2.0 };
    let shell = ctx.ops.offset(&shadow, grow + leave)?;
    let outside = if config.rough_inside {
        Vec::new()
    } else {
        ctx.ops.offset(&shadow, d * config.rough_over)?
    };
    let tabs = ctx.tab_spec();
    let tab_top = ctx.plan.z_min + config.tabs_height;

    tracker.enter(Phase::RoughOffset);
    let progress: &PhaseTracker<'_> = tracker;
    let total = levels.len();
    let done = AtomicUsize::new(0);

    let planned: Vec<Option<(Slice, usize)>> = levels
        .into_par_iter()
        .map(|level| -> Result<Option<(Slice, usize)>> {
            let z = level.z;
            let mut untabbed = 0;
            let mut paths: Vec<Path> = outside
                .iter()
                .map(|s| Path::from_ring(&s.outer, z, 0))
                .collect();
            if let Some(spec) = tabs.filter(|_| z <= tab_top && !paths.is_empty()) {
                let tabbed = cut_tabs(paths, z, d, &spec);
                untabbed = tabbed.untabbed;
                paths = tabbed.paths;
            }
            // tabs hold the outer perimeter only
            paths.extend(
                outside
                    .iter()
                    .flat_map(|s| s.holes.iter())
                    .map(|h| Path::from_ring(h, z, 0)),
            );
            let rings = clearing_rings(ctx.ops, &shell, &level, d, config.rough_over, leave)?;
            paths.extend(ring_paths(&rings, z));

            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            progress.step(n, total, None);

            if paths.is_empty() {
                debug!(z, "roughing level has no rings");
                return Ok(None);
            }
            let slice = Slice {
                index: 0,
                z,
                mode: CamMode::Rough,
                tops: level.tops,
                shadow: Some(level.shadow),
                cam_lines: paths,
            };
            Ok(Some((slice, untabbed)))
        })
        .collect::<Result<_>>()?;

    let mut out = PhaseOutput::default();
    for (slice, untabbed) in planned.into_iter().flatten() {
        out.untabbed += untabbed;
        out.slices.push(slice);
    }
    debug!(levels = out.slices.len(), "roughing");
    Ok(out)
}

/// Progressive insets of the region between the shell and this level's
/// shadow: first clear of the wall by tool radius plus stock to leave, then
/// by the step-over.
fn clearing_rings(
    ops: &dyn PolygonOps,
    shell: &[Shape],
    level: &Level,
    d: f64,
    over: f64,
    leave: f64,
) -> Result<Vec<(u32, Vec<Shape>)>> {
    let mut rings = flatten(shell);
    rings.extend(flatten(&level.shadow));
    let region = nest(rings);
    Ok(ops.offset_rings(&region, -(d / 2.0 + leave), -(d * over), None)?)
}

/// Drop through-holes from the shadow, or shrink them by `shrink` so the
/// tool stays off their walls.
fn resolve_thru_holes(
    ops: &dyn PolygonOps,
    shadow: &[Shape],
    holes: &[Ring],
    voids: bool,
    shrink: f64,
) -> Result<Vec<Shape>> {
    let mut rings = Vec::new();
    for ring in flatten(shadow) {
        if !holes.iter().any(|h| ring.is_equivalent(h, THRU_HOLE_MATCH)) {
            rings.push(ring);
            continue;
        }
        if voids {
            continue;
        }
        let shrunk = ops.offset(&[Shape::new(ring)], -shrink)?;
        if let Some(shape) = shrunk.into_iter().next() {
            rings.push(shape.outer);
        }
    }
    Ok(nest(rings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerf_geom::{ContourOps, Point2};

    fn plate() -> Vec<Shape> {
        vec![Shape::with_holes(
            Ring::rectangle(0.0, 0.0, 20.0, 20.0),
            vec![Ring::rectangle(8.0, 8.0, 12.0, 12.0)],
        )]
    }

    #[test]
    fn test_thru_hole_dropped_for_voids() {
        let ops = ContourOps::new();
        let holes = plate()[0].holes.clone();
        let shadow = resolve_thru_holes(&ops, &plate(), &holes, true, 1.0).unwrap();
        assert_eq!(shadow.len(), 1);
        assert!(shadow[0].holes.is_empty());
    }

    #[test]
    fn test_thru_hole_shrunk() {
        let ops = ContourOps::new();
        let holes = plate()[0].holes.clone();
        let shadow = resolve_thru_holes(&ops, &plate(), &holes, false, 1.0).unwrap();
        assert_eq!(shadow[0].holes.len(), 1);
        assert!((shadow[0].holes[0].area() - 4.0).abs() < 1e-6);
        assert!(shadow[0].contains(&Point2::new(8.5, 10.0)));
        assert!(!shadow[0].contains(&Point2::new(10.0, 10.0)));
    }

    #[test]
    fn test_unrelated_holes_kept() {
        let ops = ContourOps::new();
        let other = vec![Ring::rectangle(1.0, 1.0, 2.0, 2.0)];
        let shadow = resolve_thru_holes(&ops, &plate(), &other, true, 1.0).unwrap();
        assert_eq!(shadow[0].holes.len(), 1);
    }

    #[test]
    fn test_clearing_rings_stay_off_the_part() {
        let ops = ContourOps::new();
        let full = vec![Shape::new(Ring::rectangle(0.0, 0.0, 20.0, 20.0))];
        let shell = ops.offset(&full, 1.0).unwrap();
        let boss = vec![Shape::new(Ring::rectangle(8.0, 8.0, 12.0, 12.0))];
        let level = Level {
            z: 2.0,
            tops: boss.clone(),
            shadow: boss,
        };
        let rings = clearing_rings(&ops, &shell, &level, 2.0, 0.5, 0.0).unwrap();
        assert!(rings.len() > 1);
        for (k, (depth, shapes)) in rings.iter().enumerate() {
            assert_eq!(*depth as usize, k);
            for p in shapes.iter().flat_map(|s| s.rings()).flat_map(|r| r.points.iter()) {
                // tool center stays a radius off the boss and inside the footprint
                let dx = (8.0 - p.x).max(p.x - 12.0).max(0.0);
                let dy = (8.0 - p.y).max(p.y - 12.0).max(0.0);
                assert!(dx.hypot(dy) > 0.999, "ring point {p:?} too close to material");
                assert!(p.x > -1e-6 && p.x < 20.0 + 1e-6);
            }
        }
    }
}
