//! Outline: one profile ring per level around the material above it.

use kerf_geom::{Path, PolygonOps, Ring, Shape};
use rayon::prelude::*;
use tracing::debug;

use super::levels::{accumulate, shape_paths, Schedule};
use super::{PhaseContext, PhaseOutput};
use crate::error::Result;
use crate::progress::{Phase, PhaseTracker};
use crate::slice::{CamMode, Slice};
use crate::tabs::cut_tabs;

/// Pocket rings smaller than this are dropped.
const MIN_POCKET_AREA: f64 = 1.0;

/// Build the outline slices.
pub fn outline_slices(
    ctx: &PhaseContext<'_>,
    tool_diameter: f64,
    tracker: &mut PhaseTracker<'_>,
) -> Result<PhaseOutput> {
    let config = ctx.config;
    let d = tool_diameter;

    tracker.enter(Phase::Outline);
    let schedule = Schedule::stepped(ctx.provider, config.outline_down, config.z_bottom)?
        .inject_flats(ctx.provider.flats(), ctx.plan.bounds.min.z);
    let (mut levels, _) = accumulate(ctx.provider, ctx.ops, &schedule, tracker)?;

    // cut through below a part sitting on the bed
    if ctx.plan.z_thru > 0.0 {
        if let Some(last) = levels.last() {
            let mut through = last.clone();
            through.z -= ctx.plan.z_thru;
            levels.push(through);
        }
    }

    let tabs = ctx.tab_spec();
    let tab_top = ctx.plan.z_min + config.tabs_height;

    let planned: Vec<Option<(Slice, usize)>> = levels
        .into_par_iter()
        .map(|level| -> Result<Option<(Slice, usize)>> {
            let z = level.z;
            let offset = ctx.ops.expand(&level.shadow, d / 2.0)?;
            if offset.is_empty() {
                debug!(z, "outline offset vanished");
                return Ok(None);
            }

            let mut paths = if config.outline_pocket {
                pocket_rings(&offset)
                    .iter()
                    .map(|r| Path::from_ring(r, z, 0))
                    .collect()
            } else if config.outline_wide {
                let mut paths = shape_paths(&offset, z, 0);
                for pass in widen(ctx.ops, &offset, d, config.outline_wide_passes)? {
                    paths.extend(shape_paths(&pass, z, 0));
                }
                paths
            } else {
                shape_paths(&offset, z, 0)
            };

            let mut untabbed = 0;
            if let Some(spec) = tabs.filter(|_| z <= tab_top) {
                let tabbed = cut_tabs(paths, z, d, &spec);
                untabbed = tabbed.untabbed;
                paths = tabbed.paths;
            }
            if paths.is_empty() {
                return Ok(None);
            }

            let slice = Slice {
                index: 0,
                z,
                mode: CamMode::Outline,
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
    tracker.step(1, 1, None);
    debug!(levels = out.slices.len(), "outline");
    Ok(out)
}

/// Interior rings of the profile offset: each outer is the part profile
/// itself, so only the holes are pockets.
fn pocket_rings(offset: &[Shape]) -> Vec<Ring> {
    offset
        .iter()
        .filter(|s| s.outer.area() >= MIN_POCKET_AREA)
        .flat_map(|s| s.holes.iter())
        .filter(|h| h.area() >= MIN_POCKET_AREA)
        .cloned()
        .collect()
}

/// Rings grown outward from each profile in half-diameter steps, one set
/// per pass, ignoring holes.
fn widen(ops: &dyn PolygonOps, offset: &[Shape], d: f64, passes: u32) -> Result<Vec<Vec<Shape>>> {
    let outers: Vec<Shape> = offset.iter().map(|s| Shape::new(s.outer.clone())).collect();
    let rings = ops.offset_rings(&outers, d * 0.5, d * 0.5, Some(passes as usize))?;
    Ok(rings.into_iter().map(|(_, shapes)| shapes).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerf_geom::ContourOps;

    fn frame() -> Vec<Shape> {
        vec![
            Shape::with_holes(
                Ring::rectangle(0.0, 0.0, 20.0, 20.0),
                vec![
                    Ring::rectangle(4.0, 4.0, 10.0, 10.0),
                    Ring::rectangle(14.0, 14.0, 14.5, 14.5),
                ],
            ),
            Shape::new(Ring::rectangle(30.0, 0.0, 30.5, 0.5)),
        ]
    }

    #[test]
    fn test_pocket_keeps_only_holes() {
        let rings = pocket_rings(&frame());
        assert_eq!(rings.len(), 1);
        assert!((rings[0].area() - 36.0).abs() < 1e-9);
    }

    #[test]
    fn test_widen_ignores_holes() {
        let ops = ContourOps::new();
        let wide = widen(&ops, &frame()[..1], 2.0, 1).unwrap();
        assert_eq!(wide.len(), 1);
        assert_eq!(wide[0].len(), 1);
        assert!(wide[0][0].holes.is_empty());
        let (min, max) = wide[0][0].bounds().unwrap();
        assert!((min.x + 1.0).abs() < 1e-6);
        assert!((max.y - 21.0).abs() < 1e-6);
    }

    #[test]
    fn test_widen_steps_outward_per_pass() {
        let ops = ContourOps::new();
        let wide = widen(&ops, &frame()[..1], 2.0, 3).unwrap();
        assert_eq!(wide.len(), 3);
        for (k, shapes) in wide.iter().enumerate() {
            let (min, _) = shapes[0].bounds().unwrap();
            assert!((min.x + (k + 1) as f64).abs() < 1e-6, "pass {k} at {}", min.x);
        }
    }

    #[test]
    fn test_widen_without_passes() {
        let ops = ContourOps::new();
        assert!(widen(&ops, &frame()[..1], 2.0, 0).unwrap().is_empty());
    }
}
