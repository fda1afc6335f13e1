//! Facing passes that take stock above the part top down to it.

use kerf_geom::{PolygonOps, Shape};
use tracing::debug;

use super::levels::ring_paths;
use super::plan::JobPlan;
use crate::config::ProcessConfig;
use crate::error::Result;
use crate::slice::{CamMode, Slice};

/// Facing heights from `z_max + top_offset - step` down to `z_max`.
///
/// The step is the down-step unless the offset is not a whole multiple of
/// it, in which case the offset is split into equal steps no larger than the
/// down-step. With `rough_top` and no offset, a single pass at the part top.
pub fn facing_levels(z_max: f64, top_offset: f64, down: f64, rough_top: bool) -> Vec<f64> {
    if down.is_nan() || down <= 0.0 {
        return Vec::new();
    }
    let mut top_offset = top_offset.max(0.0);
    let zdiv = top_offset / down;
    let step = if zdiv.fract() > 0.0 {
        top_offset / (zdiv.floor() + 1.0)
    } else {
        down
    };
    if rough_top && top_offset == 0.0 {
        top_offset = step;
    }

    let mut levels = Vec::new();
    let mut k = 1.0;
    loop {
        let mut z = z_max + top_offset - k * step;
        if (z - z_max).abs() < 1e-9 {
            z = z_max;
        }
        if z < z_max {
            break;
        }
        levels.push(z);
        k += 1.0;
    }
    levels
}

/// One level slice per facing height, all carrying the same rings.
///
/// The rings cover the full shadow grown by the tool diameter (half of it
/// when roughing inside only), cleared inward by the roughing step-over.
pub fn facing_slices(
    ops: &dyn PolygonOps,
    plan: &JobPlan,
    config: &ProcessConfig,
    tool_diameter: f64,
    shadow: &[Shape],
) -> Result<Vec<Slice>> {
    let grow = if config.rough_inside {
        tool_diameter / 2.0
    } else {
        tool_diameter
    };
    let rings = ops.offset_rings(shadow, grow, -(tool_diameter * config.rough_over), None)?;

    let slices: Vec<Slice> = facing_levels(
        plan.z_max,
        plan.z_top_offset,
        config.rough_down,
        config.rough_top,
    )
    .into_iter()
    .map(|z| Slice::new(z, CamMode::Level).with_lines(ring_paths(&rings, z)))
    .collect();

    debug!(passes = slices.len(), rings = rings.len(), "facing");
    Ok(slices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use kerf_geom::{Bounds3, ContourOps, Point3, Ring};

    use crate::pipeline::plan::validate;

    #[test]
    fn test_levels_split_evenly() {
        let levels = facing_levels(5.0, 3.0, 2.0, false);
        assert_eq!(levels.len(), 2);
        assert_relative_eq!(levels[0], 6.5, epsilon = 1e-9);
        assert_eq!(levels[1], 5.0);
    }

    #[test]
    fn test_levels_whole_multiple() {
        assert_eq!(facing_levels(5.0, 4.0, 2.0, false), vec![7.0, 5.0]);
    }

    #[test]
    fn test_rough_top_single_pass() {
        assert_eq!(facing_levels(5.0, 0.0, 2.0, true), vec![5.0]);
        assert!(facing_levels(5.0, 0.0, 2.0, false).is_empty());
    }

    #[test]
    fn test_facing_rings_repeat_per_pass() {
        let config = ProcessConfig {
            rough_on: true,
            rough_down: 2.0,
            rough_over: 0.4,
            z_top_offset: 4.0,
            stock: Some(crate::config::StockSize {
                x: 20.0,
                y: 20.0,
                z: 10.0,
            }),
            ..Default::default()
        };
        let bounds = Bounds3::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 5.0));
        let plan = validate(&config, bounds).unwrap();
        assert!(plan.facing);

        let ops = ContourOps::new();
        let shadow = vec![Shape::new(Ring::rectangle(0.0, 0.0, 10.0, 10.0))];
        let slices = facing_slices(&ops, &plan, &config, 2.0, &shadow).unwrap();

        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].z, 7.0);
        assert!(slices.iter().all(|s| s.mode == CamMode::Level));
        assert!(slices[0].cam_lines.len() >= 8);
        assert_eq!(slices[0].cam_lines.len(), slices[1].cam_lines.len());
        assert_eq!(slices[0].cam_lines[0].depth, 0);
        // the first ring clears a tool diameter beyond the part
        let (min, _) = slices[0].cam_lines[0].to_ring().bounds().unwrap();
        assert_relative_eq!(min.x, -2.0, epsilon = 1e-6);
    }
}
