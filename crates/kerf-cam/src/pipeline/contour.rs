//! Surface contouring over the topography raster.

use std::sync::atomic::{AtomicUsize, Ordering};

use kerf_geom::Point2;
use tracing::debug;

use super::{Mapping, PhaseContext};
use crate::error::Result;
use crate::progress::{Phase, PhaseTracker};
use crate::slice::Slice;
use crate::tabs::{tab_lines, TabLine};
use crate::tool::Tool;
use crate::topo::{ContourMode, ContourOptions, TopoGrid};

/// Build the raster and run the enabled X and Y contour passes.
///
/// X slices come before Y slices, each in scan-line order.
pub fn contour_slices(
    ctx: &PhaseContext<'_>,
    tool: &Tool,
    mapping: &Mapping,
    tracker: &mut PhaseTracker<'_>,
) -> Result<Vec<Slice>> {
    let config = ctx.config;
    let plan = ctx.plan;
    let res = config.contour_resolution;
    let d = tool.flute_diameter();

    tracker.enter(Phase::Contour);

    let (part_offset, clip) = if config.contour_inside {
        (0.0, mapping.shadow.clone())
    } else {
        (d / 2.0 + res, ctx.ops.expand(&mapping.shadow, d / 2.0 + 3.0 * res)?)
    };
    let center = plan.bounds.center();
    let tab_clips = match ctx.tab_spec() {
        Some(spec) => tab_lines(Point2::new(center.x, center.y), d, &spec)
            .iter()
            .map(TabLine::clip_quad)
            .collect(),
        None => Vec::new(),
    };
    let options = ContourOptions {
        tool_step: d * config.contour_over,
        part_offset,
        clip: Some(clip),
        tab_clips,
        tab_height: config.tabs_height + config.z_bottom,
        curves_only: config.contour_curves,
        max_angle: config.contour_angle,
    };

    let step = options.tool_step.max(res);
    let lines = |size: f64| ((size + 2.0 * part_offset) / step + 1e-9).floor() as usize + 1;
    let mut extra = 0;
    if plan.contour_x {
        extra += lines(plan.bounds.size_x());
    }
    if plan.contour_y {
        extra += lines(plan.bounds.size_y());
    }

    let progress: &PhaseTracker<'_> = tracker;
    let on_raster = |n: usize, total: usize, label: &str| progress.step(n, total, Some(label));
    let grid = TopoGrid::build(
        ctx.provider,
        res,
        config.z_bottom,
        d,
        tool.contact_profile(res),
        extra,
        &on_raster,
    )?;

    let total = grid.steps_x + extra;
    let done = AtomicUsize::new(grid.steps_x);
    let on_line = |label: &str| {
        let n = done.fetch_add(1, Ordering::Relaxed) + 1;
        progress.step(n, total, Some(label));
    };

    let run = |enabled: bool, mode: ContourMode| {
        if enabled {
            grid.contour(mode, &options, &on_line)
        } else {
            Vec::new()
        }
    };
    let (mut slices, along_y) = rayon::join(
        || run(plan.contour_x, ContourMode::X),
        || run(plan.contour_y, ContourMode::Y),
    );
    slices.extend(along_y);

    debug!(
        steps_x = grid.steps_x,
        steps_y = grid.steps_y,
        slices = slices.len(),
        "contour"
    );
    Ok(slices)
}
