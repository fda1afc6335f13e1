//! Up-front validation and the derived constants every phase shares.

use kerf_geom::Bounds3;
use tracing::debug;

use crate::config::{Axis, ProcessConfig, StockSize, Units};
use crate::error::{CamError, Result};

/// Slack allowed when comparing stock against the part.
const STOCK_TOLERANCE: f64 = 0.00001;

/// Slice depths at or below this are rejected.
const MIN_SLICE_DEPTH: f64 = 0.05;

/// Floor applied to the computed slice depth.
const SLICE_DEPTH_FLOOR: f64 = 0.1;

/// Which operations run and the values derived from the config once per job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPlan {
    /// Part bounds.
    pub bounds: Bounds3,
    /// Units of the job.
    pub units: Units,
    /// Stock, when configured with every dimension set.
    pub stock: Option<StockSize>,
    /// Facing passes above the part top.
    pub facing: bool,
    /// Roughing.
    pub rough: bool,
    /// Outline.
    pub outline: bool,
    /// Contour along X.
    pub contour_x: bool,
    /// Contour along Y.
    pub contour_y: bool,
    /// Hole drilling.
    pub drill: bool,
    /// Registration holes.
    pub registration: bool,
    /// Effective per-pass depth.
    pub slice_depth: f64,
    /// Step of the dense mapping pass.
    pub map_step: f64,
    /// Lowest level any operation reaches.
    pub z_min: f64,
    /// Part top.
    pub z_max: f64,
    /// Stock above the part top; zero without stock.
    pub z_top_offset: f64,
    /// Through-cut margin; only honoured when the bottom is at zero.
    pub z_thru: f64,
}

impl JobPlan {
    /// Whether any contouring runs.
    pub fn contour(&self) -> bool {
        self.contour_x || self.contour_y
    }

    /// Whether any operation runs.
    pub fn any(&self) -> bool {
        self.facing
            || self.rough
            || self.outline
            || self.contour()
            || self.drill
            || self.registration
    }
}

/// Reject a slice depth too small to machine with.
pub fn check_slice_depth(depth: f64, units: Units) -> Result<()> {
    if depth.is_nan() || depth <= MIN_SLICE_DEPTH {
        return Err(CamError::InvalidSliceDepth { depth, units });
    }
    Ok(())
}

/// Validate `config` against the part and derive the job plan.
///
/// Checks run in a fixed order: stock fit, slice depth, enabled operations,
/// then Z bottom. The first failure is returned.
pub fn validate(config: &ProcessConfig, bounds: Bounds3) -> Result<JobPlan> {
    let stock = config
        .stock
        .filter(|s| s.x > 0.0 && s.y > 0.0 && s.z > 0.0);
    if let Some(stock) = stock {
        let fits = [
            (Axis::X, stock.x, bounds.size_x()),
            (Axis::Y, stock.y, bounds.size_y()),
            (Axis::Z, stock.z, bounds.size_z()),
        ];
        if let Some((axis, _, _)) = fits.iter().find(|(_, have, need)| have + STOCK_TOLERANCE < *need) {
            return Err(CamError::StockTooSmall { axis: *axis });
        }
    }

    let rough = config.rough_on && config.rough_down > 0.0;
    let outline = config.outline_on && config.outline_down > 0.0;
    let rough_down = if rough { config.rough_down } else { f64::INFINITY };
    let outline_down = if outline { config.outline_down } else { f64::INFINITY };

    let slice_depth = (rough_down.min(outline_down) / 3.0).max(SLICE_DEPTH_FLOOR);
    check_slice_depth(slice_depth, config.units)?;

    let z_top_offset = if stock.is_some() {
        config.z_top_offset.max(0.0)
    } else {
        0.0
    };
    let facing = config.rough_down > 0.0
        && ((rough && z_top_offset > 0.0) || config.rough_top);

    let plan = JobPlan {
        bounds,
        units: config.units,
        stock,
        facing,
        rough,
        outline,
        contour_x: config.contour_x,
        contour_y: config.contour_y,
        drill: config.drill_on,
        registration: config.drill_reg.is_some() && stock.is_some(),
        slice_depth,
        map_step: 1.0_f64.min(rough_down / 3.0).min(outline_down / 3.0),
        z_min: bounds.min.z.max(config.z_bottom),
        z_max: bounds.max.z,
        z_top_offset,
        z_thru: if config.z_bottom == 0.0 {
            config.z_thru.max(0.0)
        } else {
            0.0
        },
    };

    if !plan.any() {
        return Err(CamError::NoProcesses);
    }
    if plan.z_min >= plan.z_max {
        return Err(CamError::InvalidZBottom { z_max: plan.z_max });
    }

    debug!(
        slice_depth = plan.slice_depth,
        map_step = plan.map_step,
        z_min = plan.z_min,
        z_max = plan.z_max,
        "job plan"
    );
    Ok(plan)
}
