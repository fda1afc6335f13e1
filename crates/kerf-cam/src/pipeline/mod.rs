//! Job orchestration.
//!
//! A job validates its config, maps the part with a dense top-down pass,
//! then runs each enabled operation in a fixed order: facing, roughing,
//! outline, contouring, drilling and registration holes. Every operation
//! reads the mapping results; none of them feed each other.

mod contour;
mod facing;
mod levels;
mod outline;
mod plan;
mod roughing;

pub use facing::facing_levels;
pub use plan::{check_slice_depth, validate, JobPlan};

use kerf_geom::{ContourOps, PolygonOps, Ring, Shape};
use kerf_slicer::{CrossSection, CrossSectionProvider, IntervalOptions, SliceOptions};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ProcessConfig;
use crate::drill::{drill_slices, registration_slice};
use crate::error::{CamError, Result};
use crate::progress::{CancelToken, Phase, PhaseTracker, ProgressSink};
use crate::shadow::ShadowAccumulator;
use crate::slice::Slice;
use crate::tabs::TabSpec;
use crate::tool::{Tool, ToolResolver};

/// The mapping pass lands this far below the part top.
const MAP_TOP_OFFSET: f64 = 0.01;

/// Results of the dense mapping pass.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    /// Full top-down shadow of the part.
    pub shadow: Vec<Shape>,
    /// Every mapped cross-section, highest first.
    pub sections: Vec<CrossSection>,
}

impl Mapping {
    /// Tops of the lowest mapped section.
    pub fn shadow_top(&self) -> &[Shape] {
        self.sections.last().map_or(&[][..], |s| s.tops.as_slice())
    }

    /// Holes of the full shadow: openings that go all the way through.
    pub fn thru_holes(&self) -> Vec<Ring> {
        self.shadow
            .iter()
            .flat_map(|s| s.holes.iter().cloned())
            .collect()
    }
}

/// Shared, read-only inputs of every operation.
pub struct PhaseContext<'a> {
    /// Part geometry.
    pub provider: &'a dyn CrossSectionProvider,
    /// Polygon backend.
    pub ops: &'a dyn PolygonOps,
    /// Job parameters.
    pub config: &'a ProcessConfig,
    /// Derived constants.
    pub plan: &'a JobPlan,
}

impl PhaseContext<'_> {
    /// Tab layout, when tabs are enabled.
    pub fn tab_spec(&self) -> Option<TabSpec> {
        self.config.tabs_on.then(|| TabSpec {
            width: self.config.tabs_width,
            count: self.config.tabs_count,
            angle: self.config.tabs_angle,
        })
    }
}

/// Slices produced by one operation.
#[derive(Debug, Clone, Default)]
pub struct PhaseOutput {
    /// Output slices in level order.
    pub slices: Vec<Slice>,
    /// Paths that tabs could not be placed on.
    pub untabbed: usize,
}

/// Everything a finished job produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobOutput {
    /// Output slices, indexed in order.
    pub slices: Vec<Slice>,
    /// Paths that were cut without tabs because no tab could be placed.
    pub untabbed_paths: usize,
    /// Largest tool used, for travel planning.
    pub max_tool_diameter: f64,
}

/// One toolpath job over a part.
///
/// # Example
///
/// ```ignore
/// let slicer = MeshSlicer::new(&mesh)?;
/// let tools = ToolLibrary::default_library();
/// let output = CamJob::new(&slicer, &tools, &config).run(&NoProgress)?;
/// ```
pub struct CamJob<'a> {
    provider: &'a dyn CrossSectionProvider,
    tools: &'a dyn ToolResolver,
    config: &'a ProcessConfig,
    ops: Box<dyn PolygonOps + 'a>,
    cancel: CancelToken,
}

impl<'a> CamJob<'a> {
    /// A job using the default polygon backend.
    pub fn new(
        provider: &'a dyn CrossSectionProvider,
        tools: &'a dyn ToolResolver,
        config: &'a ProcessConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
            ops: Box::new(ContourOps::new()),
            cancel: CancelToken::new(),
        }
    }

    /// Use another polygon backend.
    pub fn with_ops(mut self, ops: impl PolygonOps + 'a) -> Self {
        self.ops = Box::new(ops);
        self
    }

    /// Stop at the next operation boundary once `cancel` is set.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that cancels this job.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run every enabled operation.
    ///
    /// Configuration errors are returned before any slicing. A cancelled job
    /// returns [`CamError::Cancelled`] and no slices.
    pub fn run(&self, progress: &dyn ProgressSink) -> Result<JobOutput> {
        let config = self.config;
        let plan = validate(config, self.provider.bounds())?;
        info!(
            rough = plan.rough,
            outline = plan.outline,
            contour = plan.contour(),
            drill = plan.drill,
            "starting toolpath job"
        );

        let rough_tool = self.tool_if(plan.rough || plan.facing, config.rough_tool)?;
        let outline_tool = self.tool_if(plan.outline, config.outline_tool)?;
        let contour_tool = self.tool_if(plan.contour(), config.contour_tool)?;
        let drill_tool = self.tool_if(plan.drill || plan.registration, config.drill_tool)?;
        let max_tool_diameter = [rough_tool, outline_tool, contour_tool, drill_tool]
            .iter()
            .flatten()
            .map(|t| t.flute_diameter())
            .fold(0.0, f64::max);

        let mut phases = vec![Phase::Mapping];
        if plan.rough {
            phases.extend([Phase::Roughing, Phase::RoughOffset]);
        }
        if plan.outline {
            phases.push(Phase::Outline);
        }
        if plan.contour() {
            phases.push(Phase::Contour);
        }
        let mut tracker = PhaseTracker::new(progress, phases);
        let ctx = PhaseContext {
            provider: self.provider,
            ops: self.ops.as_ref(),
            config,
            plan: &plan,
        };

        self.cancel.check()?;
        let mapping = map_part(&ctx, &mut tracker)?;

        let mut slices = Vec::new();
        let mut untabbed_paths = 0;

        if let Some(tool) = rough_tool.filter(|_| plan.facing) {
            self.cancel.check()?;
            slices.extend(facing::facing_slices(
                ctx.ops,
                &plan,
                config,
                tool.flute_diameter(),
                &mapping.shadow,
            )?);
        }

        if let Some(tool) = rough_tool.filter(|_| plan.rough) {
            self.cancel.check()?;
            let out = roughing::rough_slices(&ctx, tool.flute_diameter(), &mapping, &mut tracker)?;
            untabbed_paths += out.untabbed;
            slices.extend(out.slices);
        }

        if let Some(tool) = outline_tool {
            self.cancel.check()?;
            let out = outline::outline_slices(&ctx, tool.flute_diameter(), &mut tracker)?;
            untabbed_paths += out.untabbed;
            slices.extend(out.slices);
        }

        if let Some(tool) = contour_tool {
            self.cancel.check()?;
            slices.extend(contour::contour_slices(&ctx, tool, &mapping, &mut tracker)?);
        }

        if let Some(tool) = drill_tool {
            self.cancel.check()?;
            if plan.drill {
                slices.extend(drill_slices(&mapping.sections, tool.flute_diameter()));
            }
            if let (true, Some(stock), Some(axis)) = (plan.registration, plan.stock, config.drill_reg) {
                slices.push(registration_slice(&plan.bounds, &stock, axis, plan.z_thru));
            }
        }

        for (index, slice) in slices.iter_mut().enumerate() {
            slice.index = index;
        }
        tracker.finish();
        info!(slices = slices.len(), untabbed_paths, "toolpath job complete");

        Ok(JobOutput {
            slices,
            untabbed_paths,
            max_tool_diameter,
        })
    }

    fn tool_if(&self, needed: bool, number: u32) -> Result<Option<&'a Tool>> {
        if !needed {
            return Ok(None);
        }
        let tool = self
            .tools
            .resolve(number)
            .ok_or(CamError::UnknownTool(number))?;
        let d = tool.flute_diameter();
        if !d.is_finite() || d <= 0.0 {
            return Err(CamError::InvalidConfig(format!(
                "tool {number} has flute diameter {d}"
            )));
        }
        Ok(Some(tool))
    }
}

/// Dense top-down pass that records every section and the full shadow.
fn map_part(ctx: &PhaseContext<'_>, tracker: &mut PhaseTracker<'_>) -> Result<Mapping> {
    tracker.enter(Phase::Mapping);
    let levels = ctx.provider.interval(
        ctx.plan.map_step,
        &IntervalOptions {
            min: None,
            fit: true,
            down: true,
            flats: true,
            offset: MAP_TOP_OFFSET,
        },
    )?;
    let sections = ctx.provider.slice(&levels, &SliceOptions::default())?;

    let mut shadow = ShadowAccumulator::new(ctx.ops);
    let total = sections.len();
    for (index, section) in sections.iter().enumerate() {
        shadow.add(&section.tops)?;
        tracker.step(index + 1, total, None);
    }

    debug!(levels = total, area = shadow.area(), "mapped part");
    Ok(Mapping {
        shadow: shadow.into_shapes(),
        sections,
    })
}
