//! Surface topography raster and X/Y contouring.
//!
//! The part is sliced with vertical planes, one per raster column, and the
//! upward-facing segments of each section are rasterized into a height
//! grid. Contour passes then walk the grid, dropping the tool profile onto
//! it at every cell.

use std::sync::atomic::{AtomicUsize, Ordering};

use kerf_geom::{Bounds3, Point2, Point3, Ring, Shape};
use kerf_slicer::{CrossSectionProvider, SliceAxis, SliceOptions};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CamError, Result};
use crate::slice::{CamMode, Slice};
use crate::tool::ToolProfile;

/// Raised above the floor so untouched cells never tie with real geometry.
const FLOOR_LIFT: f64 = 0.0001;

/// Progress callback: `(completed, total, label)`.
pub type TopoProgress<'a> = &'a (dyn Fn(usize, usize, &str) + Sync);

/// Height raster of the part's top surface.
///
/// Cell `(gx, gy)` is stored at `gx * steps_y + gy` and sampled at its
/// centre. Every cell is at least `floor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopoGrid {
    /// Cell heights.
    pub data: Vec<f64>,
    /// Columns along X.
    pub steps_x: usize,
    /// Rows along Y.
    pub steps_y: usize,
    /// Part bounds the grid covers.
    pub bounds: Bounds3,
    /// Cell size.
    pub resolution: f64,
    /// Height of untouched cells.
    pub floor: f64,
    /// Tool used to sample the grid.
    pub tool_diameter: f64,
    /// Tool underside sampled at `resolution`.
    pub profile: ToolProfile,
}

impl TopoGrid {
    /// Slice and rasterize the part.
    ///
    /// `progress` is called once per rasterized column with `extra_steps`
    /// added to the total, so the caller can continue counting through the
    /// contour passes.
    pub fn build(
        provider: &dyn CrossSectionProvider,
        resolution: f64,
        z_bottom: f64,
        tool_diameter: f64,
        profile: ToolProfile,
        extra_steps: usize,
        progress: TopoProgress<'_>,
    ) -> Result<Self> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(CamError::InvalidConfig(format!(
                "contour resolution must be positive, got {resolution}"
            )));
        }

        let bounds = provider.bounds();
        let steps_x = ((bounds.size_x() / resolution).ceil() as usize).max(1);
        let steps_y = ((bounds.size_y() / resolution).ceil() as usize).max(1);
        let floor = bounds.min.z.max(z_bottom) + FLOOR_LIFT;

        let columns: Vec<f64> = (0..steps_x)
            .map(|i| bounds.min.x + (i as f64 + 0.5) * resolution)
            .collect();
        let options = SliceOptions {
            axis: SliceAxis::X,
            tops: false,
            lines: true,
        };
        let sections = provider.slice(&columns, &options)?;

        let total = steps_x + extra_steps;
        let done = AtomicUsize::new(0);
        let min_y = bounds.min.y;
        let mut data = vec![floor; steps_x * steps_y];

        // one slicing plane per column, so columns are written independently
        data.par_chunks_mut(steps_y)
            .zip(sections.par_iter())
            .for_each(|(column, section)| {
                rasterize_column(column, &section.lines, min_y, resolution, floor);
                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                progress(n, total, "raster surface");
            });

        debug!(steps_x, steps_y, floor, "built topography raster");
        Ok(Self {
            data,
            steps_x,
            steps_y,
            bounds,
            resolution,
            floor,
            tool_diameter,
            profile,
        })
    }

    /// Height of a cell, `None` outside the grid.
    pub fn get(&self, gx: i64, gy: i64) -> Option<f64> {
        if gx < 0 || gy < 0 || gx >= self.steps_x as i64 || gy >= self.steps_y as i64 {
            return None;
        }
        self.data.get(gx as usize * self.steps_y + gy as usize).copied()
    }

    /// Height at which the tool centered on cell `(gx, gy)` first touches
    /// the surface, never below 0.
    pub fn tool_at_z(&self, gx: i64, gy: i64) -> f64 {
        let mut z = -1.0_f64;
        for s in &self.profile.samples {
            let height = self
                .get(gx + s.dx as i64, gy + s.dy as i64)
                .unwrap_or(self.floor);
            z = z.max(s.dz + height);
        }
        z.max(0.0)
    }

    /// Walk the grid along one axis and build one contour slice per scan
    /// line. Scan lines are processed in parallel; output keeps scan order.
    pub fn contour(
        &self,
        mode: ContourMode,
        options: &ContourOptions,
        progress: &(dyn Fn(&str) + Sync),
    ) -> Vec<Slice> {
        let b = &self.bounds;
        let res = self.resolution;
        let off = options.part_offset;
        let step = options.tool_step.max(res);

        // (scan axis min, scan axis size, walk axis min, walk axis max)
        let (p_min, p_size, w_min, w_max) = match mode {
            ContourMode::X => (b.min.x, b.size_x(), b.min.y, b.max.y),
            ContourMode::Y => (b.min.y, b.size_y(), b.min.x, b.max.x),
        };
        let p_end = p_min + p_size + off;

        let mut scans = Vec::new();
        let mut k = 0.0;
        loop {
            let p = p_min - off + k * step;
            if p > p_end + 1e-9 {
                break;
            }
            scans.push(p);
            k += 1.0;
        }

        let label = match mode {
            ContourMode::X => "contour x",
            ContourMode::Y => "contour y",
        };

        scans
            .par_iter()
            .filter_map(|&p| {
                let grid_p = cell_index(p, p_min, res);
                let mut runs = RunBuilder::new(options.curves_only, options.max_angle);

                let mut j = 0i64;
                loop {
                    let w = w_min - off + j as f64 * res;
                    if w >= w_max + off {
                        break;
                    }
                    let grid_w = cell_index(w, w_min, res);
                    let (gx, gy, point) = match mode {
                        ContourMode::X => (grid_p, grid_w, Point2::new(p, w)),
                        ContourMode::Y => (grid_w, grid_p, Point2::new(w, p)),
                    };
                    j += 1;

                    let mut z = self.tool_at_z(gx, gy);
                    if z < options.tab_height && options.tab_clips.iter().any(|t| t.contains(&point)) {
                        z = options.tab_height;
                    }
                    if let Some(clip) = &options.clip {
                        if !clip.iter().any(|s| s.contains(&point)) {
                            runs.break_run();
                            continue;
                        }
                    }
                    runs.push(Point3::new(point.x, point.y, z));
                }

                progress(label);
                let paths = runs.into_paths();
                let top = paths
                    .iter()
                    .filter_map(|p| p.max_z())
                    .reduce(f64::max)?;
                Some(Slice::new(top, mode.cam_mode()).with_lines(paths))
            })
            .collect()
    }
}

/// Rasterize the upward-facing segments of one vertical section.
fn rasterize_column(column: &mut [f64], lines: &[[Point3; 2]], min_y: f64, res: f64, floor: f64) {
    let segments: Vec<(Point3, Point3)> = lines
        .iter()
        .filter(|[a, b]| (a.y - b.y).abs() > 1e-12)
        .filter(|[a, b]| !(a.z < floor && b.z < floor))
        .map(|[a, b]| if a.y <= b.y { (*a, *b) } else { (*b, *a) })
        .collect();

    let rows = column.len();
    for (i, (lo, hi)) in segments.iter().enumerate() {
        if is_covered(i, segments.as_slice()) {
            continue;
        }
        let first = ((lo.y - min_y) / res - 0.5).ceil().max(0.0) as usize;
        let last = (((hi.y - min_y) / res - 0.5).floor().max(0.0) as usize).min(rows.saturating_sub(1));
        for (k, cell) in column.iter_mut().enumerate().take(last + 1).skip(first) {
            let y = min_y + (k as f64 + 0.5) * res;
            if y < lo.y || y > hi.y || (lo.z <= *cell && hi.z <= *cell) {
                continue;
            }
            let t = (y - lo.y) / (hi.y - lo.y);
            let z = lo.z + t * (hi.z - lo.z);
            if z > *cell {
                *cell = z.max(floor);
            }
        }
    }
}

/// Cell holding coordinate `v` on an axis starting at `min`. Cells are
/// sampled at their centres, so cell `i` covers `[min + i*res, min + (i+1)*res)`.
fn cell_index(v: f64, min: f64, res: f64) -> i64 {
    ((v - min) / res + 1e-9).floor() as i64
}

/// Whether another segment's Y range strictly contains this one's and the
/// other segment lies wholly above it.
fn is_covered(i: usize, segments: &[(Point3, Point3)]) -> bool {
    let (lo, hi) = segments[i];
    let top = lo.z.max(hi.z);
    segments.iter().enumerate().any(|(j, (a, b))| {
        j != i && a.z.min(b.z) > top && a.y < lo.y && b.y > hi.y
    })
}

/// Contour walk direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContourMode {
    /// Scan lines at constant X, walking Y.
    X,
    /// Scan lines at constant Y, walking X.
    Y,
}

impl ContourMode {
    /// Output mode tag.
    pub fn cam_mode(self) -> CamMode {
        match self {
            ContourMode::X => CamMode::ContourX,
            ContourMode::Y => CamMode::ContourY,
        }
    }
}

/// Per-job contouring parameters.
#[derive(Debug, Clone, Default)]
pub struct ContourOptions {
    /// Distance between scan lines.
    pub tool_step: f64,
    /// How far beyond the part bounds probing extends.
    pub part_offset: f64,
    /// Points outside every clip shape break the current run.
    pub clip: Option<Vec<Shape>>,
    /// Regions where the tool is held at `tab_height`.
    pub tab_clips: Vec<Ring>,
    /// Minimum height inside tab regions.
    pub tab_height: f64,
    /// Curves-only point reduction.
    pub curves_only: bool,
    /// Minimum slope in degrees kept in curves-only mode.
    pub max_angle: f64,
}

/// Turns a stream of sampled points into open runs.
///
/// Consecutive points at the same height collapse to the first and last of
/// the stretch. In curves-only mode a same-height point ends the run instead,
/// and points whose slope from the previous point is below `max_angle` are
/// skipped.
#[derive(Debug, Clone)]
pub struct RunBuilder {
    curves_only: bool,
    max_angle: f64,
    runs: Vec<Vec<Point3>>,
    current: Vec<Point3>,
    latent: Option<Point3>,
    last: Option<Point3>,
}

impl RunBuilder {
    /// An empty builder.
    pub fn new(curves_only: bool, max_angle: f64) -> Self {
        Self {
            curves_only,
            max_angle,
            runs: Vec::new(),
            current: Vec::new(),
            latent: None,
            last: None,
        }
    }

    /// Offer the next sampled point.
    pub fn push(&mut self, p: Point3) {
        match self.last {
            Some(last) if last.z == p.z => {
                if self.curves_only {
                    self.break_run();
                } else {
                    self.latent = Some(p);
                }
            }
            last => {
                if let Some(latent) = self.latent.take() {
                    self.current.push(latent);
                }
                if let (true, Some(last)) = (self.curves_only, last) {
                    let dz = (last.z - p.z).abs();
                    let dxy = (last.x - p.x).abs().max((last.y - p.y).abs());
                    if dz.atan2(dxy).to_degrees() < self.max_angle {
                        self.last = Some(p);
                        return;
                    }
                }
                self.current.push(p);
            }
        }
        self.last = Some(p);
    }

    /// End the current run.
    pub fn break_run(&mut self) {
        if let Some(latent) = self.latent.take() {
            self.current.push(latent);
        }
        if !self.current.is_empty() {
            self.runs.push(std::mem::take(&mut self.current));
        }
        self.last = None;
    }

    /// Every finished run, including single-point ones.
    pub fn runs(&self) -> &[Vec<Point3>] {
        &self.runs
    }

    /// Close the last run and keep runs of two points or more as open paths.
    pub fn into_paths(mut self) -> Vec<kerf_geom::Path> {
        self.break_run();
        self.runs
            .into_iter()
            .filter(|r| r.len() >= 2)
            .map(kerf_geom::Path::open)
            .collect()
    }
}
