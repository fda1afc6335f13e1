//! Job parameters.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A machine axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// X axis.
    X,
    /// Y axis.
    Y,
    /// Z axis.
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        };
        f.write_str(name)
    }
}

/// Length units of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Units {
    /// Millimetres.
    #[default]
    #[serde(rename = "mm")]
    Millimeters,
    /// Inches.
    #[serde(rename = "in")]
    Inches,
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Units::Millimeters => "mm",
            Units::Inches => "in",
        })
    }
}

/// Raw stock dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockSize {
    /// Width along X.
    pub x: f64,
    /// Depth along Y.
    pub y: f64,
    /// Height along Z.
    pub z: f64,
}

/// Which mid-axis registration holes are drilled along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationAxis {
    /// Two holes left and right of the part.
    X,
    /// Two holes in front of and behind the part.
    Y,
}

/// Machining parameters for one job. Read-only for the life of the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Enable roughing (and facing when a top offset is set).
    pub rough_on: bool,
    /// Roughing tool number.
    pub rough_tool: u32,
    /// Roughing step-down.
    pub rough_down: f64,
    /// Roughing step-over as a fraction of tool diameter.
    pub rough_over: f64,
    /// Material left on walls by roughing.
    pub rough_stock: f64,
    /// Only clear inside the part silhouette.
    pub rough_inside: bool,
    /// Leave through-holes uncut instead of clearing them.
    pub rough_voids: bool,
    /// Snap roughing levels to planar shelves.
    pub rough_flat: bool,
    /// Face the top of the part even without a top offset.
    pub rough_top: bool,

    /// Enable outline cutting.
    pub outline_on: bool,
    /// Outline tool number.
    pub outline_tool: u32,
    /// Outline step-down.
    pub outline_down: f64,
    /// Cut interior pockets only, not the outer profile.
    pub outline_pocket: bool,
    /// Add wider rings around the profile to clear a slot.
    pub outline_wide: bool,
    /// Extra half-diameter rings added by wide clearing.
    pub outline_wide_passes: u32,

    /// Contour along X.
    pub contour_x: bool,
    /// Contour along Y.
    pub contour_y: bool,
    /// Contouring tool number.
    pub contour_tool: u32,
    /// Contour step-over as a fraction of tool diameter.
    pub contour_over: f64,
    /// Keep the contour inside the part silhouette.
    pub contour_inside: bool,
    /// Drop low-angle points to favour smooth motion.
    pub contour_curves: bool,
    /// Minimum slope in degrees kept in curves-only mode.
    pub contour_angle: f64,
    /// Raster cell size for contouring.
    pub contour_resolution: f64,

    /// Enable hole drilling.
    pub drill_on: bool,
    /// Drill tool number.
    pub drill_tool: u32,
    /// Drill registration holes along an axis.
    pub drill_reg: Option<RegistrationAxis>,

    /// Leave tabs on the lowest passes.
    pub tabs_on: bool,
    /// Tab width.
    pub tabs_width: f64,
    /// Tab height above the bottom.
    pub tabs_height: f64,
    /// Number of tabs around each path.
    pub tabs_count: u32,
    /// Angle of the first tab in degrees.
    pub tabs_angle: f64,

    /// Stock above the part top, removed by facing.
    pub z_top_offset: f64,
    /// Lowest Z to machine.
    pub z_bottom: f64,
    /// Extra depth below the part for through cuts.
    pub z_thru: f64,
    /// Stock dimensions, when stock is enabled.
    pub stock: Option<StockSize>,
    /// Units of every length in this config.
    pub units: Units,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            rough_on: false,
            rough_tool: 1,
            rough_down: 2.0,
            rough_over: 0.4,
            rough_stock: 0.0,
            rough_inside: false,
            rough_voids: false,
            rough_flat: false,
            rough_top: false,
            outline_on: false,
            outline_tool: 1,
            outline_down: 2.0,
            outline_pocket: false,
            outline_wide: false,
            outline_wide_passes: 1,
            contour_x: false,
            contour_y: false,
            contour_tool: 2,
            contour_over: 0.5,
            contour_inside: false,
            contour_curves: false,
            contour_angle: 5.0,
            contour_resolution: 0.1,
            drill_on: false,
            drill_tool: 4,
            drill_reg: None,
            tabs_on: false,
            tabs_width: 5.0,
            tabs_height: 2.0,
            tabs_count: 4,
            tabs_angle: 45.0,
            z_top_offset: 0.0,
            z_bottom: 0.0,
            z_thru: 0.0,
            stock: None,
            units: Units::Millimeters,
        }
    }
}

impl ProcessConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
