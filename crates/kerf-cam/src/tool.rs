//! Tool definitions and contact profiles.

use serde::{Deserialize, Serialize};

/// A cutting tool definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Tool {
    /// Flat end mill for general machining.
    FlatEndMill {
        /// Tool diameter.
        diameter: f64,
    },
    /// Ball end mill for 3D contouring.
    BallEndMill {
        /// Tool diameter.
        diameter: f64,
    },
    /// Bull end mill (corner radius) for 3D machining.
    BullEndMill {
        /// Tool diameter.
        diameter: f64,
        /// Corner radius.
        corner_radius: f64,
    },
    /// V-bit or tapered cutter.
    VBit {
        /// Tool diameter at widest point.
        diameter: f64,
        /// Included angle in degrees (e.g., 60, 90).
        angle: f64,
    },
    /// Drill bit for hole making.
    Drill {
        /// Drill diameter.
        diameter: f64,
        /// Point angle in degrees (typically 118 or 135).
        point_angle: f64,
    },
}

impl Tool {
    /// Cutting diameter of the flutes.
    pub fn flute_diameter(&self) -> f64 {
        match self {
            Tool::FlatEndMill { diameter }
            | Tool::BallEndMill { diameter }
            | Tool::BullEndMill { diameter, .. }
            | Tool::VBit { diameter, .. }
            | Tool::Drill { diameter, .. } => *diameter,
        }
    }

    /// Half the flute diameter.
    pub fn radius(&self) -> f64 {
        self.flute_diameter() / 2.0
    }

    /// Height of the cutting surface above the tip at lateral distance `r`
    /// from the tool axis.
    fn rise_at(&self, r: f64) -> f64 {
        let radius = self.radius();
        match self {
            Tool::FlatEndMill { .. } => 0.0,
            Tool::BallEndMill { .. } => radius - (radius * radius - r * r).max(0.0).sqrt(),
            Tool::BullEndMill { corner_radius, .. } => {
                let c = corner_radius.clamp(0.0, radius);
                let flat = radius - c;
                if r <= flat {
                    0.0
                } else {
                    let d = r - flat;
                    c - (c * c - d * d).max(0.0).sqrt()
                }
            }
            Tool::VBit { angle, .. } => cone_rise(r, *angle),
            Tool::Drill { point_angle, .. } => cone_rise(r, *point_angle),
        }
    }

    /// Sample the cutter's underside on a grid of `resolution` cells.
    ///
    /// Every cell whose center lies within the tool radius becomes one
    /// sample. The sample's `dz` is how far the tool tip sits below the
    /// surface it touches at that offset, so a tool centered over a raster
    /// cell rests at `max(dz + height(cell + offset))`.
    pub fn contact_profile(&self, resolution: f64) -> ToolProfile {
        let radius = self.radius();
        if resolution <= 0.0 || radius <= 0.0 {
            return ToolProfile::point();
        }
        let steps = (radius / resolution).floor() as i32;
        let mut samples = Vec::new();
        for dx in -steps..=steps {
            for dy in -steps..=steps {
                let r = ((dx * dx + dy * dy) as f64).sqrt() * resolution;
                if r <= radius {
                    samples.push(ProfileSample {
                        dx,
                        dy,
                        dz: -self.rise_at(r),
                    });
                }
            }
        }
        ToolProfile { samples }
    }
}

fn cone_rise(r: f64, included_angle: f64) -> f64 {
    let half = (included_angle.clamp(1.0, 179.0) / 2.0).to_radians();
    r / half.tan()
}

/// One sample of a tool's contact profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileSample {
    /// Lateral offset in raster cells along X.
    pub dx: i32,
    /// Lateral offset in raster cells along Y.
    pub dy: i32,
    /// Tip height relative to the touched surface (zero or negative).
    pub dz: f64,
}

/// A cutter's underside sampled on the raster grid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolProfile {
    /// Samples in no particular order.
    pub samples: Vec<ProfileSample>,
}

impl ToolProfile {
    /// A single sample at the tool center.
    pub fn point() -> Self {
        Self {
            samples: vec![ProfileSample {
                dx: 0,
                dy: 0,
                dz: 0.0,
            }],
        }
    }
}

/// A tool entry in a tool library with metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolEntry {
    /// Tool number (T1, T2, etc.).
    pub number: u32,
    /// Tool name/description.
    pub name: String,
    /// The tool definition.
    pub tool: Tool,
}

impl ToolEntry {
    /// Create a new tool entry.
    pub fn new(number: u32, name: impl Into<String>, tool: Tool) -> Self {
        Self {
            number,
            name: name.into(),
            tool,
        }
    }
}

/// Looks tools up by number.
pub trait ToolResolver: Sync {
    /// The tool registered under `number`.
    fn resolve(&self, number: u32) -> Option<&Tool>;
}

/// A collection of tools available for a job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolLibrary {
    /// The tools in this library.
    pub tools: Vec<ToolEntry>,
}

impl ToolLibrary {
    /// Create a new empty tool library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool to the library.
    pub fn add(&mut self, entry: ToolEntry) {
        self.tools.push(entry);
    }

    /// Get a tool by its number.
    pub fn get_by_number(&self, number: u32) -> Option<&ToolEntry> {
        self.tools.iter().find(|t| t.number == number)
    }

    /// Create a default library with common tools.
    pub fn default_library() -> Self {
        let mut lib = Self::new();
        lib.add(ToolEntry::new(1, "6mm Flat Endmill", Tool::FlatEndMill { diameter: 6.0 }));
        lib.add(ToolEntry::new(2, "6mm Ball Endmill", Tool::BallEndMill { diameter: 6.0 }));
        lib.add(ToolEntry::new(
            3,
            "6mm Bull Endmill R1",
            Tool::BullEndMill {
                diameter: 6.0,
                corner_radius: 1.0,
            },
        ));
        lib.add(ToolEntry::new(
            4,
            "3mm Drill",
            Tool::Drill {
                diameter: 3.0,
                point_angle: 118.0,
            },
        ));
        lib.add(ToolEntry::new(
            5,
            "90° V-Bit",
            Tool::VBit {
                diameter: 6.0,
                angle: 90.0,
            },
        ));
        lib
    }
}

impl ToolResolver for ToolLibrary {
    fn resolve(&self, number: u32) -> Option<&Tool> {
        self.get_by_number(number).map(|e| &e.tool)
    }
}
