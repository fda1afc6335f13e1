#![warn(missing_docs)]

//! Subtractive CAM toolpath generation for kerf.
//!
//! Turns a part and a [`ProcessConfig`] into an ordered list of [`Slice`]s,
//! each a Z level tagged with the operation that produced it and carrying
//! its toolpaths.
//!
//! # Operations
//!
//! - Facing - level passes over stock above the part top
//! - Roughing - clearing rings that never cut into material above the level
//! - Outline - profile rings, optionally pocket-only or widened
//! - Contour - X/Y surface passes over a height raster ([`TopoGrid`])
//! - Drilling - plunges at round holes matching the drill, plus registration holes
//!
//! Tabs can be left on the lowest roughing, outline and contour passes.
//!
//! # Example
//!
//! ```
//! use kerf_cam::{generate, NoProgress, ProcessConfig, ToolLibrary};
//! use kerf_geom::Point3;
//! use kerf_slicer::TriangleMesh;
//!
//! let mesh = TriangleMesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(40.0, 20.0, 6.0));
//! let config = ProcessConfig {
//!     outline_on: true,
//!     outline_down: 2.0,
//!     ..Default::default()
//! };
//!
//! let output = generate(&mesh, &config, &ToolLibrary::default_library(), &NoProgress).unwrap();
//! assert!(!output.slices.is_empty());
//! ```

pub mod config;
pub mod drill;
mod error;
pub mod pipeline;
mod progress;
pub mod shadow;
mod slice;
pub mod tabs;
mod tool;
pub mod topo;

// Re-exports
pub use config::{Axis, ProcessConfig, RegistrationAxis, StockSize, Units};
pub use error::{CamError, Result};
pub use pipeline::{CamJob, JobOutput, JobPlan};
pub use progress::{CancelToken, NoProgress, Phase, PhaseTracker, ProgressSink};
pub use slice::{CamMode, Slice};
pub use tool::{ProfileSample, Tool, ToolEntry, ToolLibrary, ToolProfile, ToolResolver};
pub use topo::{ContourMode, ContourOptions, TopoGrid};

use kerf_slicer::{MeshSlicer, TriangleMesh};

/// Slice a triangle mesh and run every enabled operation on it.
pub fn generate(
    mesh: &TriangleMesh,
    config: &ProcessConfig,
    tools: &dyn ToolResolver,
    progress: &dyn ProgressSink,
) -> Result<JobOutput> {
    let slicer = MeshSlicer::new(mesh)?;
    // the job borrows `slicer` and must drop first
    let output = CamJob::new(&slicer, tools, config).run(progress);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerf_geom::Point3;

    #[test]
    fn test_output_serialization() {
        let mesh = TriangleMesh::cuboid(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 10.0, 2.0));
        let config = ProcessConfig {
            outline_on: true,
            ..Default::default()
        };
        let output = generate(&mesh, &config, &ToolLibrary::default_library(), &NoProgress).unwrap();
        let json = serde_json::to_string(&output).unwrap();
        let parsed: JobOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.slices.len(), output.slices.len());
        assert_eq!(parsed.max_tool_diameter, 6.0);
        assert!(json.contains("\"OUTLINE\""));
    }

    #[test]
    fn test_empty_mesh_is_an_error() {
        let mesh = TriangleMesh::from_triangles(&[]);
        let config = ProcessConfig {
            outline_on: true,
            ..Default::default()
        };
        let err = generate(&mesh, &config, &ToolLibrary::default_library(), &NoProgress).unwrap_err();
        assert!(matches!(err, CamError::Slicer(_)));
    }
}
