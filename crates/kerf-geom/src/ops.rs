//! Polygon algebra capability.

use tracing::warn;

use crate::{GeomError, Result, Shape};

/// Iteration cap for progressive offsets whose step never consumes the shape.
const MAX_OFFSET_PASSES: usize = 10_000;

/// Boolean union and offsetting over [`Shape`] sets.
///
/// Distances are signed: positive grows material outward (outers expand,
/// holes shrink), negative shrinks it. An empty result is a normal outcome
/// and means the offset consumed the input.
pub trait PolygonOps: Send + Sync {
    /// Union all shapes. Vertices closer than `tolerance` are merged.
    fn union(&self, shapes: &[Shape], tolerance: f64) -> Result<Vec<Shape>>;

    /// Offset all shapes by `distance`.
    fn offset(&self, shapes: &[Shape], distance: f64) -> Result<Vec<Shape>>;

    /// Grow outward by `distance`; a zero distance returns the input.
    fn expand(&self, shapes: &[Shape], distance: f64) -> Result<Vec<Shape>> {
        if distance == 0.0 {
            return Ok(shapes.to_vec());
        }
        self.offset(shapes, distance)
    }

    /// Progressive offsets: one pass at `first`, then further passes `step`
    /// apart, until a pass vanishes or `max_passes` is reached.
    ///
    /// Every pass is offset from the input by its total distance rather than
    /// from the previous pass. A pass the backend cannot offset ends the
    /// sequence; the passes built so far are kept.
    ///
    /// Each entry carries its pass index, starting at 0.
    fn offset_rings(
        &self,
        shapes: &[Shape],
        first: f64,
        step: f64,
        max_passes: Option<usize>,
    ) -> Result<Vec<(u32, Vec<Shape>)>> {
        let limit = max_passes.unwrap_or(MAX_OFFSET_PASSES).min(MAX_OFFSET_PASSES);
        let mut out = Vec::new();
        let mut distance = first;

        while out.len() < limit {
            let pass = match self.offset(shapes, distance) {
                Ok(pass) => pass,
                Err(GeomError::OffsetFailed { distance, reason }) => {
                    warn!(distance, %reason, passes = out.len(), "offset pass failed, stopping");
                    break;
                }
                Err(e) => return Err(e),
            };
            if pass.is_empty() {
                break;
            }
            out.push((out.len() as u32, pass));
            if step == 0.0 {
                break;
            }
            distance += step;
        }

        Ok(out)
    }
}
