//! Error types for polygon algebra.

use thiserror::Error;

/// Errors raised by a polygon backend.
///
/// An empty result is not an error: offsetting a shape until it vanishes is
/// how progressive insets terminate.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeomError {
    /// Boolean union failed inside the backend.
    #[error("polygon union failed: {0}")]
    UnionFailed(String),

    /// Offset failed inside the backend.
    #[error("polygon offset by {distance} failed: {reason}")]
    OffsetFailed {
        /// Requested offset distance.
        distance: f64,
        /// Backend diagnostic.
        reason: String,
    },

    /// Input contained non-finite coordinates.
    #[error("non-finite coordinate in polygon input")]
    NonFinite,
}

/// Result type for geometry operations.
pub type Result<T> = std::result::Result<T, GeomError>;
