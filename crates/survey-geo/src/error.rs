//! Error types for reprojection and geometry
//!
//! All variants are configuration errors: they are raised by malformed input
//! and are never worth retrying.

use crate::projection::Frame;

/// Geometry error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    /// No transform is known for the requested frame pair
    #[error("unsupported frame pair: EPSG:{from} -> EPSG:{to}")]
    UnsupportedFrame {
        /// Source EPSG code
        from: u32,
        /// Target EPSG code
        to: u32,
    },

    /// EPSG code does not name a supported frame
    #[error("unknown frame: EPSG:{0}")]
    UnknownFrame(u32),

    /// Coordinate lies outside the domain of its frame
    #[error("invalid coordinate ({x}, {y}) in {frame}")]
    InvalidCoordinate {
        /// First axis value
        x: f64,
        /// Second axis value
        y: f64,
        /// Frame the coordinate was expressed in
        frame: Frame,
    },

    /// Geometry cannot be built from the given values
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
}

impl GeoError {
    /// Geometry errors are always configuration errors
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        true
    }
}
