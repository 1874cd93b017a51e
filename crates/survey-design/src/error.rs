//! Error types for project configuration and design generation
//!
//! Every variant is fatal to the generation request it came from: nothing is
//! written and nothing is retried.

use survey_geo::GeoError;

/// Design error type
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DesignError {
    /// Distribution method is not one of the supported names
    #[error("unsupported {stage} distribution: {value}")]
    UnsupportedDistribution {
        /// `plot` or `sample`
        stage: &'static str,
        /// The rejected value
        value: String,
    },

    /// Plot shape is not `circle` or `square`
    #[error("unsupported plot shape: {0}")]
    UnsupportedShape(String),

    /// A size, spacing or resolution is zero, negative or not finite
    #[error("{field} must be strictly positive, got {value}")]
    NonPositive {
        /// Offending field name
        field: &'static str,
        /// Offending value
        value: f64,
    },

    /// A field required by the selected distribution is absent
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Sample resolution exceeds plot size
    #[error("sample resolution {resolution} exceeds plot size {plot_size}")]
    ResolutionExceedsPlotSize {
        /// Requested sample resolution in meters
        resolution: f64,
        /// Plot size in meters
        plot_size: f64,
    },

    /// Boundary corners are out of order
    #[error("invalid boundary: {0}")]
    InvalidBoundary(String),

    /// Boundary cannot hold a single plot once padded by half the plot size
    #[error("boundary is too small for plots of {plot_size} m")]
    BoundaryTooSmall {
        /// Plot size in meters
        plot_size: f64,
    },

    /// External point list is empty or malformed
    #[error("invalid point list at line {line}: {message}")]
    InvalidPointList {
        /// 1-based line number, 0 when the whole list is at fault
        line: usize,
        /// What was wrong
        message: String,
    },

    /// Configuration implies more plot centers and samples than one design may hold
    #[error("design would produce {requested} points, limit is {max}")]
    TooManyPoints {
        /// Plot centers plus samples the configuration implies
        requested: u64,
        /// Largest accepted total
        max: u64,
    },

    /// Settings text could not be parsed
    #[error("settings parse error: {0}")]
    Parse(String),

    /// Reprojection failed
    #[error("geometry error: {0}")]
    Geometry(#[from] GeoError),
}

impl DesignError {
    /// Design errors are always configuration errors
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        true
    }

    #[inline]
    pub(crate) fn non_positive(field: &'static str, value: f64) -> Self {
        Self::NonPositive { field, value }
    }
}
