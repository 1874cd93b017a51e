//! Error types for the survey service
//!
//! Wraps the per-crate errors:
//! - Design configuration failures
//! - Lease and store failures
//! - Runtime settings problems

use survey_design::DesignError;
use survey_lease::{LeaseError, ProjectId, StoreError};

/// Main survey service error type
#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    /// Project configuration rejected or design generation failed
    #[error("design error: {0}")]
    Design(#[from] DesignError),

    /// Lease operation failed
    #[error("lease error: {0}")]
    Lease(#[from] LeaseError),

    /// Store call failed outside a lease operation
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Project id already registered
    #[error("project {0} already exists")]
    ProjectExists(ProjectId),

    /// Project id never registered
    #[error("unknown project: {0}")]
    UnknownProject(ProjectId),

    /// Runtime settings invalid
    #[error("settings error: {0}")]
    Settings(String),

    /// Settings file unreadable
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SurveyError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Lease(e) => e.is_retryable(),
            Self::Store(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Check if error comes from invalid configuration
    #[inline]
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Design(_) | Self::Settings(_))
    }
}
