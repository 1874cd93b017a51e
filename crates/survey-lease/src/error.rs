//! Error types for plot leasing
//!
//! Two layers:
//! - `StoreError`: failures reported by a persistent store implementation
//! - `LeaseError`: failures surfaced by the lease manager to its callers
//!
//! An exhausted queue is not an error. `acquire_next` and `acquire_previous`
//! return `Ok(None)`; only `acquire_by_id` reports `LeaseError::NotFound`.

use crate::model::{PlotId, ProjectId};

/// Persistent store errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Store could not be reached or rejected the transaction
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Referenced plot does not exist
    #[error("unknown plot: {0}")]
    UnknownPlot(PlotId),

    /// Plots were already created for this project
    #[error("project {0} already has plots")]
    AlreadyPopulated(ProjectId),

    /// Another user holds an active lease on the plot
    #[error("plot {plot_id} is leased by another user")]
    LeaseHeld {
        /// Contested plot
        plot_id: PlotId,
    },
}

impl StoreError {
    /// Check if the failure is transient
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Lease manager errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeaseError {
    /// No plot with this id matched the scope
    #[error("plot {plot_id} not found in project {project_id} for the requested scope")]
    NotFound {
        /// Project searched
        project_id: ProjectId,
        /// Requested plot
        plot_id: PlotId,
    },

    /// Submission failed validation
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),

    /// Store failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl LeaseError {
    /// Check if the caller may retry
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retryable())
    }

    /// Check if this is an expected not-found outcome
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_retryable() {
        assert!(LeaseError::from(StoreError::Unavailable("down".into())).is_retryable());
        assert!(!LeaseError::from(StoreError::UnknownPlot(PlotId(3))).is_retryable());
        assert!(!LeaseError::InvalidSubmission("x".into()).is_retryable());

        let not_found = LeaseError::NotFound {
            project_id: ProjectId(1),
            plot_id: PlotId(2),
        };
        assert!(not_found.is_not_found());
        assert!(!not_found.is_retryable());
    }

    #[test]
    fn messages_name_ids() {
        let err = StoreError::LeaseHeld { plot_id: PlotId(9) };
        assert_eq!(err.to_string(), "plot 9 is leased by another user");
    }
}
