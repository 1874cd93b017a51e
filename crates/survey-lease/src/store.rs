//! Persistent store seam
//!
//! The lease manager never touches plot state directly. All lease changes go
//! through a [`LeaseTransaction`]:
//! - Reads inside a transaction see its own uncommitted writes
//! - `commit` publishes every write at once
//! - Dropping a transaction without committing discards its writes
//!
//! Implementations must treat an expired lease as unassigned when searching
//! and must keep at most one active lease per plot and per user.

use crate::error::StoreError;
use crate::model::{EligibilityQuery, NewPlot, Plot, PlotId, ProjectId, ProjectSummary, Submission, UserId};
use chrono::{DateTime, Utc};

/// Durable plot, sample and lease records
#[async_trait::async_trait]
pub trait PlotStore: Send + Sync + std::fmt::Debug {
    /// Insert a project's plots and samples, all or nothing
    ///
    /// Returns the new plot ids in input order.
    ///
    /// # Errors
    /// - `StoreError::AlreadyPopulated` if the project already has plots
    /// - `StoreError::Unavailable` on store failure
    async fn create_plots_and_samples(
        &self,
        project_id: ProjectId,
        plots: Vec<NewPlot>,
    ) -> Result<Vec<PlotId>, StoreError>;

    /// Open a transaction
    async fn begin(&self) -> Result<Box<dyn LeaseTransaction>, StoreError>;

    /// Committed state of one plot
    async fn load_plot(&self, plot_id: PlotId) -> Result<Option<Plot>, StoreError>;

    /// Up to `limit` plots of a project in id order
    async fn list_plots(&self, project_id: ProjectId, limit: usize) -> Result<Vec<Plot>, StoreError>;

    /// Plot counts for a project, leases evaluated at `now`
    async fn project_summary(
        &self,
        project_id: ProjectId,
        now: DateTime<Utc>,
    ) -> Result<ProjectSummary, StoreError>;
}

/// One atomic unit of lease changes
#[async_trait::async_trait]
pub trait LeaseTransaction: Send {
    /// Search for an eligible plot
    async fn find_eligible_plot(&mut self, query: &EligibilityQuery) -> Result<Option<PlotId>, StoreError>;

    /// Lease a plot to a user until `expires_at`
    ///
    /// Any other lease held by the user is cleared.
    ///
    /// # Errors
    /// - `StoreError::UnknownPlot` if the plot does not exist
    /// - `StoreError::LeaseHeld` if another user holds an active lease
    async fn grant_lease(
        &mut self,
        plot_id: PlotId,
        user_id: UserId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Clear the user's lease, returning the plot it was on
    async fn release_lease(&mut self, user_id: UserId) -> Result<Option<PlotId>, StoreError>;

    /// Move the expiry of an active lease held by `user_id`
    ///
    /// Returns false and changes nothing if the user holds no active lease on
    /// the plot.
    async fn extend_lease(
        &mut self,
        plot_id: PlotId,
        user_id: UserId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Overwrite the user's record on a plot; a final submission completes it
    async fn record_sample_values(
        &mut self,
        plot_id: PlotId,
        user_id: UserId,
        submission: &Submission,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Mark a plot flagged on behalf of a user
    async fn flag_plot(&mut self, plot_id: PlotId, user_id: UserId) -> Result<(), StoreError>;

    /// Plot state as seen by this transaction
    async fn load_plot(&mut self, plot_id: PlotId) -> Result<Option<Plot>, StoreError>;

    /// Publish every write
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
