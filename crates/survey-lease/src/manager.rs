//! Plot lease manager
//!
//! Hands plots to concurrent reviewers with exclusive, time-limited ownership.
//! Every acquisition runs as one store transaction:
//! 1. Release the caller's current lease
//! 2. Find the eligible plot
//! 3. Grant the caller a lease on it
//! 4. Commit
//!
//! Other callers observe either the state before or after all four steps.
//! Leases expire passively: an expired lease reads as unassigned at the next
//! search and is overwritten on the next grant.

use crate::clock::{Clock, SystemClock};
use crate::error::{LeaseError, StoreError};
use crate::model::{
    Direction, EligibilityQuery, Plot, PlotId, ProjectId, ProjectSummary, Scope, Submission, UserId,
};
use crate::store::PlotStore;
use chrono::TimeDelta;
use std::sync::Arc;

/// Default lease length in seconds
pub const DEFAULT_LEASE_SECS: i64 = 300;

/// Highest accepted submission confidence
pub const MAX_CONFIDENCE: u8 = 100;

/// Coordinates plot leases over a [`PlotStore`]
#[derive(Debug, Clone)]
pub struct LeaseManager {
    store: Arc<dyn PlotStore>,
    clock: Arc<dyn Clock>,
    lease_duration: TimeDelta,
}

impl LeaseManager {
    /// Create a manager on the wall clock with the default lease length
    #[must_use]
    pub fn new(store: Arc<dyn PlotStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            lease_duration: TimeDelta::seconds(DEFAULT_LEASE_SECS),
        }
    }

    /// Use a different time source
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a different lease length
    #[inline]
    #[must_use]
    pub fn with_lease_duration(mut self, lease_duration: TimeDelta) -> Self {
        self.lease_duration = lease_duration;
        self
    }

    /// Lease length
    #[inline]
    #[must_use]
    pub fn lease_duration(&self) -> TimeDelta {
        self.lease_duration
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn PlotStore> {
        &self.store
    }

    /// Lease the first eligible plot after `after`
    ///
    /// Releases the caller's current lease even when nothing is found.
    /// `Ok(None)` means the queue is exhausted.
    ///
    /// # Errors
    /// - `LeaseError::Store` on store failure; no lease state changes
    pub async fn acquire_next(
        &self,
        project_id: ProjectId,
        after: PlotId,
        user_id: UserId,
        scope: Scope,
    ) -> Result<Option<Plot>, LeaseError> {
        self.acquire(project_id, Direction::Next, after, user_id, scope, true)
            .await
    }

    /// Lease the last eligible plot before `before`
    ///
    /// # Errors
    /// - `LeaseError::Store` on store failure; no lease state changes
    pub async fn acquire_previous(
        &self,
        project_id: ProjectId,
        before: PlotId,
        user_id: UserId,
        scope: Scope,
    ) -> Result<Option<Plot>, LeaseError> {
        self.acquire(project_id, Direction::Previous, before, user_id, scope, true)
            .await
    }

    /// Lease a specific plot
    ///
    /// Unlike [`LeaseManager::acquire_next`], a miss leaves the caller's lease
    /// in place: a request for one named plot that fails does not move the
    /// caller off the plot it is working on.
    ///
    /// # Errors
    /// - `LeaseError::NotFound` if the plot is missing or outside `scope`; the
    ///   caller keeps its current lease
    /// - `LeaseError::Store` on store failure
    pub async fn acquire_by_id(
        &self,
        project_id: ProjectId,
        plot_id: PlotId,
        user_id: UserId,
        scope: Scope,
    ) -> Result<Plot, LeaseError> {
        self.acquire(project_id, Direction::Exact, plot_id, user_id, scope, false)
            .await?
            .ok_or(LeaseError::NotFound {
                project_id,
                plot_id,
            })
    }

    async fn acquire(
        &self,
        project_id: ProjectId,
        direction: Direction,
        anchor: PlotId,
        user_id: UserId,
        scope: Scope,
        release_on_miss: bool,
    ) -> Result<Option<Plot>, LeaseError> {
        let now = self.clock.now();
        let query = EligibilityQuery {
            project_id,
            scope,
            direction,
            anchor,
            user_id,
            now,
        };

        let mut tx = self.store.begin().await.inspect_err(log_store_failure)?;
        let released = tx.release_lease(user_id).await?;
        let Some(plot_id) = tx.find_eligible_plot(&query).await? else {
            if release_on_miss {
                tx.commit().await.inspect_err(log_store_failure)?;
            }
            tracing::debug!(
                "No eligible plot ({:?} from {}) in project {} for user {} (scope {:?})",
                direction,
                anchor,
                project_id,
                user_id,
                scope
            );
            return Ok(None);
        };

        let expires_at = now + self.lease_duration;
        tx.grant_lease(plot_id, user_id, expires_at, now).await?;
        let plot = tx
            .load_plot(plot_id)
            .await?
            .ok_or(StoreError::UnknownPlot(plot_id))?;
        tx.commit().await.inspect_err(log_store_failure)?;

        tracing::info!(
            "Leased plot {} to user {} until {} (released {:?})",
            plot_id,
            user_id,
            expires_at,
            released
        );
        Ok(Some(plot))
    }

    /// Clear the user's lease, returning the plot it was on
    ///
    /// Releasing with no lease held is a no-op.
    ///
    /// # Errors
    /// - `LeaseError::Store` on store failure; the lease stays in place
    pub async fn release(&self, user_id: UserId) -> Result<Option<PlotId>, LeaseError> {
        let mut tx = self.store.begin().await.inspect_err(log_store_failure)?;
        let released = tx.release_lease(user_id).await?;
        tx.commit().await.inspect_err(log_store_failure)?;
        if let Some(plot_id) = released {
            tracing::debug!("Released plot {} held by user {}", plot_id, user_id);
        }
        Ok(released)
    }

    /// Extend the user's active lease on a plot to a full lease length from now
    ///
    /// Returns false and changes nothing if the user does not hold the lease.
    ///
    /// # Errors
    /// - `LeaseError::Store` on store failure
    pub async fn reset_expiry(&self, plot_id: PlotId, user_id: UserId) -> Result<bool, LeaseError> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await.inspect_err(log_store_failure)?;
        let extended = tx
            .extend_lease(plot_id, user_id, now + self.lease_duration, now)
            .await?;
        if extended {
            tx.commit().await.inspect_err(log_store_failure)?;
        }
        Ok(extended)
    }

    /// Record a reviewer's results and release their lease
    ///
    /// Values replace any earlier values from the same reviewer. A final
    /// submission marks the plot completed.
    ///
    /// # Errors
    /// - `LeaseError::InvalidSubmission` for confidence above 100 or unknown sample ids
    /// - `LeaseError::Store` on store failure, including an unknown plot
    pub async fn submit(
        &self,
        plot_id: PlotId,
        user_id: UserId,
        submission: &Submission,
    ) -> Result<(), LeaseError> {
        if let Some(confidence) = submission.confidence.filter(|&c| c > MAX_CONFIDENCE) {
            return Err(LeaseError::InvalidSubmission(format!(
                "confidence {confidence} exceeds {MAX_CONFIDENCE}"
            )));
        }

        let now = self.clock.now();
        let mut tx = self.store.begin().await.inspect_err(log_store_failure)?;
        let plot = tx
            .load_plot(plot_id)
            .await?
            .ok_or(StoreError::UnknownPlot(plot_id))?;
        if let Some(unknown) = submission.values.keys().find(|id| !plot.has_sample(**id)) {
            return Err(LeaseError::InvalidSubmission(format!(
                "sample {unknown} is not in plot {plot_id}"
            )));
        }

        tx.record_sample_values(plot_id, user_id, submission, now).await?;
        tx.release_lease(user_id).await?;
        tx.commit().await.inspect_err(log_store_failure)?;

        tracing::info!(
            "User {} submitted {} values for plot {} (final: {})",
            user_id,
            submission.values.len(),
            plot_id,
            submission.is_final
        );
        Ok(())
    }

    /// Flag a plot on behalf of a reviewer and release their lease
    ///
    /// # Errors
    /// - `LeaseError::Store` on store failure, including an unknown plot
    pub async fn flag(&self, plot_id: PlotId, user_id: UserId) -> Result<(), LeaseError> {
        let mut tx = self.store.begin().await.inspect_err(log_store_failure)?;
        tx.flag_plot(plot_id, user_id).await?;
        tx.release_lease(user_id).await?;
        tx.commit().await.inspect_err(log_store_failure)?;
        tracing::info!("User {} flagged plot {}", user_id, plot_id);
        Ok(())
    }

    /// Committed state of one plot
    ///
    /// # Errors
    /// - `LeaseError::Store` on store failure
    pub async fn plot(&self, plot_id: PlotId) -> Result<Option<Plot>, LeaseError> {
        Ok(self.store.load_plot(plot_id).await?)
    }

    /// Up to `limit` plots of a project in id order
    ///
    /// # Errors
    /// - `LeaseError::Store` on store failure
    pub async fn list_plots(&self, project_id: ProjectId, limit: usize) -> Result<Vec<Plot>, LeaseError> {
        Ok(self.store.list_plots(project_id, limit).await?)
    }

    /// Plot counts for a project at the current instant
    ///
    /// # Errors
    /// - `LeaseError::Store` on store failure
    pub async fn summary(&self, project_id: ProjectId) -> Result<ProjectSummary, LeaseError> {
        Ok(self
            .store
            .project_summary(project_id, self.clock.now())
            .await?)
    }
}

fn log_store_failure(err: &StoreError) {
    if err.is_retryable() {
        tracing::warn!("Lease store unavailable: {}", err);
    }
}
