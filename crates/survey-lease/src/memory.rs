//! In-memory plot store
//!
//! A transaction holds the store lock from `begin` until it is committed or
//! dropped, so transactions are serializable. Writes are staged per plot and
//! published together on commit.
//!
//! Fault switches make the store report `StoreError::Unavailable` for every
//! call, or only on commit.

use crate::error::StoreError;
use crate::model::{
    Direction, EligibilityQuery, Lease, NewPlot, Plot, PlotId, ProjectId, ProjectSummary, Sample,
    SampleId, Submission, UserId,
};
use crate::store::{LeaseTransaction, PlotStore};
use chrono::{DateTime, Utc};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
struct StoreState {
    plots: BTreeMap<PlotId, Plot>,
    project_plots: BTreeMap<ProjectId, BTreeSet<PlotId>>,
    /// Plot each user last leased
    leases: HashMap<UserId, PlotId>,
    next_plot_id: u64,
}

#[derive(Debug, Default)]
struct Faults {
    unavailable: AtomicBool,
    fail_commits: AtomicBool,
}

impl Faults {
    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Plot store kept in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryPlotStore {
    state: Arc<Mutex<StoreState>>,
    faults: Arc<Faults>,
}

impl InMemoryPlotStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with `StoreError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every commit fail with `StoreError::Unavailable`
    pub fn fail_commits(&self, fail: bool) {
        self.faults.fail_commits.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl PlotStore for InMemoryPlotStore {
    async fn create_plots_and_samples(
        &self,
        project_id: ProjectId,
        plots: Vec<NewPlot>,
    ) -> Result<Vec<PlotId>, StoreError> {
        self.faults.check()?;
        let mut state = self.state.lock().await;
        if state
            .project_plots
            .get(&project_id)
            .is_some_and(|ids| !ids.is_empty())
        {
            return Err(StoreError::AlreadyPopulated(project_id));
        }

        let mut ids = Vec::with_capacity(plots.len());
        for new_plot in plots {
            state.next_plot_id += 1;
            let id = PlotId(state.next_plot_id);
            let samples = new_plot
                .samples
                .into_iter()
                .zip(1..)
                .map(|(position, n)| Sample {
                    id: SampleId(n),
                    position,
                })
                .collect();
            state.plots.insert(
                id,
                Plot {
                    id,
                    project_id,
                    center: new_plot.center,
                    flagged: false,
                    completed: false,
                    lease: None,
                    records: BTreeMap::new(),
                    samples,
                },
            );
            state.project_plots.entry(project_id).or_default().insert(id);
            ids.push(id);
        }
        Ok(ids)
    }

    async fn begin(&self) -> Result<Box<dyn LeaseTransaction>, StoreError> {
        self.faults.check()?;
        let state = Arc::clone(&self.state).lock_owned().await;
        Ok(Box::new(InMemoryTransaction {
            state,
            staged: BTreeMap::new(),
            staged_leases: HashMap::new(),
            faults: Arc::clone(&self.faults),
        }))
    }

    async fn load_plot(&self, plot_id: PlotId) -> Result<Option<Plot>, StoreError> {
        self.faults.check()?;
        Ok(self.state.lock().await.plots.get(&plot_id).cloned())
    }

    async fn list_plots(&self, project_id: ProjectId, limit: usize) -> Result<Vec<Plot>, StoreError> {
        self.faults.check()?;
        let state = self.state.lock().await;
        let Some(ids) = state.project_plots.get(&project_id) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .take(limit)
            .filter_map(|id| state.plots.get(id).cloned())
            .collect())
    }

    async fn project_summary(
        &self,
        project_id: ProjectId,
        now: DateTime<Utc>,
    ) -> Result<ProjectSummary, StoreError> {
        self.faults.check()?;
        let state = self.state.lock().await;
        let Some(ids) = state.project_plots.get(&project_id) else {
            return Ok(ProjectSummary::default());
        };
        Ok(ProjectSummary::tally(
            ids.iter().filter_map(|id| state.plots.get(id)),
            now,
        ))
    }
}

#[derive(Debug)]
struct InMemoryTransaction {
    state: OwnedMutexGuard<StoreState>,
    staged: BTreeMap<PlotId, Plot>,
    /// `None` marks a cleared lease
    staged_leases: HashMap<UserId, Option<PlotId>>,
    faults: Arc<Faults>,
}

impl InMemoryTransaction {
    fn plot(&self, plot_id: PlotId) -> Option<&Plot> {
        self.staged
            .get(&plot_id)
            .or_else(|| self.state.plots.get(&plot_id))
    }

    fn plot_mut(&mut self, plot_id: PlotId) -> Result<&mut Plot, StoreError> {
        match self.staged.entry(plot_id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let plot = self
                    .state
                    .plots
                    .get(&plot_id)
                    .cloned()
                    .ok_or(StoreError::UnknownPlot(plot_id))?;
                Ok(entry.insert(plot))
            }
        }
    }

    fn lease_of(&self, user_id: UserId) -> Option<PlotId> {
        match self.staged_leases.get(&user_id) {
            Some(staged) => *staged,
            None => self.state.leases.get(&user_id).copied(),
        }
    }

    fn clear_lease(&mut self, plot_id: PlotId, user_id: UserId) -> Result<(), StoreError> {
        let plot = self.plot_mut(plot_id)?;
        if plot.lease.is_some_and(|l| l.user_id == user_id) {
            plot.lease = None;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl LeaseTransaction for InMemoryTransaction {
    async fn find_eligible_plot(&mut self, query: &EligibilityQuery) -> Result<Option<PlotId>, StoreError> {
        self.faults.check()?;
        let Some(ids) = self.state.project_plots.get(&query.project_id) else {
            return Ok(None);
        };
        let eligible = |id: PlotId| {
            self.plot(id)
                .is_some_and(|p| p.is_eligible(query.scope, query.user_id, query.now))
        };

        let found = match query.direction {
            Direction::Next => ids
                .range((Bound::Excluded(query.anchor), Bound::Unbounded))
                .copied()
                .find(|&id| eligible(id)),
            Direction::Previous => ids
                .range(..query.anchor)
                .rev()
                .copied()
                .find(|&id| eligible(id)),
            Direction::Exact => ids.get(&query.anchor).copied().filter(|&id| eligible(id)),
        };
        Ok(found)
    }

    async fn grant_lease(
        &mut self,
        plot_id: PlotId,
        user_id: UserId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.faults.check()?;
        let previous = self.lease_of(user_id);

        let plot = self.plot_mut(plot_id)?;
        if plot.is_leased_by_other(user_id, now) {
            return Err(StoreError::LeaseHeld { plot_id });
        }
        let displaced = plot.lease.map(|l| l.user_id).filter(|&u| u != user_id);
        plot.lease = Some(Lease {
            plot_id,
            user_id,
            expires_at,
        });

        if let Some(previous) = previous.filter(|&p| p != plot_id) {
            self.clear_lease(previous, user_id)?;
        }
        if let Some(other) = displaced {
            if self.lease_of(other) == Some(plot_id) {
                self.staged_leases.insert(other, None);
            }
        }
        self.staged_leases.insert(user_id, Some(plot_id));
        Ok(())
    }

    async fn release_lease(&mut self, user_id: UserId) -> Result<Option<PlotId>, StoreError> {
        self.faults.check()?;
        let Some(plot_id) = self.lease_of(user_id) else {
            return Ok(None);
        };
        self.clear_lease(plot_id, user_id)?;
        self.staged_leases.insert(user_id, None);
        Ok(Some(plot_id))
    }

    async fn extend_lease(
        &mut self,
        plot_id: PlotId,
        user_id: UserId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.faults.check()?;
        let held = self
            .plot(plot_id)
            .and_then(|p| p.active_lease(now))
            .is_some_and(|l| l.user_id == user_id);
        if !held {
            return Ok(false);
        }
        if let Some(lease) = self.plot_mut(plot_id)?.lease.as_mut() {
            lease.expires_at = expires_at;
        }
        Ok(true)
    }

    async fn record_sample_values(
        &mut self,
        plot_id: PlotId,
        user_id: UserId,
        submission: &Submission,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.faults.check()?;
        let plot = self.plot_mut(plot_id)?;
        let record = plot.records.entry(user_id).or_default();
        record.values.clone_from(&submission.values);
        record.confidence = submission.confidence;
        record.collection_start = submission.collection_start;
        record.collection_time = Some(now);
        if submission.is_final {
            plot.completed = true;
        }
        Ok(())
    }

    async fn flag_plot(&mut self, plot_id: PlotId, user_id: UserId) -> Result<(), StoreError> {
        self.faults.check()?;
        let plot = self.plot_mut(plot_id)?;
        plot.flagged = true;
        plot.records.entry(user_id).or_default().flagged = true;
        Ok(())
    }

    async fn load_plot(&mut self, plot_id: PlotId) -> Result<Option<Plot>, StoreError> {
        self.faults.check()?;
        Ok(self.plot(plot_id).cloned())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.faults.check()?;
        if self.faults.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("commit rejected".to_string()));
        }

        let Self {
            mut state,
            staged,
            staged_leases,
            ..
        } = *self;
        state.plots.extend(staged);
        for (user_id, plot_id) in staged_leases {
            if let Some(plot_id) = plot_id {
                state.leases.insert(user_id, plot_id);
            } else {
                state.leases.remove(&user_id);
            }
        }
        Ok(())
    }
}
