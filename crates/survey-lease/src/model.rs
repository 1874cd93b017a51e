//! Plot, sample and lease records
//!
//! Eligibility rules live here as methods on [`Plot`] so every store
//! implementation admits exactly the same plots for a scope.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use survey_geo::Point;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Project identity
    ProjectId(u64)
);
id_type!(
    /// Plot identity, unique across projects and ordered by creation
    PlotId(u64)
);
id_type!(
    /// Reviewer identity
    UserId(u64)
);
id_type!(
    /// Sample identity, scoped to its plot and numbered from 1
    SampleId(u32)
);

/// A point inside a plot that reviewers classify
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Identity within the plot
    pub id: SampleId,
    /// Geographic position
    pub position: Point,
}

/// Exclusive time-bounded claim on a plot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Leased plot
    pub plot_id: PlotId,
    /// Holder
    pub user_id: UserId,
    /// End of the claim
    pub expires_at: DateTime<Utc>,
}

impl Lease {
    /// A lease is active strictly before its expiry
    #[inline]
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Assignment state of a plot at an instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AssignmentState {
    /// Free to lease
    Unassigned,
    /// Held by a reviewer until `expires_at`
    Leased {
        /// Holder
        user_id: UserId,
        /// End of the claim
        expires_at: DateTime<Utc>,
    },
    /// Final results submitted
    Completed,
}

/// What one reviewer has recorded on a plot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlotRecord {
    /// Latest classification per sample
    pub values: BTreeMap<SampleId, Value>,
    /// Reviewer confidence, 0 to 100
    pub confidence: Option<u8>,
    /// When the reviewer started collecting
    pub collection_start: Option<DateTime<Utc>>,
    /// When values were last submitted
    pub collection_time: Option<DateTime<Utc>>,
    /// Reviewer flagged the plot
    pub flagged: bool,
}

impl PlotRecord {
    /// Check if the reviewer submitted values
    #[inline]
    #[must_use]
    pub fn has_submission(&self) -> bool {
        self.collection_time.is_some()
    }

    /// Time between collection start and the last submission
    #[must_use]
    pub fn analysis_duration(&self) -> Option<TimeDelta> {
        Some(self.collection_time? - self.collection_start?)
    }
}

/// A sampling unit with its samples and assignment state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plot {
    /// Identity
    pub id: PlotId,
    /// Owning project
    pub project_id: ProjectId,
    /// Geographic center
    pub center: Point,
    /// Flagged by any reviewer
    pub flagged: bool,
    /// Final results submitted
    pub completed: bool,
    /// Latest lease, possibly expired
    pub lease: Option<Lease>,
    /// Per-reviewer records
    pub records: BTreeMap<UserId, PlotRecord>,
    /// Samples in generation order
    pub samples: Vec<Sample>,
}

impl Plot {
    /// Lease if it is still active at `now`
    #[must_use]
    pub fn active_lease(&self, now: DateTime<Utc>) -> Option<&Lease> {
        self.lease.as_ref().filter(|l| l.is_active(now))
    }

    /// Assignment state at `now`; expired leases read as unassigned
    #[must_use]
    pub fn state(&self, now: DateTime<Utc>) -> AssignmentState {
        if self.completed {
            return AssignmentState::Completed;
        }
        match self.active_lease(now) {
            Some(lease) => AssignmentState::Leased {
                user_id: lease.user_id,
                expires_at: lease.expires_at,
            },
            None => AssignmentState::Unassigned,
        }
    }

    /// Check if someone other than `user_id` holds an active lease
    #[must_use]
    pub fn is_leased_by_other(&self, user_id: UserId, now: DateTime<Utc>) -> bool {
        self.active_lease(now).is_some_and(|l| l.user_id != user_id)
    }

    /// Reviewer's record, if any
    #[inline]
    #[must_use]
    pub fn record(&self, user_id: UserId) -> Option<&PlotRecord> {
        self.records.get(&user_id)
    }

    /// Check if nobody has worked the plot and nobody holds it
    #[must_use]
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        !self.completed
            && !self.flagged
            && !self.records.values().any(PlotRecord::has_submission)
            && self.active_lease(now).is_none()
    }

    /// Check if the plot may be leased to `user_id` under `scope`
    #[must_use]
    pub fn is_eligible(&self, scope: Scope, user_id: UserId, now: DateTime<Utc>) -> bool {
        if self.is_leased_by_other(user_id, now) {
            return false;
        }
        match scope {
            Scope::AnyUnassigned => {
                !self.completed
                    && !self.flagged
                    && !self.records.values().any(PlotRecord::has_submission)
            }
            Scope::Mine => self
                .record(user_id)
                .is_some_and(|r| r.has_submission() || r.flagged),
        }
    }

    /// Check if `sample_id` belongs to this plot
    #[must_use]
    pub fn has_sample(&self, sample_id: SampleId) -> bool {
        self.samples.iter().any(|s| s.id == sample_id)
    }
}

/// Which plots a reviewer may be handed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Plots nobody has worked and nobody else holds
    AnyUnassigned,
    /// Plots this reviewer submitted or flagged
    Mine,
}

/// Search direction relative to an anchor plot id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Smallest eligible id above the anchor
    Next,
    /// Largest eligible id below the anchor
    Previous,
    /// The anchor itself
    Exact,
}

/// Parameters of one eligibility search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EligibilityQuery {
    /// Project to search
    pub project_id: ProjectId,
    /// Eligibility rule
    pub scope: Scope,
    /// Search direction
    pub direction: Direction,
    /// Anchor plot id
    pub anchor: PlotId,
    /// Requesting reviewer
    pub user_id: UserId,
    /// Instant at which leases are evaluated
    pub now: DateTime<Utc>,
}

/// Reviewer results for one plot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Submission {
    /// Classification per sample; replaces any earlier values from this reviewer
    pub values: BTreeMap<SampleId, Value>,
    /// Reviewer confidence, 0 to 100
    #[serde(default)]
    pub confidence: Option<u8>,
    /// When the reviewer started collecting
    #[serde(default)]
    pub collection_start: Option<DateTime<Utc>>,
    /// Marks the plot completed
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

/// A plot to insert, before it has an identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPlot {
    /// Geographic center
    pub center: Point,
    /// Sample positions in generation order
    pub samples: Vec<Point>,
}

/// Plot counts for one project at an instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectSummary {
    /// All plots
    pub total: usize,
    /// Plots with final results
    pub completed: usize,
    /// Flagged plots
    pub flagged: usize,
    /// Plots under an active lease
    pub leased: usize,
    /// Plots any reviewer could be handed now
    pub available: usize,
}

impl ProjectSummary {
    /// Tally the given plots
    pub fn tally<'a, I>(plots: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a Plot>,
    {
        plots.into_iter().fold(Self::default(), |mut acc, plot| {
            acc.total += 1;
            acc.completed += usize::from(plot.completed);
            acc.flagged += usize::from(plot.flagged);
            acc.leased += usize::from(plot.active_lease(now).is_some());
            acc.available += usize::from(plot.is_available(now));
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plot() -> Plot {
        Plot {
            id: PlotId(1),
            project_id: ProjectId(1),
            center: Point::new(0.0, 0.0),
            flagged: false,
            completed: false,
            lease: None,
            records: BTreeMap::new(),
            samples: vec![Sample {
                id: SampleId(1),
                position: Point::new(0.0, 0.0),
            }],
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap_or_default()
    }

    #[test]
    fn lease_expiry_is_exclusive() {
        let lease = Lease {
            plot_id: PlotId(1),
            user_id: UserId(1),
            expires_at: at(10),
        };
        assert!(lease.is_active(at(9)));
        assert!(!lease.is_active(at(10)));
    }

    #[test]
    fn expired_lease_reads_unassigned() {
        let mut p = plot();
        p.lease = Some(Lease {
            plot_id: p.id,
            user_id: UserId(7),
            expires_at: at(60),
        });
        assert_eq!(
            p.state(at(0)),
            AssignmentState::Leased {
                user_id: UserId(7),
                expires_at: at(60)
            }
        );
        assert_eq!(p.state(at(61)), AssignmentState::Unassigned);
        assert!(!p.is_eligible(Scope::AnyUnassigned, UserId(8), at(0)));
        assert!(p.is_eligible(Scope::AnyUnassigned, UserId(8), at(61)));
        assert!(p.is_eligible(Scope::AnyUnassigned, UserId(7), at(0)));
    }

    #[test]
    fn scopes_follow_records() {
        let mut p = plot();
        assert!(p.is_eligible(Scope::AnyUnassigned, UserId(1), at(0)));
        assert!(!p.is_eligible(Scope::Mine, UserId(1), at(0)));

        p.records.insert(
            UserId(1),
            PlotRecord {
                values: BTreeMap::from([(SampleId(1), Value::from("forest"))]),
                collection_time: Some(at(0)),
                ..PlotRecord::default()
            },
        );
        assert!(!p.is_eligible(Scope::AnyUnassigned, UserId(2), at(0)));
        assert!(p.is_eligible(Scope::Mine, UserId(1), at(0)));
        assert!(!p.is_eligible(Scope::Mine, UserId(2), at(0)));

        p.completed = true;
        assert_eq!(p.state(at(0)), AssignmentState::Completed);
        assert!(p.is_eligible(Scope::Mine, UserId(1), at(0)));
    }

    #[test]
    fn flagged_plot_is_mine_but_not_unassigned() {
        let mut p = plot();
        p.flagged = true;
        p.records.insert(
            UserId(3),
            PlotRecord {
                flagged: true,
                ..PlotRecord::default()
            },
        );
        assert!(!p.is_eligible(Scope::AnyUnassigned, UserId(4), at(0)));
        assert!(p.is_eligible(Scope::Mine, UserId(3), at(0)));
        assert!(!p.is_available(at(0)));
    }

    #[test]
    fn analysis_duration_needs_both_times() {
        let mut record = PlotRecord {
            collection_time: Some(at(90)),
            ..PlotRecord::default()
        };
        assert_eq!(record.analysis_duration(), None);
        record.collection_start = Some(at(30));
        assert_eq!(record.analysis_duration(), Some(TimeDelta::seconds(60)));
    }

    #[test]
    fn summary_tallies_states() {
        let free = plot();
        let mut leased = plot();
        leased.lease = Some(Lease {
            plot_id: leased.id,
            user_id: UserId(1),
            expires_at: at(100),
        });
        let mut done = plot();
        done.completed = true;

        let summary = ProjectSummary::tally([&free, &leased, &done], at(0));
        assert_eq!(
            summary,
            ProjectSummary {
                total: 3,
                completed: 1,
                flagged: 0,
                leased: 1,
                available: 1,
            }
        );
    }

    #[test]
    fn submission_final_field_name() {
        let submission: Submission =
            serde_json::from_str(r#"{"values": {"1": "water"}, "final": true}"#).unwrap();
        assert!(submission.is_final);
        assert_eq!(submission.values[&SampleId(1)], Value::from("water"));
    }
}
