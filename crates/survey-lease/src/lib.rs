//! Survey Lease - exclusive plot leases for concurrent reviewers
//!
//! Provides:
//! - Plot, sample and lease records with shared eligibility rules
//! - The persistent store seam ([`PlotStore`], [`LeaseTransaction`])
//! - An in-memory store
//! - [`LeaseManager`]: next / previous / by-id acquisition, release,
//!   keep-alive, submission and flagging
//!
//! At most one active lease exists per plot and per user. Leases expire
//! passively; no background task sweeps them.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use survey_geo::Point;
//! use survey_lease::{InMemoryPlotStore, LeaseManager, NewPlot, PlotId, PlotStore, ProjectId, Scope, UserId};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = InMemoryPlotStore::new();
//! let plots = vec![NewPlot { center: Point::new(0.0, 0.0), samples: vec![Point::new(0.0, 0.0)] }];
//! store.create_plots_and_samples(ProjectId(1), plots).await.unwrap();
//!
//! let manager = LeaseManager::new(Arc::new(store));
//! let plot = manager
//!     .acquire_next(ProjectId(1), PlotId(0), UserId(7), Scope::AnyUnassigned)
//!     .await
//!     .unwrap();
//! assert_eq!(plot.map(|p| p.id), Some(PlotId(1)));
//! # });
//! ```

#![warn(unreachable_pub)]

pub mod clock;
pub mod error;
pub mod manager;
pub mod memory;
pub mod model;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{LeaseError, StoreError};
pub use manager::{LeaseManager, DEFAULT_LEASE_SECS, MAX_CONFIDENCE};
pub use memory::InMemoryPlotStore;
pub use model::{
    AssignmentState, Direction, EligibilityQuery, Lease, NewPlot, Plot, PlotId, PlotRecord,
    ProjectId, ProjectSummary, SampleId, Sample, Scope, Submission, UserId,
};
pub use store::{LeaseTransaction, PlotStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
