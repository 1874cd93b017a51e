//! Testing utilities for the survey workspace
//!
//! Shared fixtures: seeded random sources, project configurations, populated
//! stores and lease managers on a manual clock.

#![allow(missing_docs)]

use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use survey_design::{PlotPlacement, PlotShape, ProjectConfig, SamplePlacement};
use survey_geo::{Bounds, Point};
use survey_lease::{Clock, InMemoryPlotStore, LeaseManager, ManualClock, NewPlot, PlotStore, ProjectId};

pub const TEST_PROJECT: ProjectId = ProjectId(1);

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Fixed start instant for manual clocks
pub fn test_epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// Five random 30 m circle plots with three random samples each
pub fn small_random_config() -> ProjectConfig {
    ProjectConfig::new(
        PlotPlacement::Random {
            boundary: Bounds::new(0.0, 0.0, 0.01, 0.01),
            num_plots: 5,
        },
        PlotShape::Circle,
        30.0,
        SamplePlacement::Random { samples_per_plot: 3 },
    )
    .unwrap()
}

/// Gridded square plots with gridded samples
pub fn gridded_config() -> ProjectConfig {
    ProjectConfig::new(
        PlotPlacement::Gridded {
            boundary: Bounds::new(0.0, 0.0, 0.01, 0.01),
            spacing_m: 200.0,
        },
        PlotShape::Square,
        40.0,
        SamplePlacement::Gridded { resolution_m: 10.0 },
    )
    .unwrap()
}

/// `count` plots along the equator with two samples each
pub fn new_plots(count: usize) -> Vec<NewPlot> {
    (0..count)
        .map(|i| {
            let center = Point::new(i as f64 * 0.001, 0.0);
            NewPlot {
                center,
                samples: vec![center, center.offset(0.0001, 0.0)],
            }
        })
        .collect()
}

pub async fn populated_store(count: usize) -> Arc<InMemoryPlotStore> {
    let store = Arc::new(InMemoryPlotStore::new());
    store
        .create_plots_and_samples(TEST_PROJECT, new_plots(count))
        .await
        .unwrap();
    store
}

pub struct LeaseFixture {
    pub manager: LeaseManager,
    pub store: Arc<InMemoryPlotStore>,
    pub clock: Arc<ManualClock>,
}

impl LeaseFixture {
    pub fn advance(&self, delta: TimeDelta) {
        self.clock.advance(delta);
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Lease manager over `count` plots in [`TEST_PROJECT`] with a manual clock
pub async fn lease_fixture(count: usize) -> LeaseFixture {
    let store = populated_store(count).await;
    let clock = Arc::new(ManualClock::new(test_epoch()));
    let manager = LeaseManager::new(store.clone()).with_clock(clock.clone());
    LeaseFixture {
        manager,
        store,
        clock,
    }
}
