//! Concurrent lease acquisition
//!
//! Many reviewers hit one project at once. No plot may ever have two active
//! holders and no reviewer may ever hold two plots.

use futures::future::join_all;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use survey_lease::{LeaseManager, PlotId, PlotStore, Scope, UserId};
use survey_test_utils::{lease_fixture, test_epoch, TEST_PROJECT};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_acquisitions_get_distinct_plots() {
    let fixture = lease_fixture(10).await;
    let manager = Arc::new(fixture.manager.clone());

    let handles = (1..=25u64).map(|user| {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            manager
                .acquire_next(TEST_PROJECT, PlotId(0), UserId(user), Scope::AnyUnassigned)
                .await
                .unwrap()
                .map(|plot| plot.id)
        })
    });
    let results: Vec<Option<PlotId>> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let granted: Vec<PlotId> = results.iter().flatten().copied().collect();
    let distinct: BTreeSet<PlotId> = granted.iter().copied().collect();
    assert_eq!(granted.len(), 10);
    assert_eq!(distinct.len(), 10);
    assert_eq!(results.iter().filter(|r| r.is_none()).count(), 15);

    let summary = fixture.manager.summary(TEST_PROJECT).await.unwrap();
    assert_eq!(summary.leased, 10);
    assert_eq!(summary.available, 0);
}

async fn walk_queue(manager: Arc<LeaseManager>, user: UserId, rounds: usize) -> usize {
    let mut anchor = PlotId(0);
    let mut acquired = 0;
    for _ in 0..rounds {
        let next = manager
            .acquire_next(TEST_PROJECT, anchor, user, Scope::AnyUnassigned)
            .await
            .unwrap();
        let Some(plot) = next else {
            anchor = PlotId(0);
            continue;
        };
        acquired += 1;
        anchor = plot.id;

        // Nobody else can take a plot while this user's lease is active
        let stored = manager.plot(plot.id).await.unwrap().unwrap();
        assert_eq!(stored.lease.map(|l| l.user_id), Some(user));
        tokio::task::yield_now().await;
    }
    acquired
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn interleaved_walks_never_share_a_plot() {
    let fixture = lease_fixture(12).await;
    let manager = Arc::new(fixture.manager.clone());

    let walkers = (1..=8u64).map(|user| tokio::spawn(walk_queue(Arc::clone(&manager), UserId(user), 40)));
    let acquired: usize = join_all(walkers).await.into_iter().map(|r| r.unwrap()).sum();
    assert!(acquired > 0);

    let plots = fixture.store.list_plots(TEST_PROJECT, usize::MAX).await.unwrap();
    let mut holders: HashMap<UserId, Vec<PlotId>> = HashMap::new();
    for plot in &plots {
        if let Some(lease) = plot.active_lease(test_epoch()) {
            holders.entry(lease.user_id).or_default().push(plot.id);
        }
    }
    assert!(holders.values().all(|held| held.len() == 1));
    assert!(holders.len() <= 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_by_id_has_one_winner() {
    let fixture = lease_fixture(3).await;
    let manager = Arc::new(fixture.manager.clone());

    let contenders = (1..=16u64).map(|user| {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            manager
                .acquire_by_id(TEST_PROJECT, PlotId(2), UserId(user), Scope::AnyUnassigned)
                .await
        })
    });
    let outcomes: Vec<_> = join_all(contenders).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .filter_map(|o| o.as_ref().err())
        .all(survey_lease::LeaseError::is_not_found));
}
