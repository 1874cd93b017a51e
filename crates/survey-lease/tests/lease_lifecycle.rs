//! Lease lifecycle: singularity, release, expiry, scopes, submissions, faults

use chrono::TimeDelta;
use pretty_assertions::assert_eq;
use serde_json::json;
use survey_lease::{
    AssignmentState, LeaseError, PlotId, PlotStore, ProjectSummary, SampleId, Scope, StoreError,
    Submission, UserId,
};
use survey_test_utils::{lease_fixture, TEST_PROJECT};

const ALICE: UserId = UserId(1);
const BOB: UserId = UserId(2);

fn submission(is_final: bool) -> Submission {
    Submission {
        values: [(SampleId(1), json!("forest")), (SampleId(2), json!("water"))].into(),
        confidence: Some(80),
        collection_start: None,
        is_final,
    }
}

#[tokio::test]
async fn new_lease_clears_previous_one() {
    let fx = lease_fixture(3).await;
    let first = fx
        .manager
        .acquire_next(TEST_PROJECT, PlotId(0), ALICE, Scope::AnyUnassigned)
        .await
        .unwrap()
        .unwrap();
    let second = fx
        .manager
        .acquire_next(TEST_PROJECT, first.id, ALICE, Scope::AnyUnassigned)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.id, PlotId(2));

    let old = fx.manager.plot(first.id).await.unwrap().unwrap();
    assert_eq!(old.lease, None);
    assert_eq!(old.state(fx.clock_now()), AssignmentState::Unassigned);

    // Bob can now have the plot Alice moved away from
    let bobs = fx
        .manager
        .acquire_next(TEST_PROJECT, PlotId(0), BOB, Scope::AnyUnassigned)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bobs.id, first.id);
}

#[tokio::test]
async fn release_twice_matches_release_once() {
    let fx = lease_fixture(2).await;
    fx.manager
        .acquire_next(TEST_PROJECT, PlotId(0), ALICE, Scope::AnyUnassigned)
        .await
        .unwrap();

    assert_eq!(fx.manager.release(ALICE).await.unwrap(), Some(PlotId(1)));
    let once = fx.store.list_plots(TEST_PROJECT, 10).await.unwrap();
    assert_eq!(fx.manager.release(ALICE).await.unwrap(), None);
    let twice = fx.store.list_plots(TEST_PROJECT, 10).await.unwrap();
    assert_eq!(once, twice);
    assert!(twice.iter().all(|p| p.lease.is_none()));
}

#[tokio::test]
async fn expired_lease_reads_unassigned() {
    let fx = lease_fixture(1).await;
    fx.manager
        .acquire_next(TEST_PROJECT, PlotId(0), ALICE, Scope::AnyUnassigned)
        .await
        .unwrap();

    let blocked = fx
        .manager
        .acquire_next(TEST_PROJECT, PlotId(0), BOB, Scope::AnyUnassigned)
        .await
        .unwrap();
    assert!(blocked.is_none());

    fx.advance(TimeDelta::minutes(5));
    let taken = fx
        .manager
        .acquire_next(TEST_PROJECT, PlotId(0), BOB, Scope::AnyUnassigned)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(taken.lease.map(|l| l.user_id), Some(BOB));
    assert_eq!(fx.manager.release(ALICE).await.unwrap(), None);
}

#[tokio::test]
async fn configured_lease_duration_applies() {
    let fx = lease_fixture(1).await;
    let manager = fx.manager.clone().with_lease_duration(TimeDelta::seconds(30));
    let plot = manager
        .acquire_next(TEST_PROJECT, PlotId(0), ALICE, Scope::AnyUnassigned)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        plot.lease.map(|l| l.expires_at),
        Some(fx.clock_now() + TimeDelta::seconds(30))
    );
}

#[tokio::test]
async fn mine_scope_walks_submitted_plots() {
    let fx = lease_fixture(5).await;
    for id in [1, 3, 4] {
        fx.manager
            .submit(PlotId(id), ALICE, &submission(false))
            .await
            .unwrap();
    }

    let mut visited = Vec::new();
    let mut anchor = PlotId(0);
    while let Some(plot) = fx
        .manager
        .acquire_next(TEST_PROJECT, anchor, ALICE, Scope::Mine)
        .await
        .unwrap()
    {
        visited.push(plot.id);
        anchor = plot.id;
    }
    assert_eq!(visited, vec![PlotId(1), PlotId(3), PlotId(4)]);

    let back = fx
        .manager
        .acquire_previous(TEST_PROJECT, PlotId(4), ALICE, Scope::Mine)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(back.id, PlotId(3));

    // Worked plots leave the unassigned queue for everyone
    let bobs = fx
        .manager
        .acquire_next(TEST_PROJECT, PlotId(0), BOB, Scope::AnyUnassigned)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bobs.id, PlotId(2));
    assert!(fx
        .manager
        .acquire_by_id(TEST_PROJECT, PlotId(3), BOB, Scope::Mine)
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn submission_overwrites_and_completes() {
    let fx = lease_fixture(1).await;
    fx.manager
        .acquire_next(TEST_PROJECT, PlotId(0), ALICE, Scope::AnyUnassigned)
        .await
        .unwrap();

    fx.manager
        .submit(PlotId(1), ALICE, &submission(false))
        .await
        .unwrap();
    let start = fx.clock_now();
    fx.advance(TimeDelta::seconds(90));
    let revised = Submission {
        values: [(SampleId(2), json!("urban"))].into(),
        confidence: Some(95),
        collection_start: Some(start),
        is_final: true,
    };
    fx.manager.submit(PlotId(1), ALICE, &revised).await.unwrap();

    let plot = fx.manager.plot(PlotId(1)).await.unwrap().unwrap();
    let record = plot.record(ALICE).unwrap();
    assert_eq!(record.values, revised.values);
    assert_eq!(record.confidence, Some(95));
    assert_eq!(record.analysis_duration(), Some(TimeDelta::seconds(90)));
    assert!(plot.completed);
    assert_eq!(plot.lease, None);
    assert_eq!(plot.state(fx.clock_now()), AssignmentState::Completed);
}

#[tokio::test]
async fn flagging_releases_and_excludes_plot() {
    let fx = lease_fixture(2).await;
    fx.manager
        .acquire_next(TEST_PROJECT, PlotId(0), ALICE, Scope::AnyUnassigned)
        .await
        .unwrap();
    fx.manager.flag(PlotId(1), ALICE).await.unwrap();

    let summary = fx.manager.summary(TEST_PROJECT).await.unwrap();
    assert_eq!(
        summary,
        ProjectSummary {
            total: 2,
            completed: 0,
            flagged: 1,
            leased: 0,
            available: 1,
        }
    );

    let next = fx
        .manager
        .acquire_next(TEST_PROJECT, PlotId(0), BOB, Scope::AnyUnassigned)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(next.id, PlotId(2));

    let mine = fx
        .manager
        .acquire_by_id(TEST_PROJECT, PlotId(1), ALICE, Scope::Mine)
        .await
        .unwrap();
    assert!(mine.flagged);
}

#[tokio::test]
async fn failed_commit_leaves_no_lease_state() {
    let fx = lease_fixture(2).await;
    fx.manager
        .acquire_next(TEST_PROJECT, PlotId(0), ALICE, Scope::AnyUnassigned)
        .await
        .unwrap();

    fx.store.fail_commits(true);
    let err = fx
        .manager
        .acquire_next(TEST_PROJECT, PlotId(1), ALICE, Scope::AnyUnassigned)
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    let first = fx.manager.plot(PlotId(1)).await.unwrap().unwrap();
    let second = fx.manager.plot(PlotId(2)).await.unwrap().unwrap();
    assert_eq!(first.lease.map(|l| l.user_id), Some(ALICE));
    assert_eq!(second.lease, None);

    fx.store.fail_commits(false);
    fx.store.set_unavailable(true);
    assert!(matches!(
        fx.manager.release(ALICE).await,
        Err(LeaseError::Store(StoreError::Unavailable(_)))
    ));
}

#[tokio::test]
async fn empty_project_summary_distinguishes_exhaustion() {
    let fx = lease_fixture(1).await;
    let other = survey_lease::ProjectId(99);
    assert!(fx
        .manager
        .acquire_next(other, PlotId(0), ALICE, Scope::AnyUnassigned)
        .await
        .unwrap()
        .is_none());
    assert_eq!(fx.manager.summary(other).await.unwrap().total, 0);
    assert_eq!(fx.manager.list_plots(TEST_PROJECT, 10).await.unwrap().len(), 1);
}
