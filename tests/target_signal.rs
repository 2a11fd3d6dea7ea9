// tests/target_signal.rs

mod common;
use crate::common::{init_tracing, with_timeout, TestResult};

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tokio::task::JoinSet;

use buildgraph::errors::WaitCancelled;
use buildgraph::{
    Action, BuildTarget, CancelContext, Completion, DependencyGraph, TargetFailure, TargetState,
};

fn single_target() -> Arc<BuildTarget> {
    let mut graph = DependencyGraph::new();
    graph
        .add_root("lib", Action::noop())
        .expect("fresh graph accepts a root")
}

#[test]
fn test_mark_running_twice_is_an_error() {
    let target = single_target();

    target.mark_running().expect("first start is valid");
    let err = target.mark_running().expect_err("second start is a programmer error");

    assert_eq!(err.from, TargetState::Running);
    assert_eq!(err.to, TargetState::Running);
    assert_eq!(target.state(), TargetState::Running);
}

#[test]
fn test_terminal_state_never_regresses() {
    let target = single_target();
    target.mark_running().unwrap();

    assert!(target.mark_succeeded(Duration::from_millis(3)));
    assert!(!target.mark_failed(TargetFailure::Cancelled));
    assert!(!target.mark_succeeded(Duration::from_millis(9)));

    assert_eq!(target.state(), TargetState::Succeeded);
    assert!(target.is_terminal());
    assert!(target.failure().is_none());
    assert_eq!(target.duration(), Some(Duration::from_millis(3)));
    assert!(target.mark_running().is_err());
}

#[test]
fn test_pending_target_can_be_skipped_but_not_succeeded() {
    let target = single_target();

    assert!(!target.mark_succeeded(Duration::ZERO), "success requires Running");
    assert_eq!(target.state(), TargetState::Pending);

    assert!(target.mark_failed(TargetFailure::SkippedDueToDependencyFailure {
        dependency: "dep".to_string(),
    }));
    assert_eq!(target.state(), TargetState::Failed);
    assert!(target.duration().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_completion_releases_every_waiter_with_outcome() -> TestResult {
    init_tracing();

    let target = single_target();
    let ctx = CancelContext::new();

    let mut waiters = JoinSet::new();
    for _ in 0..32 {
        let target = Arc::clone(&target);
        let ctx = ctx.clone();
        waiters.spawn(async move { target.wait(&ctx).await });
    }

    tokio::time::sleep(Duration::from_millis(20)).await;
    target.mark_running()?;
    target.mark_failed(TargetFailure::action_failed(
        anyhow!("linker exploded"),
        Duration::from_millis(5),
    ));

    let mut released = 0;
    while let Some(joined) = with_timeout(waiters.join_next()).await {
        match joined? {
            Ok(Completion::Failed(TargetFailure::ActionFailed { source, .. })) => {
                assert!(source.to_string().contains("linker exploded"));
                released += 1;
            }
            other => panic!("expected ActionFailed, got {other:?}"),
        }
    }
    assert_eq!(released, 32);
    Ok(())
}

#[tokio::test]
async fn test_late_waiter_sees_terminal_outcome_immediately() -> TestResult {
    let target = single_target();
    target.mark_running()?;
    target.mark_succeeded(Duration::from_millis(1));

    let outcome = with_timeout(target.wait(&CancelContext::new())).await;
    assert!(matches!(outcome, Ok(Completion::Succeeded)));
    Ok(())
}

#[tokio::test]
async fn test_cancelled_wait_is_distinct_from_failure() {
    let target = single_target();
    let ctx = CancelContext::new();

    let waiter = {
        let target = Arc::clone(&target);
        let ctx = ctx.clone();
        tokio::spawn(async move { target.wait(&ctx).await })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    ctx.cancel();

    let outcome = with_timeout(waiter).await.unwrap();
    assert_eq!(outcome.unwrap_err(), WaitCancelled);
    assert_eq!(target.state(), TargetState::Pending, "cancelling a wait does not settle the target");
}

#[tokio::test]
async fn test_terminal_outcome_wins_over_cancelled_context() {
    let target = single_target();
    target.mark_running().unwrap();
    target.mark_succeeded(Duration::ZERO);

    let ctx = CancelContext::new();
    ctx.cancel();

    let outcome = target.wait(&ctx).await;
    assert!(matches!(outcome, Ok(Completion::Succeeded)));
}
