// tests/cancellation.rs

mod common;
use crate::common::{init_tracing, with_timeout, GraphFixture, TestResult};

use std::time::Duration;

use tokio::time::Instant;

use buildgraph::{CancelContext, Executor, ExecutorOptions, FailurePhase, TargetFailure, TargetState};

#[tokio::test]
async fn test_cancel_during_execution_returns_promptly() -> TestResult {
    init_tracing();

    let ctx = CancelContext::new();
    let fixture = GraphFixture::new();
    let probe = fixture.probe();
    let (graph, _) = fixture
        .with_action("A", &[], probe.cancellable("A", Duration::from_secs(30), ctx.clone()))
        .target("B", &["A"])
        .build();
    let executor = Executor::new(graph);

    let canceller = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            ctx.cancel();
        })
    };

    let begun = Instant::now();
    let err = with_timeout(executor.execute(&ctx))
        .await
        .expect_err("cancelled execution cannot succeed");
    canceller.await?;

    assert!(begun.elapsed() < Duration::from_secs(5));
    match err.failure_of("A") {
        Some(TargetFailure::ActionFailed { source, .. }) => {
            assert!(source.to_string().contains("interrupted"));
        }
        other => panic!("expected A to fail, got {other:?}"),
    }
    assert!(!probe.ran("B"));
    assert!(matches!(
        err.failure_of("B"),
        Some(TargetFailure::SkippedDueToDependencyFailure { dependency }) if dependency == "A"
    ));
    Ok(())
}

#[tokio::test]
async fn test_dependent_of_finished_target_is_cancelled_after_cancel() -> TestResult {
    init_tracing();

    let (graph, probe) = GraphFixture::new()
        .slow("A", &[], Duration::from_millis(100))
        .target("B", &["A"])
        .build();
    let executor = Executor::new(graph);
    let ctx = CancelContext::new();

    let canceller = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            ctx.cancel();
        })
    };

    let err = with_timeout(executor.execute(&ctx))
        .await
        .expect_err("B must not run after cancellation");
    canceller.await?;

    assert!(probe.ran("A"), "A was already running and ignores the context");
    assert_eq!(
        executor.graph().target("A").map(|t| t.state()),
        Some(TargetState::Succeeded)
    );
    assert!(!probe.ran("B"));
    assert!(matches!(err.failure_of("B"), Some(TargetFailure::Cancelled)));
    assert_eq!(err.failure_of("B").map(|f| f.phase()), Some(FailurePhase::Cancelled));
    Ok(())
}

#[tokio::test]
async fn test_cancel_releases_target_waiting_on_dependencies() -> TestResult {
    init_tracing();

    // C is launched by `fast` but still waits on `slow` when the cancel lands.
    let (graph, probe) = GraphFixture::new()
        .target("fast", &[])
        .slow("slow", &[], Duration::from_millis(150))
        .target("C", &["fast", "slow"])
        .build();
    let executor = Executor::new(graph);
    let ctx = CancelContext::new();

    let canceller = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            ctx.cancel();
        })
    };

    let err = with_timeout(executor.execute(&ctx)).await.expect_err("C is cancelled");
    canceller.await?;

    assert!(!probe.ran("C"));
    assert!(matches!(err.failure_of("C"), Some(TargetFailure::Cancelled)));
    assert!(err.failure_of("slow").is_none(), "slow still completes");
    assert_eq!(err.failed_targets().count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_pre_cancelled_context_runs_nothing() {
    let (graph, probe) = GraphFixture::diamond().build();
    let executor = Executor::new(graph);
    let ctx = CancelContext::new();
    ctx.cancel();

    let err = with_timeout(executor.execute(&ctx))
        .await
        .expect_err("nothing may run");

    for name in ["A", "B", "C", "D"] {
        assert!(!probe.ran(name), "{name} must not run");
    }
    assert!(matches!(err.failure_of("A"), Some(TargetFailure::Cancelled)));
    assert_eq!(err.failures().len(), 4);
    assert_eq!(err.failed_targets().count(), 0);
    for target in executor.graph().targets() {
        assert_eq!(target.state(), TargetState::Failed);
    }
}

#[tokio::test]
async fn test_executor_timeout_cancels_remaining_work() -> TestResult {
    init_tracing();

    let (graph, probe) = GraphFixture::new()
        .slow("A", &[], Duration::from_millis(100))
        .target("B", &["A"])
        .build();
    let executor = Executor::new(graph).with_options(ExecutorOptions {
        timeout: Some(Duration::from_millis(30)),
    });
    let ctx = CancelContext::new();

    let err = with_timeout(executor.execute(&ctx))
        .await
        .expect_err("deadline passes before B");

    assert!(probe.ran("A"));
    assert!(!probe.ran("B"));
    assert!(matches!(err.failure_of("B"), Some(TargetFailure::Cancelled)));
    assert!(!ctx.is_cancelled(), "the caller's context is left alone");
    Ok(())
}

#[tokio::test]
async fn test_parent_cancel_reaches_children_but_not_the_reverse() {
    let parent = CancelContext::new();
    let child = parent.child();
    let grandchild = child.child();
    let sibling = parent.child();

    child.cancel();
    assert!(child.is_cancelled());
    assert!(grandchild.is_cancelled());
    assert!(!parent.is_cancelled());
    assert!(!sibling.is_cancelled());

    parent.cancel();
    assert!(sibling.is_cancelled());
    with_timeout(sibling.cancelled()).await;
}

#[tokio::test]
async fn test_child_of_cancelled_parent_starts_cancelled() {
    let parent = CancelContext::new();
    parent.cancel();

    let child = parent.child();
    assert!(child.is_cancelled());
    with_timeout(child.cancelled()).await;
}

#[tokio::test]
async fn test_earliest_deadline_wins() {
    let now = Instant::now();
    let parent = CancelContext::new().with_deadline(now + Duration::from_millis(50));

    let later = parent.with_deadline(now + Duration::from_secs(60));
    assert_eq!(later.deadline(), parent.deadline());

    let sooner = parent.with_deadline(now + Duration::from_millis(10));
    assert_eq!(sooner.deadline(), Some(now + Duration::from_millis(10)));

    assert!(CancelContext::new().deadline().is_none());
}

#[tokio::test]
async fn test_timeout_context_expires_on_its_own() {
    let ctx = CancelContext::new().with_timeout(Duration::from_millis(20));
    assert!(!ctx.is_cancelled());

    with_timeout(ctx.cancelled()).await;
    assert!(ctx.is_cancelled());
}

#[tokio::test]
async fn test_cancelled_resolves_for_many_waiters() -> TestResult {
    let ctx = CancelContext::new();
    let mut waiters = Vec::new();
    for _ in 0..8 {
        let ctx = ctx.clone();
        waiters.push(tokio::spawn(async move { ctx.cancelled().await }));
    }

    tokio::time::sleep(Duration::from_millis(10)).await;
    ctx.cancel();

    for waiter in waiters {
        with_timeout(waiter).await?;
    }
    Ok(())
}
