// src/exec/task_runner.rs

//! The per-target task: fan in, run the action, fan out.

use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::context::CancelContext;
use crate::dag::{BuildTarget, Completion};
use crate::errors::{TargetFailure, WaitCancelled};
use crate::exec::executor::Launcher;
use crate::exec::observer::TargetEvent;

/// Drive a single target to a terminal state, then launch its dependents.
///
/// - Waits on every direct dependency concurrently. The first failed
///   dependency or a cancelled context settles this target as `Failed`
///   without running the action.
/// - Otherwise runs the action exactly once in its own tokio task, so a
///   panic becomes an ordinary failure.
/// - Dependents are launched whatever the outcome. After a failure they fan
///   in, see it, and settle as skipped, which in turn releases anything
///   waiting on them. The launcher's `started` set makes repeated attempts
///   harmless.
pub(crate) async fn run_target(launcher: Launcher, target: Arc<BuildTarget>) {
    settle_target(&launcher, &target).await;

    if !target.is_terminal() {
        return;
    }
    for dependent in launcher.graph().dependents(target.name()) {
        launcher.try_launch(dependent);
    }
}

async fn settle_target(launcher: &Launcher, target: &BuildTarget) {
    if let Err(cause) = await_dependencies(target, launcher.ctx()).await {
        skip(launcher, target, cause);
        return;
    }

    if launcher.ctx().is_cancelled() {
        skip(launcher, target, TargetFailure::Cancelled);
        return;
    }

    if let Err(err) = target.mark_running() {
        error!(target_name = %target.name(), error = %err, "refusing to start target");
        return;
    }

    let Some(action) = target.take_action() else {
        error!(target_name = %target.name(), "action already taken");
        skip(launcher, target, TargetFailure::Aborted);
        return;
    };

    launcher.notify(TargetEvent::Started {
        target: target.name().to_string(),
    });
    debug!(target_name = %target.name(), "running action");

    let began = Instant::now();
    let result = match tokio::spawn(action.into_future()).await {
        Ok(result) => result,
        Err(join_err) if join_err.is_panic() => Err(anyhow!("action panicked")),
        Err(join_err) => Err(anyhow!("action was aborted: {join_err}")),
    };
    let duration = began.elapsed();

    match result {
        Ok(()) => {
            if !target.mark_succeeded(duration) {
                return;
            }
            info!(
                target_name = %target.name(),
                duration_ms = duration.as_millis() as u64,
                "target succeeded"
            );
            launcher.notify(TargetEvent::Succeeded {
                target: target.name().to_string(),
                duration,
            });
        }
        Err(err) => {
            warn!(
                target_name = %target.name(),
                duration_ms = duration.as_millis() as u64,
                error = %format!("{err:#}"),
                "target action failed"
            );
            let failure = TargetFailure::action_failed(err, duration);
            if target.mark_failed(failure.clone()) {
                launcher.notify(TargetEvent::Failed {
                    target: target.name().to_string(),
                    duration,
                    error: failure,
                });
            }
        }
    }
}

fn skip(launcher: &Launcher, target: &BuildTarget, cause: TargetFailure) {
    debug!(
        target_name = %target.name(),
        phase = %cause.phase(),
        cause = %cause,
        "not running action"
    );
    if target.mark_failed(cause.clone()) {
        launcher.notify(TargetEvent::Skipped {
            target: target.name().to_string(),
            cause,
        });
    }
}

/// Fan in on every direct dependency.
///
/// Returns as soon as one dependency fails or the wait is cancelled; the
/// remaining waits are dropped.
async fn await_dependencies(target: &BuildTarget, ctx: &CancelContext) -> Result<(), TargetFailure> {
    match target.dependencies() {
        [] => Ok(()),
        [only] => check_dependency(only.name(), only.wait(ctx).await),
        deps => {
            let mut waits = JoinSet::new();
            for dep in deps {
                let dep = Arc::clone(dep);
                let ctx = ctx.clone();
                waits.spawn(async move {
                    let outcome = dep.wait(&ctx).await;
                    (dep, outcome)
                });
            }

            while let Some(joined) = waits.join_next().await {
                let (dep, outcome) = joined.map_err(|_| TargetFailure::Aborted)?;
                check_dependency(dep.name(), outcome)?;
            }
            Ok(())
        }
    }
}

fn check_dependency(
    dependency: &str,
    outcome: Result<Completion, WaitCancelled>,
) -> Result<(), TargetFailure> {
    match outcome {
        Ok(Completion::Succeeded) => Ok(()),
        Ok(Completion::Failed(_)) => Err(TargetFailure::SkippedDueToDependencyFailure {
            dependency: dependency.to_string(),
        }),
        Err(WaitCancelled) => Err(TargetFailure::Cancelled),
    }
}
