// src/dag/target.rs

//! A single buildable unit and its completion signal.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, trace};

use crate::context::CancelContext;
use crate::dag::action::Action;
use crate::dag::state::{Completion, Status, TargetState};
use crate::errors::{TargetFailure, TransitionError, WaitCancelled};
use crate::types::TargetName;

/// One node of the [`DependencyGraph`](super::DependencyGraph).
///
/// The target's status lives inside a `watch` channel: every transition is an
/// atomic check-and-set under the channel's lock, and waiters are woken only
/// when a terminal value is published. Late subscribers see the terminal value
/// immediately, so the signal supports any number of waiters.
pub struct BuildTarget {
    name: TargetName,
    action: Mutex<Option<Action>>,
    dependencies: Vec<Arc<BuildTarget>>,
    status: watch::Sender<Status>,
}

impl fmt::Debug for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let deps: Vec<&str> = self.dependencies.iter().map(|d| d.name()).collect();
        f.debug_struct("BuildTarget")
            .field("name", &self.name)
            .field("dependencies", &deps)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl BuildTarget {
    pub(crate) fn new(name: TargetName, action: Action, dependencies: Vec<Arc<BuildTarget>>) -> Self {
        let (status, _) = watch::channel(Status::Pending);
        Self {
            name,
            action: Mutex::new(Some(action)),
            dependencies,
            status,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Direct dependencies, in declaration order.
    pub fn dependencies(&self) -> &[Arc<BuildTarget>] {
        &self.dependencies
    }

    pub fn state(&self) -> TargetState {
        self.status.borrow().state()
    }

    /// Non-blocking peek at whether the target has settled.
    pub fn is_terminal(&self) -> bool {
        self.status.borrow().is_terminal()
    }

    /// The recorded failure, if the target ended in `Failed`.
    pub fn failure(&self) -> Option<TargetFailure> {
        match &*self.status.borrow() {
            Status::Failed { failure } => Some(failure.clone()),
            _ => None,
        }
    }

    /// How long the action ran, once it has settled after running.
    pub fn duration(&self) -> Option<Duration> {
        match &*self.status.borrow() {
            Status::Succeeded { duration } => Some(*duration),
            Status::Failed {
                failure: TargetFailure::ActionFailed { duration, .. },
            } => Some(*duration),
            _ => None,
        }
    }

    /// `Pending -> Running`.
    pub fn mark_running(&self) -> Result<(), TransitionError> {
        let mut from = TargetState::Pending;
        let moved = self.status.send_if_modified(|status| {
            from = status.state();
            if matches!(status, Status::Pending) {
                *status = Status::Running;
                true
            } else {
                false
            }
        });

        if moved {
            trace!(target_name = %self.name, "target running");
            Ok(())
        } else {
            Err(TransitionError {
                target: self.name.clone(),
                from,
                to: TargetState::Running,
            })
        }
    }

    /// `Running -> Succeeded`, releasing every waiter.
    ///
    /// Returns `true` if this call settled the target. Later calls, and calls
    /// on a target that is not running, are no-ops.
    pub fn mark_succeeded(&self, duration: Duration) -> bool {
        let settled = self.status.send_if_modified(|status| {
            if matches!(status, Status::Running) {
                *status = Status::Succeeded { duration };
                true
            } else {
                false
            }
        });

        if !settled {
            debug!(target_name = %self.name, state = ?self.state(), "ignoring late success");
        }
        settled
    }

    /// `Pending | Running -> Failed`, releasing every waiter.
    ///
    /// Returns `true` if this call settled the target; no-op once terminal.
    pub fn mark_failed(&self, failure: TargetFailure) -> bool {
        let settled = self.status.send_if_modified(|status| {
            if status.is_terminal() {
                false
            } else {
                *status = Status::Failed { failure };
                true
            }
        });

        if !settled {
            debug!(target_name = %self.name, state = ?self.state(), "ignoring late failure");
        }
        settled
    }

    /// Wait until the target settles or `ctx` is cancelled.
    ///
    /// If the target is already terminal its outcome wins over a cancelled
    /// context.
    pub async fn wait(&self, ctx: &CancelContext) -> Result<Completion, WaitCancelled> {
        let mut rx = self.status.subscribe();

        tokio::select! {
            biased;
            completion = settled(&mut rx) => Ok(completion),
            _ = ctx.cancelled() => Err(WaitCancelled),
        }
    }

    /// Take the action out of the target. Returns `None` after the first call.
    pub(crate) fn take_action(&self) -> Option<Action> {
        self.action
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

async fn settled(rx: &mut watch::Receiver<Status>) -> Completion {
    match rx.wait_for(Status::is_terminal).await {
        Ok(status) => status.completion().unwrap_or(Completion::Failed(TargetFailure::Aborted)),
        // The sender is owned by the target, which outlives this borrow.
        Err(_) => Completion::Failed(TargetFailure::Aborted),
    }
}
