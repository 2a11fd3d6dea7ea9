// src/dag/state.rs

//! Target lifecycle states.

use std::time::Duration;

use crate::errors::TargetFailure;

/// Lifecycle state of a [`BuildTarget`](super::BuildTarget).
///
/// Normal path: `Pending -> Running -> {Succeeded | Failed}`.
/// Skipped path: `Pending -> Failed` (the action never ran).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TargetState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TargetState::Succeeded | TargetState::Failed)
    }
}

/// Terminal outcome observed by a waiter.
#[derive(Debug, Clone)]
pub enum Completion {
    Succeeded,
    Failed(TargetFailure),
}

impl Completion {
    pub fn is_success(&self) -> bool {
        matches!(self, Completion::Succeeded)
    }
}

/// Value carried by a target's completion signal.
///
/// The terminal outcome is part of the signalled value, so a waiter can
/// never observe "finished" without also observing whether it succeeded.
#[derive(Debug, Clone)]
pub(crate) enum Status {
    Pending,
    Running,
    Succeeded { duration: Duration },
    Failed { failure: TargetFailure },
}

impl Status {
    pub(crate) fn state(&self) -> TargetState {
        match self {
            Status::Pending => TargetState::Pending,
            Status::Running => TargetState::Running,
            Status::Succeeded { .. } => TargetState::Succeeded,
            Status::Failed { .. } => TargetState::Failed,
        }
    }

    pub(crate) fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// `None` while the target is still pending or running.
    pub(crate) fn completion(&self) -> Option<Completion> {
        match self {
            Status::Pending | Status::Running => None,
            Status::Succeeded { .. } => Some(Completion::Succeeded),
            Status::Failed { failure } => Some(Completion::Failed(failure.clone())),
        }
    }
}
