// src/errors.rs

//! Crate-wide error types.
//!
//! - [`GraphError`]: construction-time failures from
//!   [`DependencyGraph::add_target`](crate::dag::DependencyGraph::add_target).
//! - [`TargetFailure`]: why a single target ended in `Failed`. It is cheap to
//!   clone because it travels with the target's completion signal to every
//!   waiter.
//! - [`ExecuteError`]: the aggregate returned by
//!   [`Executor::execute`](crate::exec::Executor::execute).
//! - [`BuildgraphError`]: top-level error for config loading and the
//!   [`run`](crate::run) entry point.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::dag::TargetState;
use crate::types::TargetName;

/// Errors returned while building a [`DependencyGraph`](crate::dag::DependencyGraph).
///
/// Neither variant mutates the graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("target '{0}' already exists in the graph")]
    DuplicateName(TargetName),

    #[error("target '{target}' depends on unknown target '{dependency}'")]
    UnknownDependency {
        target: TargetName,
        dependency: TargetName,
    },
}

/// Illegal state transition on a [`BuildTarget`](crate::dag::BuildTarget).
///
/// Only produced by programmer error (e.g. starting a target twice).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("target '{target}' cannot move to {to:?} from {from:?}")]
pub struct TransitionError {
    pub target: TargetName,
    pub from: TargetState,
    pub to: TargetState,
}

/// Returned by [`BuildTarget::wait`](crate::dag::BuildTarget::wait) when the
/// context was cancelled before the target settled.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("wait for target completion was cancelled")]
pub struct WaitCancelled;

/// Cause of a failed action, shared between every waiter.
pub type ActionError = Arc<dyn StdError + Send + Sync + 'static>;

/// Why a target ended in the `Failed` state.
#[derive(Error, Debug, Clone)]
pub enum TargetFailure {
    /// The action ran and returned an error (or panicked).
    #[error("action failed after {duration:?}: {}", render_chain(.source))]
    ActionFailed {
        #[source]
        source: ActionError,
        duration: Duration,
    },

    /// The context was cancelled while fanning in or before the action started.
    #[error("cancelled before the action could run")]
    Cancelled,

    /// A dependency (direct, or through a skipped chain) failed.
    #[error("skipped because dependency '{dependency}' did not succeed")]
    SkippedDueToDependencyFailure { dependency: TargetName },

    /// The target's task exited without settling it.
    #[error("target task exited before settling the target")]
    Aborted,
}

impl TargetFailure {
    pub fn action_failed(err: anyhow::Error, duration: Duration) -> Self {
        let boxed: Box<dyn StdError + Send + Sync + 'static> = err.into();
        TargetFailure::ActionFailed {
            source: Arc::from(boxed),
            duration,
        }
    }

    pub fn phase(&self) -> FailurePhase {
        match self {
            TargetFailure::ActionFailed { .. } => FailurePhase::Action,
            TargetFailure::Cancelled => FailurePhase::Cancelled,
            TargetFailure::SkippedDueToDependencyFailure { .. } => FailurePhase::Dependency,
            TargetFailure::Aborted => FailurePhase::Aborted,
        }
    }

    /// `true` if the action was actually invoked.
    pub fn action_ran(&self) -> bool {
        matches!(self, TargetFailure::ActionFailed { .. })
    }
}

/// Coarse classification of a [`TargetFailure`] used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailurePhase {
    Action,
    Dependency,
    Cancelled,
    Aborted,
}

impl fmt::Display for FailurePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailurePhase::Action => "action",
            FailurePhase::Dependency => "dependency",
            FailurePhase::Cancelled => "cancelled",
            FailurePhase::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// One entry of an [`ExecuteError`].
#[derive(Debug, Clone)]
pub struct TargetReport {
    pub target: TargetName,
    pub failure: TargetFailure,
}

impl fmt::Display for TargetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.target, self.failure.phase(), self.failure)
    }
}

/// Aggregate of every target that did not succeed during one execution.
///
/// Reports are listed in graph insertion order.
#[derive(Error, Debug, Clone)]
#[error("{} target(s) did not succeed: {}", .failures.len(), render_reports(.failures))]
pub struct ExecuteError {
    failures: Vec<TargetReport>,
}

impl ExecuteError {
    pub(crate) fn new(failures: Vec<TargetReport>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[TargetReport] {
        &self.failures
    }

    pub fn failure_of(&self, target: &str) -> Option<&TargetFailure> {
        self.failures
            .iter()
            .find(|r| r.target == target)
            .map(|r| &r.failure)
    }

    /// Names of targets whose action ran and failed.
    pub fn failed_targets(&self) -> impl Iterator<Item = &str> {
        self.failures
            .iter()
            .filter(|r| r.failure.action_ran())
            .map(|r| r.target.as_str())
    }

    /// Names of targets whose action never ran.
    pub fn skipped_targets(&self) -> impl Iterator<Item = &str> {
        self.failures
            .iter()
            .filter(|r| !r.failure.action_ran())
            .map(|r| r.target.as_str())
    }
}

/// `outer: inner: root`, the same rendering as anyhow's `{:#}`.
fn render_chain(err: &ActionError) -> String {
    let mut rendered = err.to_string();
    let mut next = err.source();
    while let Some(cause) = next {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        next = cause.source();
    }
    rendered
}

fn render_reports(reports: &[TargetReport]) -> String {
    reports
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum BuildgraphError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Execute(#[from] ExecuteError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildgraphError>;
