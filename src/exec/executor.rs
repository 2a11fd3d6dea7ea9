// src/exec/executor.rs

//! The concurrent, dependency-ordered executor.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::config::ExecutorConfig;
use crate::context::CancelContext;
use crate::dag::{BuildTarget, DependencyGraph, TargetState};
use crate::errors::{ExecuteError, TargetFailure, TargetReport};
use crate::exec::observer::{ExecutionObserver, TargetEvent};
use crate::exec::task_runner::run_target;
use crate::types::TargetName;

/// Tunables applied to every [`Executor::execute`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorOptions {
    /// Deadline layered onto the caller's context for each execution.
    pub timeout: Option<Duration>,
}

impl From<&ExecutorConfig> for ExecutorOptions {
    fn from(cfg: &ExecutorConfig) -> Self {
        Self {
            timeout: cfg.timeout,
        }
    }
}

/// Walks a [`DependencyGraph`] concurrently.
///
/// One tokio task is spawned per target, lazily, once the first of its
/// dependencies settles (roots are spawned up front). The `started` set is
/// owned by this executor, so independent executors never interfere.
pub struct Executor {
    graph: Arc<DependencyGraph>,
    /// Names whose task has been launched. Claiming a name is a single
    /// insert under this lock.
    started: Arc<Mutex<HashSet<TargetName>>>,
    observer: Option<Arc<dyn ExecutionObserver>>,
    options: ExecutorOptions,
    /// Serializes `execute` calls on the same executor.
    run_lock: tokio::sync::Mutex<()>,
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("graph", &self.graph)
            .field("options", &self.options)
            .field("has_observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl Executor {
    pub fn new(graph: DependencyGraph) -> Self {
        Self {
            graph: Arc::new(graph),
            started: Arc::new(Mutex::new(HashSet::new())),
            observer: None,
            options: ExecutorOptions::default(),
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Run every target's action at most once, respecting dependencies.
    ///
    /// Blocks until every launched task has returned, then reports every
    /// target that did not succeed. Returns `Ok(())` only if all targets
    /// succeeded. Targets can only run once: calling this again launches
    /// nothing and reports the outcome already recorded.
    pub async fn execute(&self, ctx: &CancelContext) -> Result<(), ExecuteError> {
        let _guard = self.run_lock.lock().await;

        let ctx = match self.options.timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx.child(),
        };

        let started_at = Instant::now();
        let (handle_tx, mut handle_rx) = mpsc::unbounded_channel();
        let launcher = Launcher {
            graph: Arc::clone(&self.graph),
            started: Arc::clone(&self.started),
            observer: self.observer.clone(),
            ctx: ctx.clone(),
            handles: handle_tx,
        };

        info!(targets = self.graph.len(), "starting build execution");

        for root in self.graph.roots() {
            launcher.try_launch(root);
        }
        // Every task holds its own launcher; the channel closes once the last
        // task has returned and nothing else can be launched.
        drop(launcher);

        while let Some(handle) = handle_rx.recv().await {
            if let Err(err) = handle.await {
                error!(error = %err, "target task terminated abnormally");
            }
        }

        let failures = self.settle(&ctx);

        let total = self.graph.len();
        let skipped = failures.iter().filter(|r| !r.failure.action_ran()).count();
        info!(
            succeeded = total - failures.len(),
            failed = failures.len() - skipped,
            skipped,
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "build execution finished"
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ExecuteError::new(failures))
        }
    }

    /// Settle targets that were never launched and collect every failure.
    ///
    /// Every target reachable from a root is launched, so this only catches
    /// targets whose task never ran or exited early.
    ///
    /// Walks in insertion order, so a target's dependencies are always
    /// settled before the target itself.
    fn settle(&self, ctx: &CancelContext) -> Vec<TargetReport> {
        let mut failures = Vec::new();

        for target in self.graph.targets() {
            match target.state() {
                TargetState::Pending => {
                    let cause = never_launched_cause(target, ctx);
                    if target.mark_failed(cause.clone()) {
                        debug!(
                            target_name = %target.name(),
                            phase = %cause.phase(),
                            "target never launched"
                        );
                        self.notify(TargetEvent::Skipped {
                            target: target.name().to_string(),
                            cause,
                        });
                    }
                }
                TargetState::Running => {
                    error!(target_name = %target.name(), "target still running after its task exited");
                    if target.mark_failed(TargetFailure::Aborted) {
                        self.notify(TargetEvent::Skipped {
                            target: target.name().to_string(),
                            cause: TargetFailure::Aborted,
                        });
                    }
                }
                TargetState::Succeeded | TargetState::Failed => {}
            }

            if let Some(failure) = target.failure() {
                failures.push(TargetReport {
                    target: target.name().to_string(),
                    failure,
                });
            }
        }

        failures
    }

    fn notify(&self, event: TargetEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event);
        }
    }
}

fn never_launched_cause(target: &BuildTarget, ctx: &CancelContext) -> TargetFailure {
    if let Some(dep) = target
        .dependencies()
        .iter()
        .find(|d| d.state() == TargetState::Failed)
    {
        return TargetFailure::SkippedDueToDependencyFailure {
            dependency: dep.name().to_string(),
        };
    }
    if ctx.is_cancelled() {
        TargetFailure::Cancelled
    } else {
        TargetFailure::Aborted
    }
}

/// Per-execution handle shared by every target task.
///
/// Cloning is cheap; each clone keeps the join-handle channel open.
#[derive(Clone)]
pub(crate) struct Launcher {
    graph: Arc<DependencyGraph>,
    started: Arc<Mutex<HashSet<TargetName>>>,
    observer: Option<Arc<dyn ExecutionObserver>>,
    ctx: CancelContext,
    handles: mpsc::UnboundedSender<JoinHandle<()>>,
}

impl Launcher {
    pub(crate) fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub(crate) fn ctx(&self) -> &CancelContext {
        &self.ctx
    }

    /// Launch `target`'s task unless some caller already has.
    ///
    /// Returns `true` if this call won the claim.
    pub(crate) fn try_launch(&self, target: &Arc<BuildTarget>) -> bool {
        let claimed = self
            .started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(target.name().to_string());

        if !claimed {
            trace!(target_name = %target.name(), "already launched; ignoring");
            return false;
        }

        debug!(target_name = %target.name(), "launching target task");
        let handle = tokio::spawn(run_target(self.clone(), Arc::clone(target)));
        if self.handles.send(handle).is_err() {
            // Receiver lives until every launcher is dropped, and `self` is one.
            error!(target_name = %target.name(), "execution already finished; task not tracked");
        }
        true
    }

    pub(crate) fn notify(&self, event: TargetEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event);
        }
    }
}
