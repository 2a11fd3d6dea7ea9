// src/lib.rs

//! Dependency-ordered, concurrent build execution.
//!
//! Build a [`DependencyGraph`] with repeated
//! [`add_target`](DependencyGraph::add_target) calls (dependencies must be
//! added first, which makes cycles impossible), then hand it to an
//! [`Executor`]. Each target's action runs at most once, never before all of
//! its dependencies succeeded, and independent targets run in parallel.
//!
//! ```no_run
//! use buildgraph::{Action, CancelContext, DependencyGraph, Executor};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let mut graph = DependencyGraph::new();
//! graph.add_root("fetch", Action::new(|| async { Ok(()) }))?;
//! graph.add_target("compile", Action::blocking(|| Ok(())), ["fetch"])?;
//!
//! Executor::new(graph).execute(&CancelContext::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::sync::Arc;

use tracing::debug;

pub use crate::config::ExecutorConfig;
pub use crate::context::CancelContext;
pub use crate::dag::{Action, BuildTarget, Completion, DependencyGraph, TargetState};
pub use crate::errors::{
    BuildgraphError, ExecuteError, FailurePhase, GraphError, Result, TargetFailure, TargetReport,
};
pub use crate::exec::{
    ExecutionObserver, Executor, ExecutorOptions, LoggingObserver, TargetEvent,
};

/// High-level entry point for build orchestration layers.
///
/// Applies `config`, reports transitions through a [`LoggingObserver`], and
/// executes `graph` under `ctx`.
///
/// A configured `[logging].level` installs the global subscriber through
/// [`logging::init_logging`]. If the process already has one, it is kept.
pub async fn run(graph: DependencyGraph, config: &ExecutorConfig, ctx: &CancelContext) -> Result<()> {
    if let Some(level) = config.log_level {
        if let Err(err) = logging::init_logging(Some(level)) {
            debug!(error = %err, "keeping existing tracing subscriber");
        }
    }
    debug!(?config, targets = graph.len(), "running build graph");

    let executor = Executor::new(graph)
        .with_options(ExecutorOptions::from(config))
        .with_observer(Arc::new(LoggingObserver));

    executor.execute(ctx).await?;
    Ok(())
}
