// src/exec/mod.rs

//! Concurrent execution of a [`DependencyGraph`](crate::dag::DependencyGraph).
//!
//! - [`executor`] owns the [`Executor`]: root dispatch, the `started` dedup
//!   set, and aggregation of per-target failures.
//! - [`task_runner`] is the per-target task (fan-in, action, fan-out).
//! - [`observer`] provides the [`ExecutionObserver`] hook and a
//!   [`LoggingObserver`] built on `tracing`.

pub mod executor;
pub mod observer;
pub(crate) mod task_runner;

pub use executor::{Executor, ExecutorOptions};
pub use observer::{ExecutionObserver, LoggingObserver, TargetEvent};
