// src/dag/mod.rs

//! Build targets and the dependency graph that owns them.
//!
//! - [`target`] holds a single [`BuildTarget`] with its one-shot completion
//!   signal.
//! - [`state`] defines target lifecycle states and wait outcomes.
//! - [`action`] wraps caller-supplied build actions.
//! - [`graph`] holds the [`DependencyGraph`] plus its reverse index.

pub mod action;
pub mod graph;
pub mod state;
pub mod target;

pub use action::{Action, ActionFuture};
pub use graph::DependencyGraph;
pub use state::{Completion, TargetState};
pub use target::BuildTarget;
