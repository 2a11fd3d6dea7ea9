#![allow(dead_code)]

use std::time::Duration;

use buildgraph::{Action, DependencyGraph};

use crate::probe::ActionProbe;

/// Builder for a `DependencyGraph` whose actions report to one `ActionProbe`.
///
/// Panics on graph errors; use `DependencyGraph` directly to test those.
pub struct GraphFixture {
    graph: DependencyGraph,
    probe: ActionProbe,
}

impl GraphFixture {
    pub fn new() -> Self {
        Self {
            graph: DependencyGraph::new(),
            probe: ActionProbe::new(),
        }
    }

    /// `A`; `B` after `A`; `C` after `A`; `D` after `B` and `C`.
    pub fn diamond() -> Self {
        Self::new()
            .target("A", &[])
            .target("B", &["A"])
            .target("C", &["A"])
            .target("D", &["B", "C"])
    }

    pub fn target(self, name: &str, deps: &[&str]) -> Self {
        let action = self.probe.succeed(name);
        self.with_action(name, deps, action)
    }

    pub fn failing(self, name: &str, deps: &[&str]) -> Self {
        let action = self.probe.fail(name);
        self.with_action(name, deps, action)
    }

    pub fn slow(self, name: &str, deps: &[&str], delay: Duration) -> Self {
        let action = self.probe.slow(name, delay);
        self.with_action(name, deps, action)
    }

    pub fn slow_failing(self, name: &str, deps: &[&str], delay: Duration) -> Self {
        let action = self.probe.slow_fail(name, delay);
        self.with_action(name, deps, action)
    }

    pub fn with_action(mut self, name: &str, deps: &[&str], action: Action) -> Self {
        self.graph
            .add_target(name, action, deps.iter().copied())
            .expect("fixture target must be valid");
        self
    }

    pub fn probe(&self) -> ActionProbe {
        self.probe.clone()
    }

    pub fn build(self) -> (DependencyGraph, ActionProbe) {
        (self.graph, self.probe)
    }
}

impl Default for GraphFixture {
    fn default() -> Self {
        Self::new()
    }
}
