// src/dag/graph.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::dag::action::Action;
use crate::dag::target::BuildTarget;
use crate::errors::GraphError;
use crate::types::TargetName;

/// In-memory DAG of build targets keyed by name.
///
/// A target may only depend on targets that were added before it, so every
/// edge points backwards in insertion order. That rule alone keeps the graph
/// acyclic; there is no separate cycle check. It also means
/// [`targets`](Self::targets) yields a valid topological order.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    targets: HashMap<TargetName, Arc<BuildTarget>>,
    /// Insertion order.
    order: Vec<Arc<BuildTarget>>,
    /// Reverse index: name -> targets that directly depend on it.
    dependents: HashMap<TargetName, Vec<Arc<BuildTarget>>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target whose dependencies have all been added already.
    ///
    /// Duplicate names in `dependencies` are collapsed, keeping the first
    /// occurrence. On error the graph is left untouched.
    pub fn add_target<I, S>(
        &mut self,
        name: impl Into<TargetName>,
        action: Action,
        dependencies: I,
    ) -> Result<Arc<BuildTarget>, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = name.into();
        if self.targets.contains_key(&name) {
            return Err(GraphError::DuplicateName(name));
        }

        // Resolve every dependency before touching any map.
        let mut seen = HashSet::new();
        let mut deps = Vec::new();
        for dep_name in dependencies {
            let dep_name = dep_name.as_ref();
            let dep = self
                .targets
                .get(dep_name)
                .ok_or_else(|| GraphError::UnknownDependency {
                    target: name.clone(),
                    dependency: dep_name.to_string(),
                })?;
            if seen.insert(dep_name.to_string()) {
                deps.push(Arc::clone(dep));
            }
        }

        let target = Arc::new(BuildTarget::new(name.clone(), action, deps));
        for dep in target.dependencies() {
            self.dependents
                .entry(dep.name().to_string())
                .or_default()
                .push(Arc::clone(&target));
        }
        self.targets.insert(name.clone(), Arc::clone(&target));
        self.order.push(Arc::clone(&target));

        debug!(
            target_name = %name,
            deps = ?target.dependencies().iter().map(|d| d.name()).collect::<Vec<_>>(),
            "added target to dependency graph"
        );

        Ok(target)
    }

    /// Register a target with no dependencies.
    pub fn add_root(
        &mut self,
        name: impl Into<TargetName>,
        action: Action,
    ) -> Result<Arc<BuildTarget>, GraphError> {
        self.add_target(name, action, std::iter::empty::<&str>())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    pub fn target(&self, name: &str) -> Option<&Arc<BuildTarget>> {
        self.targets.get(name)
    }

    /// All targets in insertion (topological) order.
    pub fn targets(&self) -> impl Iterator<Item = &Arc<BuildTarget>> {
        self.order.iter()
    }

    /// Targets with no dependencies, in insertion order.
    pub fn roots(&self) -> impl Iterator<Item = &Arc<BuildTarget>> {
        self.order.iter().filter(|t| t.dependencies().is_empty())
    }

    /// Direct dependencies of `name` (empty for unknown names).
    pub fn dependencies_of(&self, name: &str) -> &[Arc<BuildTarget>] {
        self.targets
            .get(name)
            .map(|t| t.dependencies())
            .unwrap_or(&[])
    }

    /// Direct dependents of `name` (empty for unknown names).
    pub fn dependents(&self, name: &str) -> &[Arc<BuildTarget>] {
        self.dependents
            .get(name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}
