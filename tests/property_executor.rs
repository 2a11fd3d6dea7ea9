// tests/property_executor.rs

mod common;
use crate::common::GraphFixture;

use std::collections::BTreeSet;
use std::time::Duration;

use proptest::prelude::*;

use buildgraph::{CancelContext, Executor};

/// Dependency lists for a random DAG.
///
/// Acyclic by construction: task `i` may only depend on tasks `0..i`.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<BTreeSet<usize>>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..4),
            num_tasks,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, picks)| {
                    if i == 0 {
                        BTreeSet::new()
                    } else {
                        picks.into_iter().map(|p| p % i).collect()
                    }
                })
                .collect()
        })
    })
}

fn task_name(i: usize) -> String {
    format!("task_{i}")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_random_dag_execution_honours_dependencies(
        deps in dag_strategy(12),
        failing in proptest::collection::btree_set(0..12usize, 0..4),
    ) {
        let n = deps.len();
        let failing: BTreeSet<usize> = failing.into_iter().filter(|&i| i < n).collect();

        let mut fixture = GraphFixture::new();
        for (i, task_deps) in deps.iter().enumerate() {
            let names: Vec<String> = task_deps.iter().map(|&d| task_name(d)).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            fixture = if failing.contains(&i) {
                fixture.failing(&task_name(i), &refs)
            } else {
                fixture.target(&task_name(i), &refs)
            };
        }
        let (graph, probe) = fixture.build();
        let executor = Executor::new(graph);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();
        let result = runtime.block_on(async {
            tokio::time::timeout(Duration::from_secs(10), executor.execute(&CancelContext::new()))
                .await
        });
        prop_assert!(result.is_ok(), "execute did not finish for deps={:?} failing={:?}", deps, failing);
        let result = result.unwrap();

        // A task is blocked if any dependency failed or was itself blocked.
        let mut blocked = vec![false; n];
        for i in 0..n {
            blocked[i] = deps[i]
                .iter()
                .any(|&d| blocked[d] || failing.contains(&d));
        }

        for i in 0..n {
            let name = task_name(i);
            let expected_runs = usize::from(!blocked[i]);
            prop_assert_eq!(probe.invocations(&name), expected_runs, "{}", name);
            prop_assert!(executor.graph().target(&name).is_some_and(|t| t.is_terminal()));

            if !blocked[i] {
                for &d in &deps[i] {
                    prop_assert!(
                        probe.finished_before_start(&task_name(d), &name),
                        "{} started before {} finished", name, task_name(d)
                    );
                }
            }
        }

        let expected_failed: Vec<String> = (0..n)
            .filter(|&i| !blocked[i] && failing.contains(&i))
            .map(task_name)
            .collect();
        let expected_skipped: Vec<String> = (0..n)
            .filter(|&i| blocked[i])
            .map(task_name)
            .collect();

        match result {
            Ok(()) => {
                prop_assert!(expected_failed.is_empty());
                prop_assert!(expected_skipped.is_empty());
            }
            Err(err) => {
                prop_assert!(!expected_failed.is_empty());
                let failed: Vec<String> = err.failed_targets().map(str::to_string).collect();
                let skipped: Vec<String> = err.skipped_targets().map(str::to_string).collect();
                prop_assert_eq!(failed, expected_failed);
                prop_assert_eq!(skipped, expected_skipped);
            }
        }
    }
}
