//! Build order tests
//!
//! Graph resolution and ordering over in-memory project sets

use keel_build::{BuildOrder, ExecutionMode, ProjectGraph};
use keel_config::{ConfigResolver, Diagnostic, ParsedProject, ProjectId, ProjectReference, Resolution};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

struct MapResolver {
    projects: HashMap<ProjectId, ParsedProject>,
}

impl MapResolver {
    fn new(edges: &[(&str, &[&str])]) -> Self {
        let projects = edges
            .iter()
            .map(|(name, references)| {
                let project = ParsedProject::new(id(name))
                    .with_files(["main.kl"])
                    .with_references(references.iter().map(|r| ProjectReference::new(id(r))).collect());
                (id(name), project)
            })
            .collect();
        Self { projects }
    }
}

impl ConfigResolver for MapResolver {
    fn resolve(&self, id: &ProjectId) -> Arc<Resolution> {
        match self.projects.get(id) {
            Some(project) => Arc::new(Resolution::found(project.clone())),
            None => Arc::new(Resolution::failed(vec![Diagnostic::error("not found")])),
        }
    }
}

fn id(name: &str) -> ProjectId {
    ProjectId::from_config_path(format!("/workspace/{}/keel.toml", name))
}

fn ids(names: &[&str]) -> Vec<ProjectId> {
    names.iter().map(|n| id(n)).collect()
}

fn order_of(resolver: &MapResolver, roots: &[&str], mode: ExecutionMode) -> BuildOrder {
    let graph = ProjectGraph::resolve(resolver, &ids(roots), mode);
    BuildOrder::compute(&graph)
}

fn diamond() -> MapResolver {
    MapResolver::new(&[
        ("a", &["b", "c"]),
        ("b", &["c", "d"]),
        ("c", &["d", "e"]),
        ("d", &[]),
        ("e", &[]),
        ("g", &["b"]),
    ])
}

#[test]
fn test_single_root_order() {
    let order = order_of(&diamond(), &["a"], ExecutionMode::Parallel);
    assert_eq!(order.order(), ids(&["d", "e", "c", "b", "a"]).as_slice());
    assert!(order.cycles().is_empty());
}

#[test]
fn test_second_root_appended_after_first() {
    let order = order_of(&diamond(), &["a", "g"], ExecutionMode::SingleThreaded);
    assert_eq!(order.order(), ids(&["d", "e", "c", "b", "a", "g"]).as_slice());
    // Edge to an already completed project is still recorded
    assert_eq!(order.upstream(&id("g")), ids(&["b"]).as_slice());
    assert_eq!(order.downstream(&id("b")), ids(&["a", "g"]).as_slice());
}

#[test]
fn test_order_independent_of_execution_mode() {
    let parallel = order_of(&diamond(), &["a", "g"], ExecutionMode::Parallel);
    let single = order_of(&diamond(), &["a", "g"], ExecutionMode::SingleThreaded);
    assert_eq!(parallel.order(), single.order());
}

#[test]
fn test_three_node_cycle() {
    let resolver = MapResolver::new(&[
        ("h", &["i"]),
        ("i", &["j"]),
        ("j", &["h", "e"]),
        ("e", &[]),
    ]);
    let order = order_of(&resolver, &["h"], ExecutionMode::Parallel);

    assert_eq!(order.order(), ids(&["e", "j", "i", "h"]).as_slice());
    assert_eq!(order.cycles().len(), 1);
    assert_eq!(order.diagnostics().len(), 1);
    let message = &order.diagnostics()[0].message;
    for name in ["h", "i", "j"] {
        assert!(message.contains(id(name).path().to_str().unwrap()), "{}", message);
    }
    assert!(!message.contains(id("e").path().to_str().unwrap()));
    // The back edge from j to h is pruned, j still waits for e
    assert_eq!(order.upstream(&id("j")), ids(&["e"]).as_slice());
    assert!(order.downstream(&id("j")).contains(&id("i")));
    assert!(!order.downstream(&id("h")).contains(&id("j")));
}

#[test]
fn test_missing_reference_still_ordered() {
    let resolver = MapResolver::new(&[("app", &["ghost"])]);
    let order = order_of(&resolver, &["app"], ExecutionMode::Parallel);
    assert_eq!(order.order(), ids(&["ghost", "app"]).as_slice());
}

/// Reference lists for `n` projects; `acyclic` keeps references pointing at lower indices
fn arb_graph(acyclic: bool) -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..12).prop_flat_map(move |n| {
        prop::collection::vec(prop::collection::vec(0..n, 0..4), n).prop_map(move |lists| {
            lists
                .into_iter()
                .enumerate()
                .map(|(index, refs)| {
                    refs.into_iter()
                        .filter(|&r| r != index && (!acyclic || r < index))
                        .collect()
                })
                .collect()
        })
    })
}

fn resolver_for(lists: &[Vec<usize>]) -> (MapResolver, Vec<ProjectId>) {
    let names: Vec<String> = (0..lists.len()).map(|i| format!("p{}", i)).collect();
    let projects = lists
        .iter()
        .enumerate()
        .map(|(index, refs)| {
            let project = ParsedProject::new(id(&names[index]))
                .with_files(["main.kl"])
                .with_references(refs.iter().map(|&r| ProjectReference::new(id(&names[r]))).collect());
            (id(&names[index]), project)
        })
        .collect();
    let roots = names.iter().map(|n| id(n)).collect();
    (MapResolver { projects }, roots)
}

proptest! {
    #[test]
    fn prop_acyclic_order_is_topological(lists in arb_graph(true)) {
        let (resolver, roots) = resolver_for(&lists);
        let graph = ProjectGraph::resolve(&resolver, &roots, ExecutionMode::Parallel);
        let order = BuildOrder::compute(&graph);

        prop_assert!(order.cycles().is_empty());
        prop_assert_eq!(order.len(), lists.len());
        for (index, refs) in lists.iter().enumerate() {
            let downstream = order.position(&roots[index]).unwrap();
            for &r in refs {
                prop_assert!(order.position(&roots[r]).unwrap() < downstream);
            }
        }
    }

    #[test]
    fn prop_every_project_once_and_upstream_first(lists in arb_graph(false)) {
        let (resolver, roots) = resolver_for(&lists);
        let graph = ProjectGraph::resolve(&resolver, &roots, ExecutionMode::SingleThreaded);
        let order = BuildOrder::compute(&graph);

        let unique: HashSet<_> = order.order().iter().collect();
        prop_assert_eq!(unique.len(), order.len());
        prop_assert_eq!(order.len(), lists.len());
        prop_assert_eq!(order.diagnostics().len(), order.cycles().len());
        for project in order.order() {
            let position = order.position(project).unwrap();
            for upstream in order.upstream(project) {
                prop_assert!(order.position(upstream).unwrap() < position);
            }
        }
    }
}
