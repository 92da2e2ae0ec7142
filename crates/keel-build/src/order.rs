//! Build order computation
//!
//! Depth-first traversal of project references starting at each root in the
//! order given. A project is appended once all of its references are, so the
//! resulting order is topological. References that would close a cycle are
//! reported and pruned; they never become dependency edges.

use crate::graph::ProjectGraph;
use keel_config::{Diagnostic, ProjectId};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// "Referenced by" edge: `downstream` waits for `upstream`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub upstream: ProjectId,
    pub downstream: ProjectId,
}

/// A reference cycle, first project repeated at the end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub path: Vec<ProjectId>,
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.path.iter().map(|id| format!("\"{}\"", id)).collect();
        write!(f, "{}", rendered.join(" -> "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Completed,
}

/// Topological project order plus the edges that survived cycle analysis
#[derive(Debug, Clone, Default)]
pub struct BuildOrder {
    order: Vec<ProjectId>,
    upstream: HashMap<ProjectId, Vec<ProjectId>>,
    downstream: HashMap<ProjectId, Vec<ProjectId>>,
    cycles: Vec<Cycle>,
    diagnostics: Vec<Diagnostic>,
}

impl BuildOrder {
    pub fn compute(graph: &ProjectGraph) -> Self {
        let mut walker = Walker {
            graph,
            states: HashMap::new(),
            stack: Vec::new(),
            result: BuildOrder::default(),
        };
        for root in graph.roots() {
            if walker.state(root) == VisitState::Unvisited {
                walker.visit(root);
            }
        }

        let result = walker.result;
        debug!(
            projects = result.order.len(),
            cycles = result.cycles.len(),
            "computed build order"
        );
        result
    }

    /// Projects in build order
    pub fn order(&self) -> &[ProjectId] {
        &self.order
    }

    /// Projects `id` waits for, in reference order
    pub fn upstream(&self, id: &ProjectId) -> &[ProjectId] {
        self.upstream.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Projects waiting for `id`
    pub fn downstream(&self, id: &ProjectId) -> &[ProjectId] {
        self.downstream.get(id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.order.iter().flat_map(move |downstream| {
            self.upstream(downstream).iter().map(move |upstream| Edge {
                upstream: upstream.clone(),
                downstream: downstream.clone(),
            })
        })
    }

    /// Unexpected cycles found while ordering
    pub fn cycles(&self) -> &[Cycle] {
        &self.cycles
    }

    /// One error diagnostic per unexpected cycle
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn position(&self, id: &ProjectId) -> Option<usize> {
        self.order.iter().position(|p| p == id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

struct Walker<'g> {
    graph: &'g ProjectGraph,
    states: HashMap<ProjectId, VisitState>,
    stack: Vec<ProjectId>,
    result: BuildOrder,
}

impl Walker<'_> {
    fn state(&self, id: &ProjectId) -> VisitState {
        self.states
            .get(id)
            .copied()
            .unwrap_or(VisitState::Unvisited)
    }

    fn visit(&mut self, id: &ProjectId) {
        self.states.insert(id.clone(), VisitState::InProgress);
        self.stack.push(id.clone());

        let references = self
            .graph
            .get(id)
            .map(|unit| unit.references().to_vec())
            .unwrap_or_default();
        for reference in references {
            match self.state(&reference.id) {
                VisitState::InProgress => {
                    if !reference.circular {
                        self.report_cycle(&reference.id);
                    }
                }
                VisitState::Completed => self.add_edge(&reference.id, id),
                VisitState::Unvisited => {
                    self.visit(&reference.id);
                    self.add_edge(&reference.id, id);
                }
            }
        }

        self.stack.pop();
        self.states.insert(id.clone(), VisitState::Completed);
        self.result.order.push(id.clone());
    }

    fn add_edge(&mut self, upstream: &ProjectId, downstream: &ProjectId) {
        let ups = self.result.upstream.entry(downstream.clone()).or_default();
        if ups.contains(upstream) {
            return;
        }
        ups.push(upstream.clone());
        self.result
            .downstream
            .entry(upstream.clone())
            .or_default()
            .push(downstream.clone());
    }

    fn report_cycle(&mut self, back_to: &ProjectId) {
        let start = self
            .stack
            .iter()
            .position(|p| p == back_to)
            .unwrap_or(0);
        let mut path = self.stack[start..].to_vec();
        path.push(back_to.clone());
        let cycle = Cycle { path };

        debug!(cycle = %cycle, "reference cycle detected");
        self.result.diagnostics.push(Diagnostic::error(format!(
            "Project references may not form a circular graph. Cycle detected: {}",
            cycle
        )));
        self.result.cycles.push(cycle);
    }
}
