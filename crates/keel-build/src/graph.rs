//! Project graph
//!
//! Resolves the root projects and everything they transitively reference into
//! one [`BuildUnit`] per distinct [`ProjectId`]. Missing or invalid configs do
//! not stop resolution; they become units without a project.

use crate::options::ExecutionMode;
use keel_config::{ConfigResolver, Diagnostic, ParsedProject, ProjectId, ProjectReference, Resolution};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// One project taking part in an invocation
#[derive(Debug, Clone)]
pub struct BuildUnit {
    pub id: ProjectId,
    pub resolution: Arc<Resolution>,
}

impl BuildUnit {
    pub fn new(id: ProjectId, resolution: Arc<Resolution>) -> Self {
        Self { id, resolution }
    }

    /// Resolved project; `None` when its config could not be read
    pub fn project(&self) -> Option<&Arc<ParsedProject>> {
        self.resolution.project.as_ref()
    }

    /// Diagnostics produced while resolving the config
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.resolution.diagnostics
    }

    pub fn references(&self) -> &[ProjectReference] {
        self.project()
            .map(|project| project.references.as_slice())
            .unwrap_or_default()
    }
}

/// Every project reachable from the roots
#[derive(Debug, Clone, Default)]
pub struct ProjectGraph {
    roots: Vec<ProjectId>,
    units: HashMap<ProjectId, BuildUnit>,
}

impl ProjectGraph {
    /// Resolve `roots` and their transitive references.
    ///
    /// Each frontier of not-yet-seen projects is resolved as a batch, in
    /// parallel unless `mode` is single-threaded.
    pub fn resolve(
        resolver: &dyn ConfigResolver,
        roots: &[ProjectId],
        mode: ExecutionMode,
    ) -> Self {
        let mut graph = Self::default();
        let mut seen = HashSet::new();
        for root in roots {
            if seen.insert(root.clone()) {
                graph.roots.push(root.clone());
            }
        }

        let mut frontier = graph.roots.clone();
        while !frontier.is_empty() {
            debug!(projects = frontier.len(), "resolving frontier");
            let resolved: Vec<(ProjectId, Arc<Resolution>)> = match mode {
                ExecutionMode::Parallel => frontier
                    .par_iter()
                    .map(|id| (id.clone(), resolver.resolve(id)))
                    .collect(),
                ExecutionMode::SingleThreaded => frontier
                    .iter()
                    .map(|id| (id.clone(), resolver.resolve(id)))
                    .collect(),
            };

            let mut next = Vec::new();
            for (id, resolution) in resolved {
                let unit = BuildUnit::new(id.clone(), resolution);
                for reference in unit.references() {
                    if seen.insert(reference.id.clone()) {
                        next.push(reference.id.clone());
                    }
                }
                graph.units.entry(id).or_insert(unit);
            }
            frontier = next;
        }

        graph
    }

    /// Build a graph from already resolved units
    pub fn from_units(roots: Vec<ProjectId>, units: impl IntoIterator<Item = BuildUnit>) -> Self {
        let mut map = HashMap::new();
        for unit in units {
            map.entry(unit.id.clone()).or_insert(unit);
        }
        Self { roots, units: map }
    }

    /// Root projects, duplicates removed, in the order given
    pub fn roots(&self) -> &[ProjectId] {
        &self.roots
    }

    pub fn get(&self, id: &ProjectId) -> Option<&BuildUnit> {
        self.units.get(id)
    }

    pub fn units(&self) -> impl Iterator<Item = &BuildUnit> {
        self.units.values()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
