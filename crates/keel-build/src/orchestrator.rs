//! Orchestrator
//!
//! Entry point tying the pieces together: resolve the project graph, compute
//! the build order once, then build or clean on demand.

use crate::build_info::{BuildInfoStore, JsonBuildInfoStore};
use crate::clean::clean_all;
use crate::compiler::{Compiler, PassthroughCompiler};
use crate::context::BuildContext;
use crate::executor::{run_tasks, ProjectTask};
use crate::graph::ProjectGraph;
use crate::options::BuildOptions;
use crate::order::BuildOrder;
use crate::reporter::{self, Baton};
use crate::slot::SlotWiring;
use crate::summary::{BuildSummary, ExitStatus};
use keel_config::{ConfigResolver, Diagnostic, ProjectId, TomlConfigResolver};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Builds or cleans a set of root projects and everything they reference
pub struct Orchestrator {
    resolver: Arc<dyn ConfigResolver>,
    compiler: Arc<dyn Compiler>,
    store: Arc<dyn BuildInfoStore>,
    options: BuildOptions,
    graph: ProjectGraph,
    order: BuildOrder,
}

impl Orchestrator {
    /// Resolve `roots` and compute the build order
    pub fn new(
        resolver: Arc<dyn ConfigResolver>,
        compiler: Arc<dyn Compiler>,
        store: Arc<dyn BuildInfoStore>,
        roots: Vec<ProjectId>,
        options: BuildOptions,
    ) -> Self {
        let graph = ProjectGraph::resolve(resolver.as_ref(), &roots, options.mode());
        let order = BuildOrder::compute(&graph);
        info!(
            roots = roots.len(),
            projects = order.len(),
            cycles = order.cycles().len(),
            "project graph ready"
        );

        Self {
            resolver,
            compiler,
            store,
            options,
            graph,
            order,
        }
    }

    /// On-disk `keel.toml` configs, the passthrough compiler and JSON build info
    pub fn with_defaults(roots: Vec<ProjectId>, options: BuildOptions) -> Self {
        Self::new(
            Arc::new(TomlConfigResolver::new()),
            Arc::new(PassthroughCompiler),
            Arc::new(JsonBuildInfoStore),
            roots,
            options,
        )
    }

    /// Replace the options used by later invocations
    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn graph(&self) -> &ProjectGraph {
        &self.graph
    }

    /// Projects in build order
    pub fn order(&self) -> &[ProjectId] {
        self.order.order()
    }

    pub fn upstream(&self, id: &ProjectId) -> &[ProjectId] {
        self.order.upstream(id)
    }

    pub fn downstream(&self, id: &ProjectId) -> &[ProjectId] {
        self.order.downstream(id)
    }

    pub fn build(&self) -> BuildSummary {
        self.build_or_clean(true)
    }

    pub fn clean(&self) -> BuildSummary {
        self.build_or_clean(false)
    }

    /// Build (`true`) or clean (`false`), reporting to stdout
    pub fn build_or_clean(&self, build: bool) -> BuildSummary {
        let mut stdout = io::stdout();
        self.build_or_clean_to(build, &mut stdout)
    }

    /// Build or clean, reporting to `out`
    pub fn build_or_clean_to(&self, build: bool, out: &mut (dyn Write + Send)) -> BuildSummary {
        let started = Instant::now();
        let ctx = BuildContext::new(&self.options, self.compiler.as_ref(), self.store.as_ref());
        let mut baton = Baton::new(out);

        if !self.order.diagnostics().is_empty() {
            baton.write_all(self.order.diagnostics());
            baton
                .summary
                .exit_status
                .raise(ExitStatus::ProjectReferenceCycleOutputsSkipped);
        }
        if self.options.verbose {
            baton.write_all(&[self.projects_message()]);
        }

        let mut summary = if build {
            self.run_build(&ctx, baton)
        } else {
            self.run_clean(&ctx, baton)
        };

        if summary.projects.len() != self.order.len() {
            summary
                .exit_status
                .raise(ExitStatus::DiagnosticsPresentOutputsSkipped);
        }
        info!(
            build,
            projects = summary.projects.len(),
            exit = summary.exit_status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "finished"
        );
        summary
    }

    fn run_build(&self, ctx: &BuildContext<'_>, baton: Baton<'_>) -> BuildSummary {
        let units: Vec<_> = self
            .order
            .order()
            .iter()
            .filter_map(|id| self.graph.get(id))
            .collect();
        let mut wiring = SlotWiring::for_order(&self.order);
        let (first, links, last) = reporter::chain(units.len());

        let tasks: Vec<ProjectTask<'_>> = units
            .into_iter()
            .zip(links)
            .map(|(unit, link)| ProjectTask {
                unit: unit.clone(),
                upstream: wiring.take_receivers(&unit.id),
                downstream: wiring.take_senders(&unit.id),
                link,
            })
            .collect();

        // `last` is alive, so the first link always accepts the baton
        let _ = first.send(baton);
        run_tasks(ctx, &self.graph, tasks);

        match last.blocking_recv() {
            Ok(mut baton) => {
                baton.flush();
                baton.summary
            }
            Err(_) => {
                error!("report chain broken; summary lost");
                BuildSummary {
                    exit_status: ExitStatus::DiagnosticsPresentOutputsSkipped,
                    ..BuildSummary::default()
                }
            }
        }
    }

    fn run_clean(&self, ctx: &BuildContext<'_>, mut baton: Baton<'_>) -> BuildSummary {
        for cleaned in clean_all(ctx, &self.graph, &self.order) {
            baton
                .summary
                .files_pending_deletion
                .extend(cleaned.pending_deletion);
            baton.absorb(cleaned.report);
        }

        if self.options.dry_run && !baton.summary.files_pending_deletion.is_empty() {
            let mut text = String::from("A non-dry build would delete the following files:");
            for path in &baton.summary.files_pending_deletion {
                text.push_str(&format!("\n * {}", path.display()));
            }
            baton.write_all(&[Diagnostic::message(text)]);
        }

        baton.flush();
        baton.summary
    }

    fn projects_message(&self) -> Diagnostic {
        let mut text = String::from("Projects in this build:");
        for id in self.order.order() {
            text.push_str(&format!("\n    * {}", id));
        }
        Diagnostic::message(text)
    }
}
