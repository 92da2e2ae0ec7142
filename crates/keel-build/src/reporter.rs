//! Task reporter chain
//!
//! Project tasks finish in any order, but their output must appear in build
//! order. Each task buffers into its own [`TaskReport`]; to flush it waits for
//! the [`Baton`] from the task before it, which owns the output stream and the
//! running summary, then hands the baton on. Only the holder of the baton
//! writes, so the stream needs no lock.

use crate::summary::{BuildSummary, ExitStatus, ProjectStats};
use keel_config::{Diagnostic, ProjectId};
use std::io::Write;
use tokio::sync::oneshot;
use tracing::warn;

/// Buffered output of one project task
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub project: ProjectId,
    pub diagnostics: Vec<Diagnostic>,
    pub exit_status: ExitStatus,
    pub stats: Option<ProjectStats>,
}

impl TaskReport {
    pub fn new(project: ProjectId) -> Self {
        Self {
            project,
            diagnostics: Vec::new(),
            exit_status: ExitStatus::Success,
            stats: None,
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// Informational line, printed as is
    pub fn message(&mut self, text: impl Into<String>) {
        self.push(Diagnostic::message(text));
    }

    /// Attributed error
    pub fn error(&mut self, text: impl Into<String>) {
        let diagnostic = Diagnostic::error(text).with_project(self.project.clone());
        self.push(diagnostic);
    }

    pub fn raise(&mut self, status: ExitStatus) {
        self.exit_status.raise(status);
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }
}

/// Output stream plus everything aggregated so far
pub struct Baton<'w> {
    out: &'w mut (dyn Write + Send),
    pub summary: BuildSummary,
}

impl<'w> Baton<'w> {
    pub fn new(out: &'w mut (dyn Write + Send)) -> Self {
        Self {
            out,
            summary: BuildSummary::default(),
        }
    }

    /// Print diagnostics that belong to no task
    pub fn write_all(&mut self, diagnostics: &[Diagnostic]) {
        for diagnostic in diagnostics {
            if let Err(error) = writeln!(self.out, "{}", diagnostic) {
                warn!(%error, "failed to write diagnostic");
            }
        }
    }

    /// Flush a task report and fold it into the summary
    pub fn absorb(&mut self, report: TaskReport) {
        self.write_all(&report.diagnostics);
        self.summary.exit_status.raise(report.exit_status);
        if let Some(stats) = report.stats {
            self.summary.projects.push(stats);
        }
    }

    pub fn flush(&mut self) {
        if let Err(error) = self.out.flush() {
            warn!(%error, "failed to flush output");
        }
    }
}

/// A task's place in the chain: wait on `previous`, pass on to `next`
pub struct ReportLink<'w> {
    previous: oneshot::Receiver<Baton<'w>>,
    next: oneshot::Sender<Baton<'w>>,
}

impl ReportLink<'_> {
    /// Wait for the preceding task, then flush `report`.
    ///
    /// If a preceding link was dropped without finishing the report is lost
    /// and the chain stays broken.
    pub fn finish(self, report: TaskReport) {
        let Ok(mut baton) = self.previous.blocking_recv() else {
            warn!(project = %report.project, "report chain broken");
            return;
        };
        baton.absorb(report);
        // The orchestrator only drops its end after the last link finished
        let _ = self.next.send(baton);
    }
}

/// Links for `len` tasks in order.
///
/// The orchestrator seeds the first sender with a [`Baton`] and receives it
/// back from the returned receiver once every link has finished.
pub fn chain<'w>(
    len: usize,
) -> (
    oneshot::Sender<Baton<'w>>,
    Vec<ReportLink<'w>>,
    oneshot::Receiver<Baton<'w>>,
) {
    let (first, mut previous) = oneshot::channel();
    let mut links = Vec::with_capacity(len);
    for _ in 0..len {
        let (next, following) = oneshot::channel();
        links.push(ReportLink { previous, next });
        previous = following;
    }
    (first, links, previous)
}
