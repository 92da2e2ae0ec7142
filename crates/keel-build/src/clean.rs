//! Clean executor
//!
//! Deletes the declared outputs and the build info of every project. A path
//! that is also one of the project's inputs is never deleted.

use crate::context::BuildContext;
use crate::error::BuildError;
use crate::graph::{BuildUnit, ProjectGraph};
use crate::options::ExecutionMode;
use crate::order::BuildOrder;
use crate::reporter::TaskReport;
use crate::summary::{ExitStatus, ProjectAction, ProjectStats};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::iter;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of cleaning one project
#[derive(Debug)]
pub struct CleanReport {
    pub report: TaskReport,
    /// Existing files a dry run would delete
    pub pending_deletion: Vec<PathBuf>,
}

/// Clean every project in `order`, returning reports in build order
pub fn clean_all(
    ctx: &BuildContext<'_>,
    graph: &ProjectGraph,
    order: &BuildOrder,
) -> Vec<CleanReport> {
    let units: Vec<&BuildUnit> = order
        .order()
        .iter()
        .filter_map(|id| graph.get(id))
        .collect();

    match ctx.options.mode() {
        ExecutionMode::Parallel => units
            .par_iter()
            .map(|unit| clean_project(ctx, unit))
            .collect(),
        ExecutionMode::SingleThreaded => units
            .iter()
            .map(|unit| clean_project(ctx, unit))
            .collect(),
    }
}

pub fn clean_project(ctx: &BuildContext<'_>, unit: &BuildUnit) -> CleanReport {
    let started = Instant::now();
    let mut report = TaskReport::new(unit.id.clone());
    let mut pending_deletion = Vec::new();

    let action = match unit.project() {
        None => {
            report.extend(unit.diagnostics().iter().cloned());
            report.raise(ExitStatus::InvalidProjectOutputsSkipped);
            ProjectAction::Skipped
        }
        Some(project) => {
            let targets = project
                .output_files()
                .into_iter()
                .chain(iter::once(project.build_info_path()));
            for path in targets {
                if project.is_input(&path) {
                    debug!(path = %path.display(), "not deleting input");
                    continue;
                }

                if ctx.options.dry_run {
                    if ctx.files.exists(&path) {
                        pending_deletion.push(path);
                    }
                    continue;
                }

                match fs::remove_file(&path) {
                    Ok(()) => {
                        info!(project = %unit.id, path = %path.display(), "deleted");
                        ctx.files.invalidate(&path);
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => {
                        let error = BuildError::io(&path, e);
                        warn!(project = %unit.id, %error, "failed to delete");
                        report.error(error.to_string());
                        report.raise(ExitStatus::DiagnosticsPresentOutputsSkipped);
                    }
                }
            }
            ProjectAction::Cleaned
        }
    };

    report.stats = Some(ProjectStats {
        project: unit.id.clone(),
        status: None,
        action,
        errors: report.error_count(),
        elapsed: started.elapsed(),
    });
    CleanReport {
        report,
        pending_deletion,
    }
}
