//! Build executor
//!
//! One task per project. A task waits for the final status of every upstream
//! project, evaluates its own status, acts on it, hands its final status to
//! every downstream project and finally flushes its report through the
//! reporter chain.

use crate::build_info::{to_millis, BuildInfo};
use crate::context::BuildContext;
use crate::evaluate::{evaluate, timestamp_targets, UpstreamStatus};
use crate::graph::{BuildUnit, ProjectGraph};
use crate::options::ExecutionMode;
use crate::reporter::{ReportLink, TaskReport};
use crate::slot::{StatusReceiver, StatusSender};
use crate::status::UpToDateStatus;
use crate::summary::{ExitStatus, ProjectAction, ProjectStats};
use keel_config::{Diagnostic, ParsedProject, Resolution};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Instant, SystemTime};
use tracing::{debug, info, warn};

/// Work item for one project
pub struct ProjectTask<'w> {
    pub unit: BuildUnit,
    /// Slots filled by upstream projects
    pub upstream: Vec<StatusReceiver>,
    /// Slots this project fills, one per downstream project
    pub downstream: Vec<StatusSender>,
    pub link: ReportLink<'w>,
}

/// What a task did, before statistics are attached
struct Outcome {
    evaluated: UpToDateStatus,
    final_status: UpToDateStatus,
    action: ProjectAction,
}

impl ProjectTask<'_> {
    pub fn run(self, ctx: &BuildContext<'_>, graph: &ProjectGraph) {
        let started = Instant::now();
        let upstreams: Vec<UpstreamStatus> = self
            .upstream
            .into_iter()
            .map(|slot| read_slot(slot, graph))
            .collect();

        let mut report = TaskReport::new(self.unit.id.clone());
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            build_project(ctx, &self.unit, &upstreams, &mut report)
        }))
        .unwrap_or_else(|payload| {
            let reason = format!("internal error: {}", panic_message(payload.as_ref()));
            warn!(project = %self.unit.id, %reason, "project task panicked");
            report.error(reason.clone());
            report.raise(ExitStatus::DiagnosticsPresentOutputsSkipped);
            let status = UpToDateStatus::BuildErrors { reason };
            Outcome {
                evaluated: status.clone(),
                final_status: status,
                action: ProjectAction::Skipped,
            }
        });

        for slot in self.downstream {
            slot.fill(outcome.final_status.clone());
        }

        report.stats = Some(ProjectStats {
            project: self.unit.id.clone(),
            status: Some(outcome.evaluated),
            action: outcome.action,
            errors: report.error_count(),
            elapsed: started.elapsed(),
        });
        self.link.finish(report);
    }
}

/// Run every task, concurrently unless single-threaded.
///
/// Tasks must be in build order: single-threaded execution relies on every
/// upstream slot being filled before its consumer runs.
pub fn run_tasks(ctx: &BuildContext<'_>, graph: &ProjectGraph, tasks: Vec<ProjectTask<'_>>) {
    match ctx.options.mode() {
        ExecutionMode::SingleThreaded => {
            for task in tasks {
                task.run(ctx, graph);
            }
        }
        // One OS thread per project, unbounded
        ExecutionMode::Parallel => thread::scope(|scope| {
            for task in tasks {
                scope.spawn(move || task.run(ctx, graph));
            }
        }),
    }
}

fn read_slot(slot: StatusReceiver, graph: &ProjectGraph) -> UpstreamStatus {
    let id = slot.upstream().clone();
    let status = slot.wait().unwrap_or_else(|| UpToDateStatus::BuildErrors {
        reason: format!("project '{}' did not report a status", id),
    });
    let unit = graph
        .get(&id)
        .cloned()
        .unwrap_or_else(|| BuildUnit::new(id, Arc::new(Resolution::default())));
    UpstreamStatus { unit, status }
}

fn build_project(
    ctx: &BuildContext<'_>,
    unit: &BuildUnit,
    upstreams: &[UpstreamStatus],
    report: &mut TaskReport,
) -> Outcome {
    let status = evaluate(ctx, unit, upstreams);
    let verbose = ctx.options.verbose;
    if verbose {
        report.message(status.describe(&unit.id));
    }

    let skip = |action| Outcome {
        evaluated: status.clone(),
        final_status: status.clone(),
        action,
    };

    let project = match (unit.project(), &status) {
        (None, _) | (_, UpToDateStatus::ConfigNotFound) => {
            report.extend(unit.diagnostics().iter().cloned());
            report.raise(ExitStatus::InvalidProjectOutputsSkipped);
            return skip(ProjectAction::Skipped);
        }
        (Some(project), _) => project,
    };

    match &status {
        UpToDateStatus::UpToDate { .. } | UpToDateStatus::Solution => skip(ProjectAction::UpToDate),
        UpToDateStatus::ConfigNotFound
        | UpToDateStatus::UpstreamErrors { .. }
        | UpToDateStatus::BuildErrors { .. } => {
            report.raise(ExitStatus::DiagnosticsPresentOutputsSkipped);
            skip(ProjectAction::Skipped)
        }
        UpToDateStatus::UpToDateWithUpstreamTypesOnly
        | UpToDateStatus::UpToDateWithUnchangedInputText => {
            if ctx.options.dry_run {
                report.message(format!(
                    "A non-dry build would update timestamps for output of project '{}'",
                    unit.id
                ));
                return skip(ProjectAction::WouldUpdateTimestamps);
            }
            Outcome {
                evaluated: status.clone(),
                final_status: update_timestamps(ctx, unit, project, report),
                action: ProjectAction::PseudoBuilt,
            }
        }
        UpToDateStatus::ForceBuild
        | UpToDateStatus::OutputMissing { .. }
        | UpToDateStatus::InputMissing { .. }
        | UpToDateStatus::InputNewerThanOutput { .. }
        | UpToDateStatus::OutOfDateBuildInfoWithErrors { .. }
        | UpToDateStatus::OutOfDateBuildInfoPendingEmit { .. }
        | UpToDateStatus::OutOfDateOptions { .. }
        | UpToDateStatus::OutOfDateRoots { .. }
        | UpToDateStatus::VersionMismatch { .. } => {
            if ctx.options.dry_run {
                report.message(format!(
                    "A non-dry build would build project '{}'",
                    unit.id
                ));
                return skip(ProjectAction::WouldBuild);
            }
            Outcome {
                evaluated: status.clone(),
                final_status: build(ctx, project, report),
                action: ProjectAction::Built,
            }
        }
    }
}

/// Refresh output timestamps instead of rebuilding
fn update_timestamps(
    ctx: &BuildContext<'_>,
    unit: &BuildUnit,
    project: &ParsedProject,
    report: &mut TaskReport,
) -> UpToDateStatus {
    info!(project = %unit.id, "updating output timestamps");
    if ctx.options.verbose {
        report.message(format!(
            "Updating output timestamps of project '{}'...",
            unit.id
        ));
    }

    let now = SystemTime::now();
    for path in timestamp_targets(ctx, unit) {
        if let Err(error) = ctx.files.touch(&path, now) {
            warn!(project = %unit.id, %error, "failed to update timestamp");
            report.push(Diagnostic::warning(error.to_string()).with_project(unit.id.clone()));
        }
    }

    UpToDateStatus::UpToDate {
        newest_input: None,
        oldest_output: None,
        build_info: project.build_info_path(),
    }
}

/// Real build: check, emit, record build info
fn build(
    ctx: &BuildContext<'_>,
    project: &Arc<ParsedProject>,
    report: &mut TaskReport,
) -> UpToDateStatus {
    info!(project = %project.id, "building project");
    if ctx.options.verbose {
        report.message(format!("Building project '{}'...", project.id));
    }

    let options = &project.options;
    let build_info_path = project.build_info_path();
    let prior = ctx.build_info(&build_info_path);

    let program = match ctx.compiler.build_program(project, prior.as_deref()) {
        Ok(program) => program,
        Err(error) => {
            report.error(error.to_string());
            report.raise(ExitStatus::DiagnosticsPresentOutputsSkipped);
            return UpToDateStatus::BuildErrors {
                reason: error.to_string(),
            };
        }
    };

    let semantic_errors = if options.no_check {
        false
    } else {
        let diagnostics = ctx.compiler.collect_diagnostics(&program);
        let errors = diagnostics.iter().any(Diagnostic::is_error);
        report.extend(diagnostics);
        errors
    };

    let mut emitted = Vec::new();
    let mut emit_errors = false;
    let mut declarations_changed = false;
    if !options.no_emit {
        match ctx.compiler.emit(&program) {
            Ok(output) => {
                emit_errors = output.diagnostics.iter().any(Diagnostic::is_error);
                report.extend(output.diagnostics);
                declarations_changed = output.declarations_changed;
                emitted = output.emitted_files;
            }
            Err(error) => {
                report.error(error.to_string());
                emit_errors = true;
            }
        }
    }
    for path in &emitted {
        ctx.files.invalidate(path);
    }

    let now = SystemTime::now();
    let mut write_failed = false;
    if !options.no_emit {
        for output in project.output_files() {
            if emitted.contains(&output) || project.is_input(&output) || !ctx.files.exists(&output)
            {
                continue;
            }
            if let Err(error) = ctx.files.touch(&output, now) {
                warn!(project = %project.id, %error, "failed to update timestamp");
                report.error(error.to_string());
                write_failed = true;
            }
        }
    }

    let mut info = BuildInfo::new(options.incremental);
    info.errors = emit_errors;
    info.semantic_errors = semantic_errors;
    info.check_pending = options.no_check;
    if options.incremental {
        info.file_versions = Some(
            program
                .sources
                .iter()
                .map(|source| (source.path.clone(), source.version.clone()))
                .collect(),
        );
        if options.no_emit {
            info.pending_emit = project.files.clone();
        }
    }
    info.root = project.files.clone();
    info.declarations_emitted = options.declaration && !options.no_emit && !emit_errors;
    info.latest_changed_declaration_time = if !info.declarations_emitted {
        None
    } else if declarations_changed {
        Some(to_millis(now))
    } else {
        prior
            .as_ref()
            .and_then(|prior| prior.latest_changed_declaration_time)
            .or(Some(to_millis(now)))
    };

    match ctx.store.write(&build_info_path, &info) {
        Ok(()) => {
            ctx.files.invalidate(&build_info_path);
            ctx.build_infos.replace(&build_info_path, info);
        }
        Err(error) => {
            warn!(project = %project.id, %error, "failed to write build info");
            report.error(error.to_string());
            write_failed = true;
        }
    }

    if semantic_errors || emit_errors || write_failed {
        let errors = report.error_count();
        debug!(project = %project.id, errors, "build finished with errors");
        report.raise(if emitted.is_empty() {
            ExitStatus::DiagnosticsPresentOutputsSkipped
        } else {
            ExitStatus::DiagnosticsPresentOutputsGenerated
        });
        return UpToDateStatus::BuildErrors {
            reason: format!("{} error{}", errors, if errors == 1 { "" } else { "s" }),
        };
    }

    UpToDateStatus::UpToDate {
        newest_input: None,
        oldest_output: None,
        build_info: build_info_path,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message() {
        let payload = panic::catch_unwind(|| {
            panic!("boom");
        })
        .unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom");

        let payload = panic::catch_unwind(|| {
            panic!("code {}", 7);
        })
        .unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "code 7");
    }
}
