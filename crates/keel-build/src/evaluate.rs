//! Up-to-date evaluation
//!
//! Decides, from the file system, the persisted build info and the final
//! statuses of upstream projects, whether a project must be rebuilt. Rules are
//! checked in a fixed order and the first one that applies wins. "Newer" is
//! always strict; a missing file has [`MISSING_FILE_TIME`].

use crate::build_info::VERSION;
use crate::context::BuildContext;
use crate::fs_state::{hash_file, MISSING_FILE_TIME};
use crate::graph::BuildUnit;
use crate::status::{FileStamp, UpToDateStatus};
use std::iter;
use std::path::PathBuf;
use tracing::debug;

/// Final status of one upstream project, as read from its slot
#[derive(Debug, Clone)]
pub struct UpstreamStatus {
    pub unit: BuildUnit,
    pub status: UpToDateStatus,
}

/// Compute the up-to-date status of `unit`
pub fn evaluate(
    ctx: &BuildContext<'_>,
    unit: &BuildUnit,
    upstreams: &[UpstreamStatus],
) -> UpToDateStatus {
    let status = evaluate_rules(ctx, unit, upstreams);
    debug!(project = %unit.id, status = status.kind(), "evaluated");
    status
}

fn evaluate_rules(
    ctx: &BuildContext<'_>,
    unit: &BuildUnit,
    upstreams: &[UpstreamStatus],
) -> UpToDateStatus {
    let Some(project) = unit.project() else {
        return UpToDateStatus::ConfigNotFound;
    };
    if project.is_solution() {
        return UpToDateStatus::Solution;
    }

    if ctx.options.stop_build_on_errors {
        if let Some(failed) = upstreams.iter().find(|up| up.status.is_error()) {
            return UpToDateStatus::UpstreamErrors {
                upstream: failed.unit.id.clone(),
                upstream_blocked: matches!(failed.status, UpToDateStatus::UpstreamErrors { .. }),
            };
        }
    }

    if ctx.options.force {
        return UpToDateStatus::ForceBuild;
    }

    let options = &project.options;
    let build_info_path = project.build_info_path();
    let Some(info) = ctx.build_info(&build_info_path) else {
        return UpToDateStatus::OutputMissing {
            path: build_info_path,
        };
    };

    if info.version != VERSION {
        return UpToDateStatus::VersionMismatch {
            recorded_version: info.version.clone(),
        };
    }

    if info.errors || ((info.semantic_errors || info.check_pending) && !options.no_check) {
        return UpToDateStatus::OutOfDateBuildInfoWithErrors {
            build_info: build_info_path,
        };
    }

    if options.incremental {
        if info.file_versions.is_none() {
            return UpToDateStatus::OutOfDateOptions {
                build_info: build_info_path,
            };
        }
        if !info.pending_emit.is_empty() && !options.no_emit {
            return UpToDateStatus::OutOfDateBuildInfoPendingEmit {
                build_info: build_info_path,
            };
        }
        if options.declaration && !info.declarations_emitted && !options.no_emit {
            return UpToDateStatus::OutOfDateOptions {
                build_info: build_info_path,
            };
        }
    }

    // The build info may have been cached earlier and deleted since
    let build_info_time = ctx.files.modified(&build_info_path);
    if build_info_time == MISSING_FILE_TIME {
        return UpToDateStatus::OutputMissing {
            path: build_info_path,
        };
    }

    let mut newest_input: Option<FileStamp> = None;
    let mut unchanged_text = false;
    for input in &project.files {
        let time = ctx.files.modified(input);
        if time == MISSING_FILE_TIME {
            return UpToDateStatus::InputMissing {
                path: input.clone(),
            };
        }

        if time > build_info_time {
            let same_text = info.file_version(input).is_some_and(|recorded| {
                hash_file(input).map(|hash| hash == recorded).unwrap_or(false)
            });
            if !same_text {
                return UpToDateStatus::InputNewerThanOutput {
                    input: input.clone(),
                    output: build_info_path,
                };
            }
            unchanged_text = true;
        }

        if newest_input.as_ref().map_or(true, |newest| time > newest.time) {
            newest_input = Some(FileStamp::new(input, time));
        }
    }

    if let Some(root) = info.root.iter().find(|root| !project.is_input(root)) {
        return UpToDateStatus::OutOfDateRoots {
            root_file: root.clone(),
            build_info: build_info_path,
        };
    }
    if let Some(input) = project.files.iter().find(|input| !info.has_root(input)) {
        return UpToDateStatus::OutOfDateRoots {
            root_file: input.clone(),
            build_info: build_info_path,
        };
    }

    let mut oldest_output = FileStamp::new(&build_info_path, build_info_time);
    if !options.incremental {
        for output in project.output_files() {
            let time = ctx.files.modified(&output);
            if time == MISSING_FILE_TIME {
                return UpToDateStatus::OutputMissing { path: output };
            }
            if let Some(newest) = &newest_input {
                if newest.time > time {
                    return UpToDateStatus::InputNewerThanOutput {
                        input: newest.path.clone(),
                        output,
                    };
                }
            }
            if time < oldest_output.time {
                oldest_output = FileStamp::new(output, time);
            }
        }
    }

    let mut types_only = false;
    for upstream in upstreams {
        if matches!(
            upstream.status,
            UpToDateStatus::Solution | UpToDateStatus::ConfigNotFound
        ) {
            continue;
        }
        if let Some(time) = upstream.status.newest_input_time() {
            if time <= oldest_output.time {
                continue;
            }
        }
        let Some(upstream_project) = upstream.unit.project() else {
            continue;
        };

        let upstream_build_info = upstream_project.build_info_path();
        if upstream_build_info == build_info_path {
            return UpToDateStatus::InputNewerThanOutput {
                input: upstream_build_info,
                output: build_info_path,
            };
        }

        let declarations_time = ctx
            .build_info(&upstream_build_info)
            .and_then(|info| info.latest_changed_declaration());
        if declarations_time.is_some_and(|time| time <= oldest_output.time) {
            types_only = true;
            continue;
        }

        return UpToDateStatus::InputNewerThanOutput {
            input: upstream.unit.id.path().to_path_buf(),
            output: oldest_output.path,
        };
    }

    let configs = iter::once(project.id.path().to_path_buf())
        .chain(project.extended_configs.iter().cloned());
    for config in configs {
        if ctx.files.modified(&config) > oldest_output.time {
            return UpToDateStatus::InputNewerThanOutput {
                input: config,
                output: oldest_output.path,
            };
        }
    }

    if types_only {
        UpToDateStatus::UpToDateWithUpstreamTypesOnly
    } else if unchanged_text {
        UpToDateStatus::UpToDateWithUnchangedInputText
    } else {
        UpToDateStatus::UpToDate {
            newest_input,
            oldest_output: Some(oldest_output),
            build_info: build_info_path,
        }
    }
}

/// Files whose timestamps a pseudo-build refreshes: existing outputs and the build info
pub fn timestamp_targets(ctx: &BuildContext<'_>, unit: &BuildUnit) -> Vec<PathBuf> {
    let Some(project) = unit.project() else {
        return Vec::new();
    };
    project
        .output_files()
        .into_iter()
        .chain(iter::once(project.build_info_path()))
        .filter(|path| !project.is_input(path) && ctx.files.exists(path))
        .collect()
}
