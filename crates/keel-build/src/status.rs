//! Up-to-date status of a project
//!
//! Exactly one status is computed per project per build. It is immutable once
//! produced and is what flows along dependency edges to downstream projects.

use crate::build_info::VERSION;
use keel_config::ProjectId;
use serde::Serialize;
use std::path::PathBuf;
use std::time::SystemTime;

/// A file together with the modification time it had when it was inspected
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStamp {
    pub path: PathBuf,
    pub time: SystemTime,
}

impl FileStamp {
    pub fn new(path: impl Into<PathBuf>, time: SystemTime) -> Self {
        Self {
            path: path.into(),
            time,
        }
    }
}

/// Why a project is (or is not) up to date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum UpToDateStatus {
    /// The project's config file is missing or invalid
    ConfigNotFound,
    /// No inputs of its own, only references
    Solution,
    /// An upstream project failed (`upstream_blocked` = it was itself skipped)
    UpstreamErrors {
        upstream: ProjectId,
        upstream_blocked: bool,
    },
    ForceBuild,
    OutputMissing {
        path: PathBuf,
    },
    InputMissing {
        path: PathBuf,
    },
    InputNewerThanOutput {
        input: PathBuf,
        output: PathBuf,
    },
    OutOfDateBuildInfoWithErrors {
        build_info: PathBuf,
    },
    OutOfDateBuildInfoPendingEmit {
        build_info: PathBuf,
    },
    OutOfDateOptions {
        build_info: PathBuf,
    },
    OutOfDateRoots {
        root_file: PathBuf,
        build_info: PathBuf,
    },
    VersionMismatch {
        recorded_version: String,
    },
    /// `newest_input` is `None` right after a build or timestamp update
    UpToDate {
        newest_input: Option<FileStamp>,
        oldest_output: Option<FileStamp>,
        build_info: PathBuf,
    },
    /// Only declaration outputs of upstream projects changed since the last build
    UpToDateWithUpstreamTypesOnly,
    /// Inputs were touched but their content is unchanged
    UpToDateWithUnchangedInputText,
    /// A real build ran and reported errors
    BuildErrors {
        reason: String,
    },
}

impl UpToDateStatus {
    /// Short, stable name of the status kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigNotFound => "ConfigNotFound",
            Self::Solution => "Solution",
            Self::UpstreamErrors { .. } => "UpstreamErrors",
            Self::ForceBuild => "ForceBuild",
            Self::OutputMissing { .. } => "OutputMissing",
            Self::InputMissing { .. } => "InputMissing",
            Self::InputNewerThanOutput { .. } => "InputNewerThanOutput",
            Self::OutOfDateBuildInfoWithErrors { .. } => "OutOfDateBuildInfoWithErrors",
            Self::OutOfDateBuildInfoPendingEmit { .. } => "OutOfDateBuildInfoPendingEmit",
            Self::OutOfDateOptions { .. } => "OutOfDateOptions",
            Self::OutOfDateRoots { .. } => "OutOfDateRoots",
            Self::VersionMismatch { .. } => "VersionMismatch",
            Self::UpToDate { .. } => "UpToDate",
            Self::UpToDateWithUpstreamTypesOnly => "UpToDateWithUpstreamTypesOnly",
            Self::UpToDateWithUnchangedInputText => "UpToDateWithUnchangedInputText",
            Self::BuildErrors { .. } => "BuildErrors",
        }
    }

    /// Statuses that block downstream builds when stopping on errors
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound | Self::UpstreamErrors { .. } | Self::BuildErrors { .. }
        )
    }

    /// Newest input observed when the status was computed, if known
    pub fn newest_input_time(&self) -> Option<SystemTime> {
        match self {
            Self::UpToDate {
                newest_input: Some(stamp),
                ..
            } => Some(stamp.time),
            _ => None,
        }
    }

    /// Human-readable explanation used in verbose output
    pub fn describe(&self, project: &ProjectId) -> String {
        match self {
            Self::ConfigNotFound => format!(
                "Project '{}' can't be built because its config file could not be read",
                project
            ),
            Self::Solution => format!(
                "Project '{}' has no inputs of its own and only references other projects",
                project
            ),
            Self::UpstreamErrors {
                upstream,
                upstream_blocked: true,
            } => format!(
                "Project '{}' can't be built because its dependency '{}' was not built",
                project, upstream
            ),
            Self::UpstreamErrors { upstream, .. } => format!(
                "Project '{}' can't be built because its dependency '{}' has errors",
                project, upstream
            ),
            Self::ForceBuild => format!("Project '{}' is being forcibly rebuilt", project),
            Self::OutputMissing { path } => format!(
                "Project '{}' is out of date because output file '{}' does not exist",
                project,
                path.display()
            ),
            Self::InputMissing { path } => format!(
                "Project '{}' is out of date because input '{}' does not exist",
                project,
                path.display()
            ),
            Self::InputNewerThanOutput { input, output } => format!(
                "Project '{}' is out of date because output '{}' is older than input '{}'",
                project,
                output.display(),
                input.display()
            ),
            Self::OutOfDateBuildInfoWithErrors { build_info } => format!(
                "Project '{}' is out of date because buildinfo file '{}' indicates that program needs to report errors",
                project,
                build_info.display()
            ),
            Self::OutOfDateBuildInfoPendingEmit { build_info } => format!(
                "Project '{}' is out of date because buildinfo file '{}' indicates that some of the changes were not emitted",
                project,
                build_info.display()
            ),
            Self::OutOfDateOptions { build_info } => format!(
                "Project '{}' is out of date because buildinfo file '{}' indicates there is change in compiler options",
                project,
                build_info.display()
            ),
            Self::OutOfDateRoots {
                root_file,
                build_info,
            } => format!(
                "Project '{}' is out of date because buildinfo file '{}' indicates that the root status of file '{}' changed",
                project,
                build_info.display(),
                root_file.display()
            ),
            Self::VersionMismatch { recorded_version } => format!(
                "Project '{}' is out of date because output for it was generated with version '{}' that differs with current version '{}'",
                project, recorded_version, VERSION
            ),
            Self::UpToDate {
                newest_input: Some(input),
                oldest_output: Some(output),
                ..
            } => format!(
                "Project '{}' is up to date because newest input '{}' is older than output '{}'",
                project,
                input.path.display(),
                output.path.display()
            ),
            Self::UpToDate { .. } => format!("Project '{}' is up to date", project),
            Self::UpToDateWithUpstreamTypesOnly => format!(
                "Project '{}' is up to date with declaration files from its dependencies",
                project
            ),
            Self::UpToDateWithUnchangedInputText => format!(
                "Project '{}' is up to date but needs to update timestamps of output files that are older than input files",
                project
            ),
            Self::BuildErrors { reason } => format!("Project '{}' has errors: {}", project, reason),
        }
    }
}
