//! Build summaries and exit statuses

use crate::status::UpToDateStatus;
use keel_config::ProjectId;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Overall result of an invocation, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ExitStatus {
    Success,
    DiagnosticsPresentOutputsGenerated,
    DiagnosticsPresentOutputsSkipped,
    InvalidProjectOutputsSkipped,
    ProjectReferenceCycleOutputsSkipped,
}

impl ExitStatus {
    /// Process exit code
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::DiagnosticsPresentOutputsSkipped => 1,
            Self::DiagnosticsPresentOutputsGenerated => 2,
            Self::InvalidProjectOutputsSkipped => 3,
            Self::ProjectReferenceCycleOutputsSkipped => 4,
        }
    }

    /// Raise to `other` when it is more severe
    pub fn raise(&mut self, other: ExitStatus) {
        if other > *self {
            *self = other;
        }
    }
}

impl Default for ExitStatus {
    fn default() -> Self {
        Self::Success
    }
}

/// What the executor did with a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectAction {
    Built,
    PseudoBuilt,
    Skipped,
    UpToDate,
    WouldBuild,
    WouldUpdateTimestamps,
    Cleaned,
}

/// Per-project record of one invocation
#[derive(Debug, Clone, Serialize)]
pub struct ProjectStats {
    pub project: ProjectId,
    /// Evaluated status; `None` for clean
    pub status: Option<UpToDateStatus>,
    pub action: ProjectAction,
    /// Error diagnostics reported for the project
    pub errors: usize,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

/// Result of `build_or_clean`
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildSummary {
    pub exit_status: ExitStatus,
    /// One entry per project in build order
    pub projects: Vec<ProjectStats>,
    /// Files a dry-run clean would delete
    pub files_pending_deletion: Vec<PathBuf>,
}

impl BuildSummary {
    pub fn project(&self, id: &ProjectId) -> Option<&ProjectStats> {
        self.projects.iter().find(|stats| &stats.project == id)
    }

    /// Projects that ran a real build
    pub fn built(&self) -> impl Iterator<Item = &ProjectId> {
        self.projects
            .iter()
            .filter(|stats| stats.action == ProjectAction::Built)
            .map(|stats| &stats.project)
    }

    pub fn total_errors(&self) -> usize {
        self.projects.iter().map(|stats| stats.errors).sum()
    }

    pub fn is_success(&self) -> bool {
        self.exit_status == ExitStatus::Success
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}
