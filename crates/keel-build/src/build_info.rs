//! Persisted build info
//!
//! Every built project records what the last build saw and produced. The
//! up-to-date evaluator reads it back on the next invocation.

use crate::error::{BuildError, BuildResult};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::warn;

/// Tool version stamped into every build info file
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Record of the last build of one project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub version: String,
    #[serde(default)]
    pub incremental: bool,
    /// Emit-time errors
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub semantic_errors: bool,
    /// Checking was skipped, so semantic errors are unknown
    #[serde(default)]
    pub check_pending: bool,
    /// Content hash per input; present only for incremental builds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_versions: Option<BTreeMap<PathBuf, String>>,
    /// Root inputs of the recorded build
    #[serde(default)]
    pub root: Vec<PathBuf>,
    /// Inputs whose outputs were never emitted
    #[serde(default)]
    pub pending_emit: Vec<PathBuf>,
    #[serde(default)]
    pub declarations_emitted: bool,
    /// Milliseconds since the epoch of the last declaration change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_changed_declaration_time: Option<u64>,
}

impl BuildInfo {
    /// Empty record for the current tool version
    pub fn new(incremental: bool) -> Self {
        Self {
            version: VERSION.to_string(),
            incremental,
            errors: false,
            semantic_errors: false,
            check_pending: false,
            file_versions: None,
            root: Vec::new(),
            pending_emit: Vec::new(),
            declarations_emitted: false,
            latest_changed_declaration_time: None,
        }
    }

    /// Recorded content hash of an input
    pub fn file_version(&self, path: &Path) -> Option<&str> {
        self.file_versions
            .as_ref()
            .and_then(|versions| versions.get(path))
            .map(String::as_str)
    }

    pub fn has_root(&self, path: &Path) -> bool {
        self.root.iter().any(|root| root == path)
    }

    pub fn latest_changed_declaration(&self) -> Option<SystemTime> {
        self.latest_changed_declaration_time
            .map(|millis| UNIX_EPOCH + Duration::from_millis(millis))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Milliseconds since the epoch, saturating for times before it
pub fn to_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Storage backend for build info
pub trait BuildInfoStore: Send + Sync {
    /// `Ok(None)` when no usable build info exists at `path`
    fn read(&self, path: &Path) -> BuildResult<Option<BuildInfo>>;

    fn write(&self, path: &Path, info: &BuildInfo) -> BuildResult<()>;
}

/// Build info stored as pretty-printed JSON files
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonBuildInfoStore;

impl BuildInfoStore for JsonBuildInfoStore {
    fn read(&self, path: &Path) -> BuildResult<Option<BuildInfo>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BuildError::io(path, e)),
        };

        match BuildInfo::from_json(&content) {
            Ok(info) => Ok(Some(info)),
            Err(error) => {
                // Unreadable build info is as good as none: the project rebuilds
                warn!(path = %path.display(), %error, "ignoring corrupt build info");
                Ok(None)
            }
        }
    }

    fn write(&self, path: &Path, info: &BuildInfo) -> BuildResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        let json = info
            .to_json()
            .map_err(|e| BuildError::build_info_write(path, e))?;
        fs::write(path, json).map_err(|e| BuildError::build_info_write(path, e))
    }
}

/// Build info read during one invocation, keyed by path
#[derive(Debug, Default)]
pub struct BuildInfoCache {
    entries: DashMap<PathBuf, Option<Arc<BuildInfo>>>,
}

impl BuildInfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached build info at `path`, reading it through `store` on first use.
    ///
    /// Read failures count as absent build info.
    pub fn get(&self, store: &dyn BuildInfoStore, path: &Path) -> Option<Arc<BuildInfo>> {
        if let Some(entry) = self.entries.get(path) {
            return entry.value().clone();
        }

        let info = match store.read(path) {
            Ok(info) => info.map(Arc::new),
            Err(error) => {
                warn!(path = %path.display(), %error, "failed to read build info");
                None
            }
        };
        self.entries
            .entry(path.to_path_buf())
            .or_insert(info)
            .value()
            .clone()
    }

    /// Record the build info a project just wrote
    pub fn replace(&self, path: &Path, info: BuildInfo) {
        self.entries.insert(path.to_path_buf(), Some(Arc::new(info)));
    }
}
