//! Orchestrator options
//!
//! Flags consulted by the build and clean executors. Environment variables
//! (`KEEL_*`) can switch them on for CI or test environments; explicit
//! settings made afterwards through the `with_*` methods win.

use std::env;

/// How per-project work is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One task per project, run concurrently
    Parallel,
    /// Tasks run one after another in build order on the calling thread
    SingleThreaded,
}

/// Build configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Explain every up-to-date decision
    pub verbose: bool,
    /// Report what would happen without touching the file system
    pub dry_run: bool,
    /// Rebuild every project regardless of its status
    pub force: bool,
    /// Skip projects whose upstream failed or was skipped
    pub stop_build_on_errors: bool,
    /// Deterministic sequential execution
    pub single_threaded: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            verbose: false,
            dry_run: false,
            force: false,
            stop_build_on_errors: true,
            single_threaded: false,
        }
    }
}

impl BuildOptions {
    /// Defaults overlaid with `KEEL_*` environment variables
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(verbose) = env_flag("KEEL_VERBOSE") {
            options.verbose = verbose;
        }
        if let Some(dry_run) = env_flag("KEEL_DRY_RUN") {
            options.dry_run = dry_run;
        }
        if let Some(force) = env_flag("KEEL_FORCE") {
            options.force = force;
        }
        if let Some(stop) = env_flag("KEEL_STOP_ON_ERRORS") {
            options.stop_build_on_errors = stop;
        }
        if let Some(single) = env_flag("KEEL_SINGLE_THREADED") {
            options.single_threaded = single;
        }
        options
    }

    /// Enable/disable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Enable/disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable/disable forced rebuilds
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Enable/disable skipping projects downstream of failures
    pub fn with_stop_build_on_errors(mut self, stop: bool) -> Self {
        self.stop_build_on_errors = stop;
        self
    }

    /// Enable/disable single-threaded execution
    pub fn with_single_threaded(mut self, single_threaded: bool) -> Self {
        self.single_threaded = single_threaded;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        if self.single_threaded {
            ExecutionMode::SingleThreaded
        } else {
            ExecutionMode::Parallel
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    Some(matches!(
        value.to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    ))
}
