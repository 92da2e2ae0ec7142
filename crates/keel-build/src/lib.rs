//! Keel build orchestration
//!
//! Builds a set of projects that reference each other:
//! - Project graph resolution from root projects
//! - Build ordering with reference cycle detection
//! - Up-to-date checks against persisted build info
//! - Parallel execution with per-edge status slots
//! - Ordered reporting through a reporter chain
//! - Clean and dry-run modes
//!
//! # Example
//!
//! ```no_run
//! use keel_build::{BuildOptions, Orchestrator};
//! use keel_config::ProjectId;
//!
//! let roots = vec![ProjectId::new("packages/app").unwrap()];
//! let orchestrator = Orchestrator::with_defaults(roots, BuildOptions::default());
//! let summary = orchestrator.build();
//! std::process::exit(summary.exit_status.code());
//! ```

pub mod build_info;
pub mod clean;
pub mod compiler;
pub mod context;
pub mod error;
pub mod evaluate;
pub mod executor;
pub mod fs_state;
pub mod graph;
pub mod options;
pub mod order;
pub mod orchestrator;
pub mod reporter;
pub mod slot;
pub mod status;
pub mod summary;

// Re-export main types
pub use build_info::{BuildInfo, BuildInfoStore, JsonBuildInfoStore, VERSION};
pub use compiler::{Compiler, EmitOutput, PassthroughCompiler, Program, SourceFile};
pub use context::BuildContext;
pub use error::{BuildError, BuildResult};
pub use evaluate::{evaluate, UpstreamStatus};
pub use graph::{BuildUnit, ProjectGraph};
pub use options::{BuildOptions, ExecutionMode};
pub use order::{BuildOrder, Cycle, Edge};
pub use orchestrator::Orchestrator;
pub use reporter::TaskReport;
pub use status::{FileStamp, UpToDateStatus};
pub use summary::{BuildSummary, ExitStatus, ProjectAction, ProjectStats};

// Re-export keel-config types for convenience
pub use keel_config::{ConfigResolver, Diagnostic, ParsedProject, ProjectId, TomlConfigResolver};
