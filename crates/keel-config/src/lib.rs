//! Keel project configuration
//!
//! Provides the configuration layer for multi-project builds:
//! - Project configuration files (`keel.toml`)
//! - `extends` chains with option inheritance
//! - Project identifiers (canonical config paths)
//! - The [`ConfigResolver`] seam used by the build orchestrator, with a
//!   cached TOML implementation
//!
//! # Example
//!
//! ```no_run
//! use keel_config::{ConfigResolver, ProjectId, TomlConfigResolver};
//!
//! let resolver = TomlConfigResolver::new();
//! let id = ProjectId::new("packages/core").unwrap();
//! let resolution = resolver.resolve(&id);
//! assert!(resolution.project.is_some());
//! ```

pub mod diagnostic;
pub mod id;
pub mod project;
pub mod resolved;
pub mod resolver;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}' in {file}: {reason}")]
    InvalidValue {
        field: String,
        file: PathBuf,
        reason: String,
    },

    #[error("Circular 'extends' chain: {0}")]
    CircularExtends(String),

    #[error("Invalid path: {0}")]
    InvalidPath(PathBuf),
}

impl ConfigError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        file: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            file: file.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Default configuration file name looked up when a reference names a directory
pub const CONFIG_FILE_NAME: &str = "keel.toml";

// Re-export main types
pub use diagnostic::{Category, Diagnostic};
pub use id::ProjectId;
pub use project::{OptionsConfig, ProjectConfig, ReferenceSpec};
pub use resolved::{
    CompilerOptions, ParsedProject, ProjectReference, BUILD_INFO_EXTENSION, DECLARATION_EXTENSION,
    OUTPUT_EXTENSION,
};
pub use resolver::{ConfigResolver, Resolution, TomlConfigResolver};
