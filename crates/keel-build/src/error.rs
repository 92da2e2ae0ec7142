/// Build system error types
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Failed to write build info at {path}: {error}")]
    BuildInfoWrite { path: PathBuf, error: String },

    #[error("Compilation failed for project '{project}': {error}")]
    CompilationError { project: String, error: String },

    #[error("I/O error at {path}: {error}")]
    IoError {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            error,
        }
    }

    /// Create a build info write error
    pub fn build_info_write(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::BuildInfoWrite {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// Create a compilation error, for compilers that cannot load a program at all
    pub fn compilation(project: impl ToString, error: impl ToString) -> Self {
        Self::CompilationError {
            project: project.to_string(),
            error: error.to_string(),
        }
    }
}
