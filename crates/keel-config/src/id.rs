//! Project identifiers
//!
//! A project is identified by the canonical path of its configuration file.
//! Canonicalisation is lexical (`path-clean`), so an identifier exists even when
//! the file it names does not; a missing config surfaces later as a status
//! rather than as an identifier error.

use crate::{ConfigError, ConfigResult, CONFIG_FILE_NAME};
use path_clean::PathClean;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Canonical path of a project's configuration file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProjectId(PathBuf);

impl ProjectId {
    /// Create an identifier from a user-supplied path (file or directory),
    /// made absolute against the current directory.
    pub fn new(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let absolute =
            std::path::absolute(path).map_err(|_| ConfigError::InvalidPath(path.to_path_buf()))?;
        Ok(Self::from_config_path(absolute))
    }

    /// Create an identifier from an already absolute path.
    ///
    /// Paths without a `.toml` extension name a project directory and get the
    /// default config file name appended.
    pub fn from_config_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into().clean();
        if path.extension().and_then(|ext| ext.to_str()) == Some("toml") {
            Self(path)
        } else {
            Self(path.join(CONFIG_FILE_NAME))
        }
    }

    /// Resolve a reference written inside this project's config file
    pub fn resolve_reference(&self, reference: impl AsRef<Path>) -> Self {
        Self::from_config_path(self.dir().join(reference))
    }

    /// Path of the configuration file
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Directory containing the configuration file
    pub fn dir(&self) -> &Path {
        self.0.parent().unwrap_or_else(|| Path::new("/"))
    }

    /// Config file stem, used to derive default artifact names
    pub fn stem(&self) -> &str {
        self.0
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("keel")
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for ProjectId {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/repo/core", "/repo/core/keel.toml")]
    #[case("/repo/core/", "/repo/core/keel.toml")]
    #[case("/repo/core/keel.toml", "/repo/core/keel.toml")]
    #[case("/repo/core/custom.toml", "/repo/core/custom.toml")]
    #[case("/repo/app/../core/./keel.toml", "/repo/core/keel.toml")]
    fn test_from_config_path(#[case] input: &str, #[case] expected: &str) {
        let id = ProjectId::from_config_path(input);
        assert_eq!(id.path(), Path::new(expected));
    }

    #[test]
    fn test_resolve_reference_is_relative_to_config_dir() {
        let app = ProjectId::from_config_path("/repo/app/keel.toml");
        let core = app.resolve_reference("../core");
        assert_eq!(core.path(), Path::new("/repo/core/keel.toml"));
        assert_eq!(core.dir(), Path::new("/repo/core"));
    }

    #[test]
    fn test_same_project_through_different_spellings() {
        let app = ProjectId::from_config_path("/repo/app/keel.toml");
        assert_eq!(
            app.resolve_reference("../core"),
            app.resolve_reference("../core/keel.toml")
        );
    }

    #[test]
    fn test_relative_paths_become_absolute() {
        let id = ProjectId::new("some/project").unwrap();
        assert!(id.path().is_absolute());
        assert!(id.path().ends_with("some/project/keel.toml"));
    }

    #[test]
    fn test_stem() {
        assert_eq!(ProjectId::from_config_path("/a/keel.toml").stem(), "keel");
        assert_eq!(ProjectId::from_config_path("/a/lib.toml").stem(), "lib");
    }
}
