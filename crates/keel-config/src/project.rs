//! Project Configuration (keel.toml)
//!
//! The on-disk schema of a project configuration file. Paths are kept exactly
//! as written; [`crate::resolver`] makes them absolute relative to the file
//! that declared them and applies `extends` inheritance.

use crate::{ConfigError, ConfigResult};
use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project configuration from keel.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Base configuration whose options (and files, if this one has none) are inherited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<PathBuf>,

    /// Input files, relative to this config file.
    /// `None` inherits from the base config; `Some(vec![])` means no inputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<PathBuf>>,

    /// Referenced projects (directories or config files)
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ReferenceSpec>,

    /// Compiler options
    #[serde(default)]
    pub options: OptionsConfig,
}

/// Compiler options as written; every field is optional so that `extends`
/// can tell "unset" from "set to the default".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OptionsConfig {
    /// Output directory for emitted files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_dir: Option<PathBuf>,

    /// Root of the input tree mirrored into `out_dir` (default: config directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_dir: Option<PathBuf>,

    /// Persist per-file versions so later builds can be incremental
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incremental: Option<bool>,

    /// Project is meant to be referenced; implies `incremental` and `declaration` by default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub composite: Option<bool>,

    /// Emit declaration files next to outputs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration: Option<bool>,

    /// Explicit build info location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_info: Option<PathBuf>,

    /// Check only, emit nothing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_emit: Option<bool>,

    /// Skip semantic checking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_check: Option<bool>,
}

/// A reference to another project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ReferenceSpec {
    /// Plain path (e.g., "../core")
    Path(PathBuf),

    /// Detailed reference
    Detailed {
        /// Referenced project directory or config file
        path: PathBuf,

        /// The reference is a declared, expected cycle
        #[serde(default)]
        circular: bool,
    },
}

impl ReferenceSpec {
    /// Path as written in the config file
    pub fn path(&self) -> &Path {
        match self {
            Self::Path(path) => path,
            Self::Detailed { path, .. } => path,
        }
    }

    /// Whether the reference is declared circular
    pub fn circular(&self) -> bool {
        matches!(self, Self::Detailed { circular: true, .. })
    }
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::io(path, e)
            }
        })?;

        Self::parse(&content, path)
    }

    /// Parse and validate configuration text; `path` is used for error context
    pub fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate(path)?;
        Ok(config)
    }

    /// Validate the project configuration
    pub fn validate(&self, path: &Path) -> ConfigResult<()> {
        if let Some(extends) = &self.extends {
            if extends.as_os_str().is_empty() {
                return Err(ConfigError::invalid_value(
                    "extends",
                    path,
                    "path cannot be empty",
                ));
            }
        }

        for file in self.files.iter().flatten() {
            if file.as_os_str().is_empty() {
                return Err(ConfigError::invalid_value(
                    "files",
                    path,
                    "file entries cannot be empty",
                ));
            }
        }

        for reference in &self.references {
            if reference.path().as_os_str().is_empty() {
                return Err(ConfigError::invalid_value(
                    "references",
                    path,
                    "reference path cannot be empty",
                ));
            }
        }

        Ok(())
    }
}

impl OptionsConfig {
    /// Fill every unset option from `base`; values set here win
    pub fn inherit(&mut self, base: &OptionsConfig) {
        fn fill<T: Clone>(slot: &mut Option<T>, base: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(base);
            }
        }

        fill(&mut self.out_dir, &base.out_dir);
        fill(&mut self.root_dir, &base.root_dir);
        fill(&mut self.incremental, &base.incremental);
        fill(&mut self.composite, &base.composite);
        fill(&mut self.declaration, &base.declaration);
        fill(&mut self.build_info, &base.build_info);
        fill(&mut self.no_emit, &base.no_emit);
        fill(&mut self.no_check, &base.no_check);
    }

    /// Make path-valued options absolute relative to `dir`, lexically cleaned
    pub fn rebase(&mut self, dir: &Path) {
        for path in [&mut self.out_dir, &mut self.root_dir, &mut self.build_info]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = dir.join(&*path).clean();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_minimal_project_config() {
        let config = ProjectConfig::parse("", Path::new("keel.toml")).unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert!(config.files.is_none());
    }

    #[test]
    fn test_parse_full_project_config() {
        let toml = r#"
extends = "../base.toml"
files = ["src/a.kl", "src/b.kl"]
references = ["../core", { path = "../util", circular = true }]

[options]
out_dir = "out"
composite = true
declaration = true
no_check = false
"#;

        let config = ProjectConfig::parse(toml, Path::new("keel.toml")).unwrap();
        assert_eq!(config.extends, Some(PathBuf::from("../base.toml")));
        assert_eq!(config.files.as_ref().map(Vec::len), Some(2));
        assert_eq!(config.references.len(), 2);
        assert_eq!(config.references[0].path(), Path::new("../core"));
        assert!(!config.references[0].circular());
        assert!(config.references[1].circular());
        assert_eq!(config.options.out_dir, Some(PathBuf::from("out")));
        assert_eq!(config.options.composite, Some(true));
        assert_eq!(config.options.incremental, None);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result = ProjectConfig::parse("colour = \"blue\"", Path::new("keel.toml"));
        assert!(matches!(result, Err(ConfigError::TomlParseError { .. })));

        let result = ProjectConfig::parse("[options]\nturbo = true", Path::new("keel.toml"));
        assert!(matches!(result, Err(ConfigError::TomlParseError { .. })));
    }

    #[test]
    fn test_empty_reference_rejected() {
        let result = ProjectConfig::parse("references = [\"\"]", Path::new("keel.toml"));
        match result {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "references"),
            other => panic!("Expected InvalidValue error, got {:?}", other),
        }
    }

    #[test]
    fn test_inherit_keeps_child_values() {
        let mut child = OptionsConfig {
            out_dir: Some(PathBuf::from("/child/out")),
            declaration: Some(false),
            ..Default::default()
        };
        let base = OptionsConfig {
            out_dir: Some(PathBuf::from("/base/out")),
            declaration: Some(true),
            composite: Some(true),
            ..Default::default()
        };

        child.inherit(&base);
        assert_eq!(child.out_dir, Some(PathBuf::from("/child/out")));
        assert_eq!(child.declaration, Some(false));
        assert_eq!(child.composite, Some(true));
    }

    #[test]
    fn test_rebase_only_touches_relative_paths() {
        let mut options = OptionsConfig {
            out_dir: Some(PathBuf::from("out")),
            build_info: Some(PathBuf::from("/abs/info.buildinfo")),
            ..Default::default()
        };

        options.rebase(Path::new("/repo/app"));
        assert_eq!(options.out_dir, Some(PathBuf::from("/repo/app/out")));
        assert_eq!(
            options.build_info,
            Some(PathBuf::from("/abs/info.buildinfo"))
        );
        assert_eq!(options.root_dir, None);
    }

    #[test]
    fn test_rebase_cleans_parent_components() {
        let mut options = OptionsConfig {
            build_info: Some(PathBuf::from("../shared.buildinfo")),
            ..Default::default()
        };

        options.rebase(Path::new("/repo/app"));
        assert_eq!(
            options.build_info,
            Some(PathBuf::from("/repo/shared.buildinfo"))
        );
    }
}
