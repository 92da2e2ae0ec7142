//! Resolved projects
//!
//! A [`ParsedProject`] is a config file after `extends` inheritance, with
//! every path made absolute. It is what the build orchestrator works with.

use crate::id::ProjectId;
use crate::project::OptionsConfig;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Extension of emitted output files
pub const OUTPUT_EXTENSION: &str = "out";
/// Extension of emitted declaration files
pub const DECLARATION_EXTENSION: &str = "decl";
/// Extension of the build info file
pub const BUILD_INFO_EXTENSION: &str = "buildinfo";

/// Effective compiler options of a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompilerOptions {
    pub out_dir: Option<PathBuf>,
    pub root_dir: PathBuf,
    pub incremental: bool,
    pub composite: bool,
    pub declaration: bool,
    pub build_info: Option<PathBuf>,
    pub no_emit: bool,
    pub no_check: bool,
}

impl CompilerOptions {
    /// Defaults for a project whose config lives in `config_dir`
    pub fn for_dir(config_dir: &Path) -> Self {
        Self::from_config(&OptionsConfig::default(), config_dir)
    }

    /// Apply defaults to options that were already rebased to absolute paths
    pub fn from_config(config: &OptionsConfig, config_dir: &Path) -> Self {
        let composite = config.composite.unwrap_or(false);
        Self {
            out_dir: config.out_dir.clone(),
            root_dir: config
                .root_dir
                .clone()
                .unwrap_or_else(|| config_dir.to_path_buf()),
            incremental: config.incremental.unwrap_or(composite),
            composite,
            declaration: config.declaration.unwrap_or(composite),
            build_info: config.build_info.clone(),
            no_emit: config.no_emit.unwrap_or(false),
            no_check: config.no_check.unwrap_or(false),
        }
    }
}

/// A resolved reference to another project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectReference {
    pub id: ProjectId,
    /// Declared as an expected cycle
    pub circular: bool,
}

impl ProjectReference {
    pub fn new(id: ProjectId) -> Self {
        Self {
            id,
            circular: false,
        }
    }

    pub fn circular(id: ProjectId) -> Self {
        Self { id, circular: true }
    }
}

/// A fully resolved project configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedProject {
    pub id: ProjectId,
    /// Absolute input paths, in declaration order
    pub files: Vec<PathBuf>,
    pub references: Vec<ProjectReference>,
    pub options: CompilerOptions,
    /// Config files this one extends, nearest first
    pub extended_configs: Vec<PathBuf>,
}

impl ParsedProject {
    /// Project with default options, no inputs and no references
    pub fn new(id: ProjectId) -> Self {
        let options = CompilerOptions::for_dir(id.dir());
        Self {
            id,
            files: Vec::new(),
            references: Vec::new(),
            options,
            extended_configs: Vec::new(),
        }
    }

    /// Set input files; relative paths are taken relative to the config directory
    pub fn with_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let dir = self.id.dir().to_path_buf();
        self.files = files.into_iter().map(|f| dir.join(f.as_ref())).collect();
        self
    }

    /// Set references
    pub fn with_references(mut self, references: Vec<ProjectReference>) -> Self {
        self.references = references;
        self
    }

    /// Set compiler options
    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    /// A project with no inputs that only aggregates references
    pub fn is_solution(&self) -> bool {
        self.files.is_empty() && !self.references.is_empty()
    }

    /// Whether `path` is one of this project's inputs
    pub fn is_input(&self, path: &Path) -> bool {
        self.files.iter().any(|file| file == path)
    }

    /// Location of the persisted build info
    pub fn build_info_path(&self) -> PathBuf {
        if let Some(path) = &self.options.build_info {
            return path.clone();
        }

        let dir = self
            .options
            .out_dir
            .as_deref()
            .unwrap_or_else(|| self.id.dir());
        dir.join(format!("{}.{}", self.id.stem(), BUILD_INFO_EXTENSION))
    }

    /// Declared outputs of one input file
    pub fn outputs_for(&self, input: &Path) -> Vec<PathBuf> {
        if self.options.no_emit {
            return Vec::new();
        }

        let relative = input
            .strip_prefix(&self.options.root_dir)
            .unwrap_or_else(|_| input.file_name().map(Path::new).unwrap_or(input));
        let base = match &self.options.out_dir {
            Some(out_dir) => out_dir.join(relative),
            None => input.to_path_buf(),
        };

        let mut outputs = vec![base.with_extension(OUTPUT_EXTENSION)];
        if self.options.declaration {
            outputs.push(base.with_extension(DECLARATION_EXTENSION));
        }
        outputs
    }

    /// Every declared output, in input order (the build info is not included)
    pub fn output_files(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .flat_map(|input| self.outputs_for(input))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn project() -> ParsedProject {
        ParsedProject::new(ProjectId::from_config_path("/repo/app/keel.toml"))
            .with_files(["src/main.kl", "src/util/io.kl"])
    }

    #[test]
    fn test_defaults() {
        let project = project();
        assert!(!project.options.composite);
        assert!(!project.options.incremental);
        assert!(!project.options.declaration);
        assert_eq!(project.options.root_dir, PathBuf::from("/repo/app"));
        assert_eq!(project.files[0], PathBuf::from("/repo/app/src/main.kl"));
    }

    #[test]
    fn test_composite_implies_incremental_and_declaration() {
        let options = CompilerOptions::from_config(
            &OptionsConfig {
                composite: Some(true),
                ..Default::default()
            },
            Path::new("/repo/app"),
        );
        assert!(options.incremental);
        assert!(options.declaration);

        let options = CompilerOptions::from_config(
            &OptionsConfig {
                composite: Some(true),
                incremental: Some(false),
                ..Default::default()
            },
            Path::new("/repo/app"),
        );
        assert!(!options.incremental);
    }

    #[test]
    fn test_outputs_next_to_inputs_without_out_dir() {
        let project = project();
        assert_eq!(
            project.output_files(),
            vec![
                PathBuf::from("/repo/app/src/main.out"),
                PathBuf::from("/repo/app/src/util/io.out"),
            ]
        );
        assert_eq!(
            project.build_info_path(),
            PathBuf::from("/repo/app/keel.buildinfo")
        );
    }

    #[test]
    fn test_outputs_mirror_root_dir_into_out_dir() {
        let mut options = CompilerOptions::for_dir(Path::new("/repo/app"));
        options.out_dir = Some(PathBuf::from("/repo/app/out"));
        options.root_dir = PathBuf::from("/repo/app/src");
        options.declaration = true;
        let project = project().with_options(options);

        assert_eq!(
            project.output_files(),
            vec![
                PathBuf::from("/repo/app/out/main.out"),
                PathBuf::from("/repo/app/out/main.decl"),
                PathBuf::from("/repo/app/out/util/io.out"),
                PathBuf::from("/repo/app/out/util/io.decl"),
            ]
        );
        assert_eq!(
            project.build_info_path(),
            PathBuf::from("/repo/app/out/keel.buildinfo")
        );
    }

    #[test]
    fn test_no_emit_declares_no_outputs() {
        let mut options = CompilerOptions::for_dir(Path::new("/repo/app"));
        options.no_emit = true;
        let project = project().with_options(options);
        assert!(project.output_files().is_empty());
    }

    #[test]
    fn test_solution_detection() {
        let core = ProjectId::from_config_path("/repo/core/keel.toml");
        let solution = ParsedProject::new(ProjectId::from_config_path("/repo/keel.toml"))
            .with_references(vec![ProjectReference::new(core)]);
        assert!(solution.is_solution());
        assert!(!project().is_solution());
    }
}
