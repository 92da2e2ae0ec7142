//! Config Resolver
//!
//! Turns a [`ProjectId`] into a resolved project plus diagnostics. Results are
//! memoised per identifier: concurrent callers may race to load the same file,
//! but only the first result to land in the cache is ever handed out.

use crate::diagnostic::Diagnostic;
use crate::id::ProjectId;
use crate::project::{OptionsConfig, ProjectConfig};
use crate::resolved::{CompilerOptions, ParsedProject, ProjectReference};
use crate::{ConfigError, ConfigResult};
use dashmap::DashMap;
use path_clean::PathClean;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Outcome of resolving one project
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// `None` when the config is missing or invalid
    pub project: Option<Arc<ParsedProject>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    pub fn found(project: ParsedProject) -> Self {
        Self {
            project: Some(Arc::new(project)),
            diagnostics: Vec::new(),
        }
    }

    pub fn failed(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            project: None,
            diagnostics,
        }
    }
}

/// Resolves project identifiers to parsed projects.
///
/// Implementations must be idempotent per identifier; the orchestrator may
/// call `resolve` for the same project from several threads.
pub trait ConfigResolver: Send + Sync {
    fn resolve(&self, id: &ProjectId) -> Arc<Resolution>;
}

/// Resolver reading `keel.toml` files from disk
#[derive(Debug, Default)]
pub struct TomlConfigResolver {
    cache: DashMap<ProjectId, Arc<Resolution>>,
}

/// One config file after its `extends` chain has been applied
struct LoadedConfig {
    options: OptionsConfig,
    files: Option<Vec<PathBuf>>,
    extended: Vec<PathBuf>,
}

impl TomlConfigResolver {
    /// Create a resolver with an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached resolutions
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Load and resolve a project without consulting the cache
    pub fn load(&self, id: &ProjectId) -> ConfigResult<ParsedProject> {
        let config = ProjectConfig::load_from_file(id.path())?;
        let loaded = load_chain(id.path(), config.clone(), &mut Vec::new())?;
        if loaded.options.composite == Some(true) && loaded.files.is_none() {
            return Err(ConfigError::invalid_value(
                "files",
                id.path(),
                "composite projects must list their input files",
            ));
        }

        let mut references = Vec::with_capacity(config.references.len());
        for spec in &config.references {
            let target = id.resolve_reference(spec.path());
            if &target == id {
                return Err(ConfigError::invalid_value(
                    "references",
                    id.path(),
                    "a project cannot reference itself",
                ));
            }
            references.push(ProjectReference {
                id: target,
                circular: spec.circular(),
            });
        }

        Ok(ParsedProject {
            id: id.clone(),
            files: loaded.files.unwrap_or_default(),
            references,
            options: CompilerOptions::from_config(&loaded.options, id.dir()),
            extended_configs: loaded.extended,
        })
    }
}

impl ConfigResolver for TomlConfigResolver {
    fn resolve(&self, id: &ProjectId) -> Arc<Resolution> {
        if let Some(hit) = self.cache.get(id) {
            return Arc::clone(hit.value());
        }

        let resolution = match self.load(id) {
            Ok(project) => {
                debug!(
                    project = %id,
                    files = project.files.len(),
                    references = project.references.len(),
                    "resolved project config"
                );
                Resolution::found(project)
            }
            Err(error) => {
                debug!(project = %id, %error, "project config unavailable");
                let message = match &error {
                    ConfigError::NotFound(path) => format!("File '{}' not found.", path.display()),
                    other => other.to_string(),
                };
                Resolution::failed(vec![Diagnostic::error(message).with_project(id.clone())])
            }
        };

        Arc::clone(
            self.cache
                .entry(id.clone())
                .or_insert_with(|| Arc::new(resolution))
                .value(),
        )
    }
}

/// Apply the `extends` chain of an already parsed config file.
///
/// `chain` holds the files currently being loaded and is used to reject
/// circular `extends`.
fn load_chain(
    path: &Path,
    mut config: ProjectConfig,
    chain: &mut Vec<PathBuf>,
) -> ConfigResult<LoadedConfig> {
    if chain.iter().any(|seen| seen == path) {
        let mut cycle: Vec<String> = chain.iter().map(|p| p.display().to_string()).collect();
        cycle.push(path.display().to_string());
        return Err(ConfigError::CircularExtends(cycle.join(" -> ")));
    }
    chain.push(path.to_path_buf());

    let dir = path.parent().unwrap_or_else(|| Path::new("/"));
    config.options.rebase(dir);
    let mut files = config
        .files
        .take()
        .map(|files| files.into_iter().map(|f| dir.join(f).clean()).collect::<Vec<_>>());
    let mut extended = Vec::new();

    if let Some(extends) = config.extends.take() {
        let base_path = dir.join(extends).clean();
        let base_config = ProjectConfig::load_from_file(&base_path).map_err(|e| match e {
            ConfigError::NotFound(missing) => ConfigError::invalid_value(
                "extends",
                path,
                format!("base config '{}' not found", missing.display()),
            ),
            other => other,
        })?;
        let base = load_chain(&base_path, base_config, chain)?;

        config.options.inherit(&base.options);
        if files.is_none() {
            files = base.files;
        }
        extended.push(base_path);
        extended.extend(base.extended);
    }

    chain.pop();
    Ok(LoadedConfig {
        options: config.options,
        files,
        extended,
    })
}
