//! Shared state of one `build_or_clean` invocation

use crate::build_info::{BuildInfo, BuildInfoCache, BuildInfoStore};
use crate::compiler::Compiler;
use crate::fs_state::FileSystemState;
use crate::options::BuildOptions;
use std::path::Path;
use std::sync::Arc;

/// Everything a project task reads besides its own unit.
///
/// Caches live exactly as long as the context, so each invocation observes
/// the file system afresh.
pub struct BuildContext<'a> {
    pub options: &'a BuildOptions,
    pub compiler: &'a dyn Compiler,
    pub store: &'a dyn BuildInfoStore,
    pub files: FileSystemState,
    pub build_infos: BuildInfoCache,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        options: &'a BuildOptions,
        compiler: &'a dyn Compiler,
        store: &'a dyn BuildInfoStore,
    ) -> Self {
        Self {
            options,
            compiler,
            store,
            files: FileSystemState::new(),
            build_infos: BuildInfoCache::new(),
        }
    }

    /// Build info at `path`, cached for the invocation
    pub fn build_info(&self, path: &Path) -> Option<Arc<BuildInfo>> {
        self.build_infos.get(self.store, path)
    }
}
