//! Compiler seam
//!
//! The orchestrator never looks inside source files; everything it knows about
//! a program comes through [`Compiler`]. [`PassthroughCompiler`] is the
//! implementation used by the CLI: it copies sources to `.out` files and
//! collects `export` lines into `.decl` files.

use crate::build_info::BuildInfo;
use crate::error::{BuildError, BuildResult};
use crate::fs_state::hash_content;
use keel_config::{Diagnostic, ParsedProject, DECLARATION_EXTENSION};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

/// Marker that makes a source line report an error
pub const ERROR_MARKER: &str = "@error";

/// Prefix of lines that belong to a file's declarations
pub const EXPORT_PREFIX: &str = "export ";

/// One loaded input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
    /// Content hash recorded in build info
    pub version: String,
}

/// A project's inputs, loaded and ready to check and emit
#[derive(Debug, Clone)]
pub struct Program {
    pub project: Arc<ParsedProject>,
    pub sources: Vec<SourceFile>,
    /// Problems found while loading (missing inputs)
    pub load_diagnostics: Vec<Diagnostic>,
}

impl Program {
    pub fn source(&self, path: &Path) -> Option<&SourceFile> {
        self.sources.iter().find(|source| source.path == path)
    }
}

/// Result of writing a program's outputs
#[derive(Debug, Clone, Default)]
pub struct EmitOutput {
    /// Files actually written
    pub emitted_files: Vec<PathBuf>,
    /// Any declaration file changed content
    pub declarations_changed: bool,
    pub diagnostics: Vec<Diagnostic>,
}

pub trait Compiler: Send + Sync {
    /// Load a project's inputs; `prior` is the last recorded build info
    fn build_program(
        &self,
        project: &Arc<ParsedProject>,
        prior: Option<&BuildInfo>,
    ) -> BuildResult<Program>;

    /// Syntactic and semantic diagnostics
    fn collect_diagnostics(&self, program: &Program) -> Vec<Diagnostic>;

    /// Write outputs
    fn emit(&self, program: &Program) -> BuildResult<EmitOutput>;
}

/// Copies inputs to outputs and extracts declarations
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughCompiler;

impl Compiler for PassthroughCompiler {
    fn build_program(
        &self,
        project: &Arc<ParsedProject>,
        _prior: Option<&BuildInfo>,
    ) -> BuildResult<Program> {
        let mut sources = Vec::with_capacity(project.files.len());
        let mut load_diagnostics = Vec::new();

        for path in &project.files {
            match fs::read_to_string(path) {
                Ok(text) => {
                    let version = hash_content(text.as_bytes());
                    sources.push(SourceFile {
                        path: path.clone(),
                        text,
                        version,
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    load_diagnostics.push(
                        Diagnostic::error(format!("File '{}' not found.", path.display()))
                            .with_project(project.id.clone()),
                    );
                }
                Err(e) => return Err(BuildError::io(path, e)),
            }
        }

        Ok(Program {
            project: Arc::clone(project),
            sources,
            load_diagnostics,
        })
    }

    fn collect_diagnostics(&self, program: &Program) -> Vec<Diagnostic> {
        let mut diagnostics = program.load_diagnostics.clone();
        for source in &program.sources {
            for (index, line) in source.text.lines().enumerate() {
                if line.contains(ERROR_MARKER) {
                    diagnostics.push(
                        Diagnostic::error(format!(
                            "{}:{}: {}",
                            source.path.display(),
                            index + 1,
                            line.trim()
                        ))
                        .with_project(program.project.id.clone()),
                    );
                }
            }
        }
        diagnostics
    }

    fn emit(&self, program: &Program) -> BuildResult<EmitOutput> {
        let mut output = EmitOutput::default();

        for source in &program.sources {
            for path in program.project.outputs_for(&source.path) {
                if program.project.is_input(&path) {
                    let message = format!(
                        "Cannot write file '{}' because it would overwrite input file.",
                        path.display()
                    );
                    if !output.diagnostics.iter().any(|d| d.message == message) {
                        output.diagnostics.push(
                            Diagnostic::error(message).with_project(program.project.id.clone()),
                        );
                    }
                    continue;
                }

                let is_declaration =
                    path.extension().and_then(|ext| ext.to_str()) == Some(DECLARATION_EXTENSION);
                let content = if is_declaration {
                    declarations(&source.text)
                } else {
                    source.text.clone()
                };

                let unchanged = fs::read_to_string(&path).ok().as_deref() == Some(content.as_str());
                if is_declaration && unchanged {
                    trace!(path = %path.display(), "declarations unchanged");
                    continue;
                }

                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
                }
                fs::write(&path, &content).map_err(|e| BuildError::io(&path, e))?;
                output.declarations_changed |= is_declaration;
                output.emitted_files.push(path);
            }
        }

        Ok(output)
    }
}

/// Declaration text of a source file
pub fn declarations(text: &str) -> String {
    let mut out = String::new();
    for line in text.lines().filter(|line| line.starts_with(EXPORT_PREFIX)) {
        out.push_str(line);
        out.push('\n');
    }
    out
}
