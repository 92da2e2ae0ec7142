//! Configuration loading and reference resolution tests

use keel_config::{
    ConfigError, ConfigResolver, ProjectConfig, ProjectId, ReferenceSpec, TomlConfigResolver,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn create_config_file(dir: &Path, relative: &str, content: &str) -> PathBuf {
    let config_path = dir.join(relative);
    fs::create_dir_all(config_path.parent().unwrap()).unwrap();
    fs::write(&config_path, content).unwrap();
    config_path
}

// ============================================================================
// Parsing Tests
// ============================================================================

#[test]
fn test_parse_full_config() {
    let content = r#"
extends = "../base.toml"
files = ["src/main.kl", "src/util.kl"]
references = ["../core", { path = "../legacy/keel.toml", circular = true }]

[options]
out_dir = "out"
root_dir = "src"
composite = true
no_check = true
"#;
    let config = ProjectConfig::parse(content, Path::new("app/keel.toml")).unwrap();

    assert_eq!(config.extends, Some(PathBuf::from("../base.toml")));
    assert_eq!(config.files.as_ref().map(Vec::len), Some(2));
    assert_eq!(config.references[0], ReferenceSpec::Path(PathBuf::from("../core")));
    assert!(config.references[1].circular());
    assert_eq!(config.options.out_dir, Some(PathBuf::from("out")));
    assert_eq!(config.options.composite, Some(true));
    assert_eq!(config.options.incremental, None);
    assert_eq!(config.options.no_check, Some(true));
}

#[test]
fn test_empty_config_is_valid() {
    let config = ProjectConfig::parse("", Path::new("keel.toml")).unwrap();
    assert_eq!(config, ProjectConfig::default());
}

#[rstest]
#[case::unknown_top_level("name = \"app\"")]
#[case::unknown_option("[options]\nstrict = true")]
#[case::wrong_type("files = \"main.kl\"")]
fn test_rejects_malformed_config(#[case] content: &str) {
    let result = ProjectConfig::parse(content, Path::new("keel.toml"));
    assert!(matches!(result, Err(ConfigError::TomlParseError { .. })));
}

#[rstest]
#[case::extends("extends = \"\"", "extends")]
#[case::files("files = [\"\"]", "files")]
#[case::references("references = [\"\"]", "references")]
fn test_rejects_empty_paths(#[case] content: &str, #[case] expected: &str) {
    match ProjectConfig::parse(content, Path::new("keel.toml")) {
        Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected),
        other => panic!("Expected InvalidValue error, got {:?}", other),
    }
}

// ============================================================================
// Resolution Tests
// ============================================================================

#[test]
fn test_resolve_project_tree() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(
        temp_dir.path(),
        "core/keel.toml",
        "files = [\"lib.kl\"]\n[options]\ncomposite = true\nout_dir = \"out\"\n",
    );
    create_config_file(
        temp_dir.path(),
        "app/keel.toml",
        "files = [\"main.kl\"]\nreferences = [\"../core\"]\n",
    );
    let resolver = TomlConfigResolver::new();
    let app = ProjectId::from_config_path(temp_dir.path().join("app"));

    let resolution = resolver.resolve(&app);
    assert!(resolution.diagnostics.is_empty());
    let project = resolution.project.as_ref().unwrap();
    let core = &project.references[0].id;
    assert_eq!(core.path(), temp_dir.path().join("core/keel.toml"));

    let core_project = resolver.resolve(core).project.clone().unwrap();
    assert!(core_project.options.composite);
    assert_eq!(
        core_project.build_info_path(),
        temp_dir.path().join("core/out/keel.buildinfo")
    );
    assert_eq!(
        core_project.output_files(),
        vec![
            temp_dir.path().join("core/out/lib.out"),
            temp_dir.path().join("core/out/lib.decl"),
        ]
    );
}

#[test]
fn test_invalid_config_becomes_diagnostic() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "app/keel.toml", "files = [");
    let resolver = TomlConfigResolver::new();
    let id = ProjectId::from_config_path(temp_dir.path().join("app"));

    let resolution = resolver.resolve(&id);
    assert!(resolution.project.is_none());
    assert_eq!(resolution.diagnostics.len(), 1);
    assert!(resolution.diagnostics[0].is_error());
    assert!(resolution.diagnostics[0].message.contains("Invalid TOML"));
}

#[test]
fn test_explicit_config_file_name() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "app/release.toml", "files = [\"main.kl\"]");
    let resolver = TomlConfigResolver::new();
    let id = ProjectId::from_config_path(temp_dir.path().join("app/release.toml"));

    let project = resolver.resolve(&id).project.clone().unwrap();
    assert_eq!(
        project.build_info_path(),
        temp_dir.path().join("app/release.buildinfo")
    );
}

#[test]
fn test_extends_chain_nearest_first() {
    let temp_dir = TempDir::new().unwrap();
    let root = create_config_file(
        temp_dir.path(),
        "config/root.toml",
        "[options]\nno_check = true\nout_dir = \"../build\"\n",
    );
    let middle = create_config_file(
        temp_dir.path(),
        "config/middle.toml",
        "extends = \"root.toml\"\n[options]\nno_check = false\n",
    );
    create_config_file(
        temp_dir.path(),
        "app/keel.toml",
        "extends = \"../config/middle.toml\"\nfiles = [\"main.kl\"]\n",
    );
    let resolver = TomlConfigResolver::new();
    let id = ProjectId::from_config_path(temp_dir.path().join("app"));

    let project = resolver.load(&id).unwrap();
    assert_eq!(project.extended_configs, vec![middle, root]);
    assert!(!project.options.no_check);
    assert_eq!(
        project.options.out_dir,
        Some(temp_dir.path().join("config/../build"))
    );
}

#[test]
fn test_concurrent_resolution_shares_one_result() {
    let temp_dir = TempDir::new().unwrap();
    create_config_file(temp_dir.path(), "app/keel.toml", "files = [\"main.kl\"]");
    let resolver = Arc::new(TomlConfigResolver::new());
    let id = ProjectId::from_config_path(temp_dir.path().join("app"));

    let results: Vec<_> = (0..8)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            let id = id.clone();
            thread::spawn(move || resolver.resolve(&id))
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    for result in &results[1..] {
        assert!(Arc::ptr_eq(&results[0], result));
    }
    assert_eq!(resolver.cached_len(), 1);
}
