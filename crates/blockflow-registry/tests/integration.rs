//! Integration tests for loading description files from disk.

use std::fs;
use std::path::{Path, PathBuf};

use blockflow_core::{BlockKind, ParamType, PortDomain};
use blockflow_registry::{DefinitionErrorKind, DefinitionRegistry};
use tempfile::TempDir;

/// The block library shipped at the workspace root.
fn library_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../blocks")
}

const SINK: &str = r#"
id = "sink"
[[inputs]]
label = "in"
dtype = "float"
[templates]
ref = "sink()"
"#;

#[test]
fn test_bundled_library_loads_cleanly() {
    let mut registry = DefinitionRegistry::new();
    let report = registry.load_dir(library_dir());
    assert!(report.errors.is_empty(), "errors: {:?}", report.errors);
    assert_eq!(report.trees.len(), 1);
    assert_eq!(
        registry.all_ids(),
        vec![
            "add",
            "const_source",
            "fir_filter",
            "multiply_const",
            "parameter",
            "probe_signal",
            "sig_source",
            "sink",
            "variable",
        ]
    );

    let variable = registry.get("variable").unwrap();
    assert_eq!(variable.kind, BlockKind::Variable);
    assert!(variable.evaluatable);

    let sig = registry.get("sig_source").unwrap();
    let ty = sig.param("type").unwrap();
    assert_eq!(ty.dtype, ParamType::Enum);
    assert_eq!(ty.option("int").unwrap().attributes["ctype"], "int32_t");
    assert_eq!(sig.param("waveform").unwrap().default, "sine");
    assert_eq!(sig.category, vec!["Sources", "Waveform"]);
}

#[test]
fn test_bundled_library_categories() {
    let mut registry = DefinitionRegistry::new();
    registry.load_dir(library_dir());
    let tree = registry.categories();
    assert_eq!(
        tree.get(&["Sources"]).unwrap().blocks,
        vec!["const_source", "sig_source"]
    );
    assert_eq!(
        tree.get(&["Sources", "Waveform"]).unwrap().blocks,
        vec!["sig_source"]
    );
    assert_eq!(
        tree.get(&["Instrumentation"]).unwrap().blocks,
        vec!["probe_signal"]
    );
}

#[test]
fn test_load_dir_collects_errors_without_aborting() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("a_good.block.toml"), SINK).unwrap();
    fs::write(
        temp_dir.path().join("b_bad.block.toml"),
        "id = \"bad\"\n[[params]]\nid = \"t\"\ndtype = \"enum\"\n",
    )
    .unwrap();
    fs::write(temp_dir.path().join("c_broken.block.toml"), "id = ").unwrap();
    fs::write(temp_dir.path().join("ignored.toml"), "garbage").unwrap();

    let mut registry = DefinitionRegistry::new();
    let report = registry.load_dir(temp_dir.path());

    assert_eq!(report.loaded, vec!["sink"]);
    assert_eq!(report.errors.len(), 2);
    assert!(matches!(
        report.errors[0].kind,
        DefinitionErrorKind::NoOptions { .. }
    ));
    assert!(report.errors[0].file.ends_with("b_bad.block.toml"));
    assert!(matches!(
        report.errors[1].kind,
        DefinitionErrorKind::Syntax { .. }
    ));
    assert_eq!(registry.all_ids(), vec!["sink"]);
}

#[test]
fn test_duplicate_id_across_files() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("one.block.toml"), SINK).unwrap();
    fs::write(temp_dir.path().join("two.block.toml"), SINK).unwrap();

    let mut registry = DefinitionRegistry::new();
    let report = registry.load_dir(temp_dir.path());
    assert_eq!(report.loaded, vec!["sink"]);
    assert_eq!(report.errors.len(), 1);
    assert!(matches!(
        report.errors[0].kind,
        DefinitionErrorKind::DuplicateBlockId { .. }
    ));
    assert!(
        registry
            .source("sink")
            .unwrap()
            .ends_with("one.block.toml")
    );
}

#[test]
fn test_reloading_a_file_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("sink.block.toml");
    fs::write(&path, SINK).unwrap();

    let mut registry = DefinitionRegistry::new();
    registry.load(&path).unwrap();
    registry.load(&path).unwrap();
    assert_eq!(registry.len(), 1);

    fs::write(&path, SINK.replace("dtype = \"float\"", "dtype = \"int\"")).unwrap();
    let reloaded = registry.load(&path).unwrap();
    assert_eq!(reloaded.inputs[0].dtype, "int");
    assert_eq!(registry.get("sink").unwrap().inputs[0].dtype, "int");
}

#[test]
fn test_load_missing_file() {
    let mut registry = DefinitionRegistry::new();
    let err = registry.load("/nonexistent/path/12345.block.toml").unwrap_err();
    assert!(matches!(err.kind, DefinitionErrorKind::Read(_)));
    assert!(err.to_string().contains("failed to read file"));
}

#[test]
fn test_search_path_skips_missing_dirs() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("sink.block.toml"), SINK).unwrap();

    let mut registry = DefinitionRegistry::new();
    let report = registry.load_search_path(&[
        PathBuf::from("/nonexistent/path/12345"),
        temp_dir.path().to_path_buf(),
    ]);
    assert_eq!(report.loaded, vec!["sink"]);
    assert!(report.errors.is_empty());
}

#[test]
fn test_message_ports_default_optional() {
    let mut registry = DefinitionRegistry::new();
    let def = registry
        .load_str(
            "msg.block.toml",
            "id = \"msg\"\n[[inputs]]\nlabel = \"cmd\"\ndomain = \"message\"\n",
        )
        .unwrap();
    assert_eq!(def.inputs[0].domain, PortDomain::Message);
    assert_eq!(def.inputs[0].dtype, "message");
    assert!(def.inputs[0].optional);
}
