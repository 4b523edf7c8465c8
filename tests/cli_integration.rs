//! End-to-end tests for the `escript` command-line tool.

mod common;

use common::run_escript;

#[test]
fn test_pack_demo_then_inspect() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let written = run_escript(dir.path(), &["pack-demo", "demo.bin"]);
    assert!(written.success, "pack-demo failed: {}", written.stderr);
    assert!(dir.path().join("demo.bin").exists());

    let inspected = run_escript(dir.path(), &["inspect", "demo.bin"]);
    assert!(inspected.success, "inspect failed: {}", inspected.stderr);
    assert_eq!(
        inspected.stdout.trim(),
        r#"demo.bin: Struct struct{ name = "longsword", damage = 12, weight = 4.5, tags = { "weapon", "melee" } }"#
    );
}

#[test]
fn test_inspect_reports_bad_files() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("truncated.bin"), [3u8, 1, 0]).expect("Failed to write file");

    let run = run_escript(dir.path(), &["inspect", "truncated.bin", "missing.bin"]);
    assert!(!run.success);
    assert!(run.stderr.contains("truncated.bin: Unexpected end of input"));
    assert!(run.stderr.contains("Unable to open 'missing.bin' for reading"));
}

#[test]
fn test_config_file_as_json() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::write(
        dir.path().join("ecompile.cfg"),
        "ModuleDirectory scripts/modules\nPolScriptRoot scripts\nDisplayWarnings yes\n",
    )
    .expect("Failed to write config");

    let run = run_escript(dir.path(), &["config", "ecompile.cfg", "--json"]);
    assert!(run.success, "config failed: {}", run.stderr);

    let json: serde_json::Value = serde_json::from_str(&run.stdout).expect("Invalid JSON");
    assert_eq!(json["ModuleDirectory"], "scripts/modules/");
    assert_eq!(json["PolScriptRoot"], "scripts/");
    assert_eq!(json["DisplayWarnings"], true);
    assert_eq!(json["IncludeDirectory"], "");
}

#[test]
fn test_config_defaults_use_working_directory() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let run = run_escript(dir.path(), &["config"]);
    assert!(run.success, "config failed: {}", run.stderr);
    assert!(run.stdout.contains("DisplayUpToDateScripts 1"));
    assert!(
        run.stdout
            .lines()
            .any(|line| line.starts_with("ModuleDirectory ") && line.ends_with('/'))
    );
}

#[test]
fn test_config_missing_required_property() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("ecompile.cfg"), "ModuleDirectory m\n")
        .expect("Failed to write config");

    let run = run_escript(dir.path(), &["config", "ecompile.cfg"]);
    assert!(!run.success);
    assert!(run.stderr.contains("property 'PolScriptRoot' is required"));
}
