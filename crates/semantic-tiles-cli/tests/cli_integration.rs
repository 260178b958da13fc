//! Integration tests for the tiles CLI.
//!
//! Run with: `cargo test --package semantic-tiles-cli --test cli_integration`

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

/// Helper to run the tiles CLI against the store in `dir`.
fn run_tiles(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tiles"))
        .current_dir(dir)
        .arg("--store")
        .arg(dir)
        .args(args)
        .env_remove("TILES_STORE_ROOT")
        .env_remove("TILES_WIDTH")
        .env_remove("TILES_HEIGHT")
        .env_remove("TILES_SEED")
        .env_remove("TILES_MAX_ITERATIONS")
        .output()
        .expect("Failed to execute tiles command")
}

/// Write a small catalog: three top-level domains and two children of "sci".
fn create_catalog(dir: &Path) {
    fs::create_dir_all(dir.join(".tiles")).unwrap();
    fs::write(
        dir.join(".tiles/catalog.json"),
        r#"{
  "version": 1,
  "domains": [
    {"id": "maths", "name": "Maths"},
    {"id": "sci", "name": "Science", "documents": [{"id": 7, "name": "intro.pdf"}]},
    {"id": "arts", "name": "Arts"},
    {"id": "phy", "name": "Physics", "parentId": "sci"},
    {"id": "bio", "name": "Biology", "parentId": "sci"}
  ],
  "distances": {
    "sci": {"phy,bio": 0.8}
  }
}"#,
    )
    .unwrap();
}

fn load_catalog(dir: &Path) -> Value {
    let json = fs::read_to_string(dir.join(".tiles/catalog.json")).unwrap();
    serde_json::from_str(&json).unwrap()
}

#[test]
fn test_render_json_and_persist() {
    let temp = TempDir::new().unwrap();
    create_catalog(temp.path());

    let output = run_tiles(temp.path(), &["render", "--format", "json"]);
    assert!(
        output.status.success(),
        "render failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let response: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(response["strategy"], "circular");
    assert_eq!(response["applied"], true);
    let tiles = response["frame"]["tiles"].as_array().unwrap();
    assert_eq!(tiles.len(), 3);
    assert_eq!(tiles[1]["documents"][0]["id"], "7");

    let catalog = load_catalog(temp.path());
    let domains = catalog["domains"].as_array().unwrap();
    for d in domains.iter().filter(|d| d["parentId"].is_null()) {
        assert!(d["x"].is_number(), "{} not positioned", d["id"]);
    }
    for d in domains.iter().filter(|d| !d["parentId"].is_null()) {
        assert!(d["x"].is_null());
    }
}

#[test]
fn test_render_second_run_reuses_positions() {
    let temp = TempDir::new().unwrap();
    create_catalog(temp.path());

    assert!(run_tiles(temp.path(), &["render"]).status.success());
    let output = run_tiles(temp.path(), &["render", "--format", "json"]);
    let response: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(response["strategy"], "reuse");
    assert_eq!(response["persist_queued"], false);
}

#[test]
fn test_render_child_level_text() {
    let temp = TempDir::new().unwrap();
    create_catalog(temp.path());

    let output = run_tiles(
        temp.path(),
        &["render", "--parent", "sci", "--width", "1000", "--height", "500", "--no-persist"],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Level sci: 2 tiles"), "stdout: {stdout}");
    assert!(stdout.contains("force-directed"));
    assert!(stdout.contains("Physics"));

    // --no-persist leaves the catalog untouched
    let catalog = load_catalog(temp.path());
    assert!(catalog["domains"][3]["x"].is_null());
}

#[test]
fn test_render_to_output_file() {
    let temp = TempDir::new().unwrap();
    create_catalog(temp.path());
    let out = temp.path().join("frame.json");

    let output = run_tiles(
        temp.path(),
        &["render", "--format", "json", "--output", out.to_str().unwrap()],
    );
    assert!(output.status.success());
    let frame: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(frame["frame"]["tiles"].as_array().unwrap().len(), 3);
}

#[test]
fn test_hit_reports_owner() {
    let temp = TempDir::new().unwrap();
    create_catalog(temp.path());

    // Circular layout puts the first domain at (640, 300).
    let output = run_tiles(temp.path(), &["hit", "700", "300"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "maths");

    let output = run_tiles(temp.path(), &["hit", "-5", "300"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "(none)");
}

#[test]
fn test_missing_store_fails() {
    let temp = TempDir::new().unwrap();
    let output = run_tiles(temp.path(), &["render"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No .tiles catalog"));
}

#[test]
fn test_config_commands() {
    let temp = TempDir::new().unwrap();
    let output = run_tiles(temp.path(), &["config", "show"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Store Root:"));
    assert!(stdout.contains(&temp.path().display().to_string()));

    let output = run_tiles(temp.path(), &["config", "path"]);
    assert!(output.status.success());
}
