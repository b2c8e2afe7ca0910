// Regression tests for the CLI surface.
// Requires: assert_cmd, predicates, tempfile crates in [dev-dependencies]

use std::fs;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};

fn polyblocks() -> Command {
    Command::cargo_bin("polyblocks").unwrap()
}

#[test]
fn list_prints_the_registered_block_types() {
    polyblocks()
        .arg("--list")
        .assert()
        .success()
        .stdout(contains("@embed").and(contains("@title")).and(contains("@shader")));
}

#[test]
fn xml_output_for_a_native_document() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("doc.block");
    fs::write(&doc, "@title Hello\n@text\n\tSome prose.\n").unwrap();

    polyblocks()
        .arg(&doc)
        .arg("--cache-dir")
        .arg(dir.path().join("cache"))
        .assert()
        .success()
        .stdout(
            contains("<block>")
                .and(contains("<title>Hello</title>"))
                .and(contains("Some prose.")),
        );
}

#[test]
fn json_output_is_valid_json() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("doc.block");
    fs::write(&doc, "@tags alpha Beta\n").unwrap();

    let output = polyblocks()
        .arg(&doc)
        .args(["-O", "json"])
        .arg("--cache-dir")
        .arg(dir.path().join("cache"))
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(parsed.is_array());
}

#[test]
fn embedded_source_is_rewritten_before_parsing() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("script.py");
    fs::write(&doc, "# @title Embedded\nprint('hi')\n").unwrap();

    polyblocks()
        .arg(&doc)
        .arg("--cache-dir")
        .arg(dir.path().join("cache"))
        .assert()
        .success()
        .stdout(contains("<title>Embedded</title>").and(contains("print('hi')")));
}

#[test]
fn unknown_block_type_fails_with_a_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("doc.block");
    fs::write(&doc, "@nonsense data\n").unwrap();

    polyblocks()
        .arg(&doc)
        .arg("--cache-dir")
        .arg(dir.path().join("cache"))
        .assert()
        .failure()
        .stderr(contains("unknown block type").and(contains("@nonsense")));
}

#[test]
fn clean_cache_reports_removed_entries() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("cache");
    let doc = dir.path().join("doc.block");
    fs::write(&doc, "@text\n\tcached body\n").unwrap();

    polyblocks()
        .arg(&doc)
        .arg("--cache-dir")
        .arg(&cache_dir)
        .assert()
        .success();

    polyblocks()
        .arg("--clean-cache")
        .arg("--cache-dir")
        .arg(&cache_dir)
        .assert()
        .success()
        .stderr(contains("removed 1 entries"));
}
