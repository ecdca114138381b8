//! Integration tests for all CLI commands
//!
//! Tests each command with real invocations. HOME and the working directory
//! point at temporary directories so no real configuration is picked up.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a CLI command isolated from user and project config
fn cli(home: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_eml2pdf"));
    cmd.env("HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .current_dir(home.path());
    cmd
}

// ============ GENERAL ============

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Convert every .eml file in a directory into a PDF document.",
        ));
}

#[test]
fn test_short_help() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Convert a directory of EML messages to PDF"));
}

#[test]
fn test_version() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_convert_help() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .arg("convert")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("INPUT_DIR"))
        .stdout(predicate::str::contains("--page-size"));
}

#[test]
fn test_invalid_label_value() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["convert", ".", "--labels", "fr"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_quiet_and_verbose_conflict() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["-q", "-v", "convert", "."])
        .assert()
        .failure();
}

// ============ COMPLETION COMMAND TESTS ============

#[test]
fn test_completion_bash() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("eml2pdf"));
}

#[test]
fn test_completion_zsh() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["completion", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef eml2pdf"));
}

// ============ CONFIG COMMAND TESTS ============

#[test]
fn test_config_init_creates_project_file() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));

    let content = fs::read_to_string(home.path().join(".eml2pdf.toml")).unwrap();
    assert!(content.contains("[labels]"));
    assert!(content.contains("# size = \"a4\""));
}

#[test]
fn test_config_init_refuses_overwrite() {
    let home = TempDir::new().unwrap();
    fs::write(home.path().join(".eml2pdf.toml"), "[page]\n").unwrap();

    cli(&home)
        .args(["config", "init"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));

    cli(&home).args(["config", "init", "--force"]).assert().success();
    let content = fs::read_to_string(home.path().join(".eml2pdf.toml")).unwrap();
    assert!(content.contains("[output]"));
}

#[test]
fn test_config_init_global() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    cli(&home)
        .current_dir(work.path())
        .args(["config", "init", "--global"])
        .assert()
        .success();

    assert!(home.path().join(".eml2pdf.toml").exists());
    assert!(!work.path().join(".eml2pdf.toml").exists());
}

#[test]
fn test_config_show_merges_user_and_project() {
    let home = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    fs::write(
        home.path().join(".eml2pdf.toml"),
        "[page]\nsize = \"letter\"\nmargin_mm = 10.0\n",
    )
    .unwrap();
    fs::write(work.path().join(".eml2pdf.toml"), "[page]\nsize = \"a4\"\n").unwrap();

    cli(&home)
        .current_dir(work.path())
        .args(["config", "show", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"size\": \"a4\""))
        .stdout(predicate::str::contains("\"margin_mm\": 10.0"));
}

#[test]
fn test_config_show_toml() {
    let home = TempDir::new().unwrap();
    fs::write(
        home.path().join(".eml2pdf.toml"),
        "[labels]\npreset = \"ja\"\n",
    )
    .unwrap();

    cli(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("preset = \"ja\""));
}

#[test]
fn test_config_invalid_file_warns() {
    let home = TempDir::new().unwrap();
    fs::write(home.path().join(".eml2pdf.toml"), "[page]\nsize = \"a3\"\n").unwrap();

    cli(&home)
        .args(["config", "show"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Failed to parse config file"));
}

#[test]
fn test_config_path_all() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["config", "path", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("User:"))
        .stdout(predicate::str::contains("Project:"))
        .stdout(predicate::str::contains("not found"));
}

#[test]
fn test_config_path_default() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".eml2pdf.toml"));
}
