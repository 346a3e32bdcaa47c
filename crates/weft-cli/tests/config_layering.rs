//! Configuration layers seen through the `weft` binary.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap_or_else(|err| panic!("write {name}: {err}"));
    path
}

fn tempdir() -> TempDir {
    TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"))
}

#[test]
fn environment_selects_human_output() {
    let dir = tempdir();
    let source = write(dir.path(), "page.html", "<!-- a -->");
    let mut command = cargo_bin_cmd!("weft");
    command.env("WEFT_OUTPUT", "human").arg("brackets").arg(&source);
    command
        .assert()
        .success()
        .stdout(contains("<!-- .. 1:8 -->").and(contains("\"pairs\"").not()));
}

#[test]
fn config_path_file_is_loaded() {
    let dir = tempdir();
    let config = write(dir.path(), "weft.toml", "output = \"human\"\n");
    let source = write(dir.path(), "page.html", "<!-- a -->");
    let mut command = cargo_bin_cmd!("weft");
    command
        .arg("--config-path")
        .arg(&config)
        .arg("brackets")
        .arg(&source);
    command.assert().success().stdout(contains("<!-- .. 1:8 -->"));
}

#[test]
fn flags_beat_the_environment() {
    let dir = tempdir();
    let source = write(dir.path(), "page.html", "<!-- a -->");
    let mut command = cargo_bin_cmd!("weft");
    command
        .env("WEFT_OUTPUT", "human")
        .args(["--output", "json", "brackets"])
        .arg(&source);
    command.assert().success().stdout(contains("\"pairs\""));
}

#[test]
fn malformed_files_fail_to_load() {
    let dir = tempdir();
    let config = write(dir.path(), "weft.toml", "max_matches = \"many\"\n");
    let source = write(dir.path(), "page.html", "<!-- a -->");
    let mut command = cargo_bin_cmd!("weft");
    command
        .arg("--config-path")
        .arg(&config)
        .arg("brackets")
        .arg(&source);
    command
        .assert()
        .code(1)
        .stderr(contains("failed to load configuration"));
}
