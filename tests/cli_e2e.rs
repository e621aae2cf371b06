//! End-to-end CLI tests for the response-mapper binary.

// `Command::cargo_bin` is deprecated in assert_cmd >=2.0.17 in favor of
// `cargo::cargo_bin_cmd!` macro. Suppressed until migration to the new API.
#![allow(deprecated)]

mod support;
use support::socket_guard::start_mock_server_or_skip;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn mapper_cmd(config_home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("response-mapper").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home).env_remove("RUST_LOG");
    cmd
}

fn write_mapper_config(config_home: &std::path::Path, contents: &str) {
    let config_dir = config_home.join("response-mapper");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), contents).unwrap();
}

fn toml_path(path: &std::path::Path) -> String {
    path.to_string_lossy().replace('\\', "\\\\")
}

#[test]
fn test_binary_help_shows_usage() {
    let mut cmd = Command::cargo_bin("response-mapper").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("--max-in-memory"))
        .stdout(predicate::str::contains("--spool-dir"));
}

#[test]
fn test_binary_version_shows_version() {
    let mut cmd = Command::cargo_bin("response-mapper").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_binary_invalid_flag_fails() {
    let mut cmd = Command::cargo_bin("response-mapper").unwrap();
    cmd.arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_missing_url_fails() {
    let mut cmd = Command::cargo_bin("response-mapper").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("<URL>"));
}

#[test]
fn test_binary_invalid_url_fails_with_message() {
    let tempdir = TempDir::new().unwrap();
    mapper_cmd(tempdir.path())
        .arg("not a url")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid URL"));
}

#[test]
fn test_binary_unknown_config_key_fails() {
    let tempdir = TempDir::new().unwrap();
    write_mapper_config(tempdir.path(), "concurrency = 4\n");
    mapper_cmd(tempdir.path())
        .arg("http://127.0.0.1:9/")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_binary_missing_explicit_config_fails() {
    let tempdir = TempDir::new().unwrap();
    mapper_cmd(tempdir.path())
        .arg("--config")
        .arg(tempdir.path().join("absent.toml"))
        .arg("http://127.0.0.1:9/")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[tokio::test]
async fn test_binary_prints_descriptor_json() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"hi there".to_vec(), "text/plain"))
        .mount(&mock_server)
        .await;

    let tempdir = TempDir::new().unwrap();
    let assert = mapper_cmd(tempdir.path())
        .arg("-q")
        .arg(format!("{}/hello", mock_server.uri()))
        .assert()
        .success();

    let json: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(json["status"], 200);
    assert_eq!(json["body"], "hi there");
    assert_eq!(json["contentType"], "text/plain");
    assert_eq!(json["bodyStream"]["storage"], "memory");
}

#[tokio::test]
async fn test_binary_compact_output_is_single_line() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let tempdir = TempDir::new().unwrap();
    let assert = mapper_cmd(tempdir.path())
        .arg("-q")
        .arg("--compact")
        .arg(format!("{}/c", mock_server.uri()))
        .assert()
        .success();

    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    assert_eq!(stdout.trim_end().lines().count(), 1);
    assert!(stdout.contains("\"status\":204"));
}

#[tokio::test]
async fn test_binary_spools_writes_output_and_cleans_up() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    let payload: Vec<u8> = (0..64 * 1024).map(|i| (i % 253) as u8).collect();
    Mock::given(method("GET"))
        .and(path("/blob"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(payload.clone(), "application/octet-stream"),
        )
        .mount(&mock_server)
        .await;

    let tempdir = TempDir::new().unwrap();
    let spool_dir = tempdir.path().join("spool");
    std::fs::create_dir_all(&spool_dir).unwrap();
    let output = tempdir.path().join("blob.bin");

    let assert = mapper_cmd(tempdir.path())
        .arg("-q")
        .arg("--max-in-memory")
        .arg("1024")
        .arg("--spool-dir")
        .arg(&spool_dir)
        .arg("-o")
        .arg(&output)
        .arg(format!("{}/blob", mock_server.uri()))
        .assert()
        .success();

    let json: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(json["bodyStream"]["storage"], "file");
    assert_eq!(json["bodyStream"]["size"], payload.len());
    assert!(json["body"].is_null());

    assert_eq!(std::fs::read(&output).unwrap(), payload);
    let leftovers = std::fs::read_dir(&spool_dir).unwrap().count();
    assert_eq!(leftovers, 0, "spool files must be removed on exit");
}

#[tokio::test]
async fn test_binary_reads_spool_settings_from_config_file() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/cfg"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"0123456789".to_vec(), "text/plain"))
        .mount(&mock_server)
        .await;

    let tempdir = TempDir::new().unwrap();
    let spool_dir = tempdir.path().join("cfg-spool");
    std::fs::create_dir_all(&spool_dir).unwrap();
    write_mapper_config(
        tempdir.path(),
        &format!(
            "max_in_memory_body_bytes = 4\nspool_dir = \"{}\"\n",
            toml_path(&spool_dir)
        ),
    );

    let assert = mapper_cmd(tempdir.path())
        .arg("-q")
        .arg(format!("{}/cfg", mock_server.uri()))
        .assert()
        .success();

    let json: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
    assert_eq!(json["bodyStream"]["storage"], "file");
    assert!(
        json["bodyStream"]["path"]
            .as_str()
            .unwrap()
            .starts_with(&*spool_dir.to_string_lossy())
    );
    assert_eq!(json["body"], "0123456789");
}
