//! CLI integration tests for sqlite-pg-migrate.
//!
//! These tests verify configuration loading and exit codes for failures
//! that happen before any PostgreSQL connection is attempted.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::TempDir;

/// Get a command for the sqlite-pg-migrate binary with a clean
/// environment, run from an empty directory so no `.env` is picked up.
fn cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sqlite-pg-migrate").unwrap();
    cmd.env_clear().current_dir(dir.path());
    cmd
}

fn with_database_env(cmd: &mut Command, sqlite_path: &str) {
    cmd.env("DB_NAME", "movies_database")
        .env("DB_USER", "app")
        .env("DB_PASSWORD", "123qwe")
        .env("DB_HOST", "127.0.0.1")
        .env("SQLITE_PATH", sqlite_path);
}

// =============================================================================
// Configuration Errors (exit code 1)
// =============================================================================

#[test]
fn test_missing_environment_exits_with_config_error() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("SQLITE_PATH must be set"));
}

#[test]
fn test_invalid_port_exits_with_config_error() {
    let dir = TempDir::new().unwrap();
    let mut cmd = cmd(&dir);
    with_database_env(&mut cmd, "db.sqlite");
    cmd.env("DB_PORT", "fifty-four-thirty-two")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("DB_PORT"));
}

#[test]
fn test_zero_chunk_size_exits_with_config_error() {
    let dir = TempDir::new().unwrap();
    let mut cmd = cmd(&dir);
    with_database_env(&mut cmd, "db.sqlite");
    cmd.env("LOAD_CHUNK_SIZE", "0")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("load_chunk_size"));
}

#[test]
fn test_invalid_yaml_config_exits_with_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "source: [unclosed").unwrap();

    cmd(&dir)
        .env("MIGRATE_CONFIG", &path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("YAML error"));
}

// =============================================================================
// I/O Errors (exit code 7)
// =============================================================================

#[test]
fn test_missing_config_file_exits_with_io_error() {
    let dir = TempDir::new().unwrap();
    cmd(&dir)
        .env("MIGRATE_CONFIG", dir.path().join("absent.yaml"))
        .assert()
        .code(7)
        .stderr(predicate::str::contains("IO error"));
}

// =============================================================================
// Source Errors (exit code 2)
// =============================================================================

#[test]
fn test_missing_sqlite_file_exits_with_source_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("db.sqlite");
    let mut cmd = cmd(&dir);
    with_database_env(&mut cmd, missing.to_str().unwrap());
    cmd.env("LOG_LEVEL", "error")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Source database error"));
    assert!(!missing.exists());
}

#[test]
fn test_yaml_config_with_missing_sqlite_file_exits_with_source_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(
        &path,
        format!(
            "source:\n  path: {}\ntarget:\n  database: movies_database\n  user: app\nlogging:\n  level: warn\n",
            dir.path().join("absent.sqlite").display()
        ),
    )
    .unwrap();

    cmd(&dir)
        .env("MIGRATE_CONFIG", &path)
        .assert()
        .code(2);
}
