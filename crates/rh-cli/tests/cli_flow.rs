//! End-to-end tests of the one-shot subcommands against a SQLite file.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn rh_binary() -> String {
    env!("CARGO_BIN_EXE_rh").to_string()
}

/// Runs `rh` with a private home and database under `temp`.
fn rh(temp: &Path, args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut command = Command::new(rh_binary());
    command
        .env("HOME", temp)
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("XDG_DATA_HOME")
        .env_remove("XDG_STATE_HOME")
        .env("RH_DATABASE_PATH", temp.join("data").join("rh.db"))
        .args(args);
    for (key, value) in env {
        command.env(key, value);
    }
    command.output().expect("failed to run rh")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "rh should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn catalog_add_then_list() {
    let temp = TempDir::new().unwrap();

    let added = stdout(&rh(
        temp.path(),
        &["catalog", "add", "Scales", "--tag", "warmup"],
        &[],
    ));
    assert!(added.starts_with("Added 'Scales' ("));
    stdout(&rh(
        temp.path(),
        &["catalog", "add", "Etude", "--category", "Repertoire"],
        &[],
    ));

    let listed = stdout(&rh(temp.path(), &["catalog", "list", "--json"], &[]));
    let items: serde_json::Value = serde_json::from_str(&listed).unwrap();
    let names: Vec<&str> = items
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Etude", "Scales"]);
    assert_eq!(items[1]["tags"][0], "warmup");

    let table = stdout(&rh(temp.path(), &["catalog", "list"], &[]));
    assert!(table.starts_with("CATALOG (2 items)"));
}

#[test]
fn empty_database_has_no_sessions() {
    let temp = TempDir::new().unwrap();
    let output = stdout(&rh(temp.path(), &["sessions"], &[]));
    assert!(output.starts_with("No sessions yet."));
    assert!(temp.path().join("data").join("rh.db").exists());
}

#[test]
fn show_unknown_session_fails() {
    let temp = TempDir::new().unwrap();
    let output = rh(temp.path(), &["show", "missing"], &[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("session not found: missing"));
}

#[test]
fn catalog_add_requires_sqlite() {
    let temp = TempDir::new().unwrap();
    let output = rh(
        temp.path(),
        &["catalog", "add", "Scales"],
        &[
            ("RH_BACKEND", "remote"),
            ("RH_API_URL", "https://api.example.com"),
            ("RH_API_TOKEN", "token"),
        ],
    );
    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr)
            .contains("catalog add is only supported with the sqlite backend")
    );
}

#[test]
fn invalid_configuration_is_rejected() {
    let temp = TempDir::new().unwrap();
    let output = rh(temp.path(), &["sessions"], &[("RH_DEFAULT_MINUTES", "0")]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid configuration"));
}
