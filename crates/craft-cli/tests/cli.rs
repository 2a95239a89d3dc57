//! Tests for the `craft` binary.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// A `craft` command isolated from the caller's environment and config.
fn craft(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("craft").expect("binary is built");
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join(".config"))
        .env_remove("CRAFT_CONFIG")
        .env_remove("CRAFT_ENDPOINT")
        .env_remove("CRAFT_CLUSTER")
        .env_remove("RUST_LOG")
        .args(["--offline", "--no-color"]);
    cmd
}

#[test]
fn exec_cluster_list_marks_current() {
    let home = TempDir::new().expect("tempdir");
    craft(&home)
        .args(["exec", "cluster", "list"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?m)^\*\s+minecraft").expect("regex"));
}

#[test]
fn exec_missing_argument_fails() {
    let home = TempDir::new().expect("tempdir");
    craft(&home)
        .args(["exec", "server", "launch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Error - command error: required argument 'user' not provided for 'server launch'",
        ));
}

#[test]
fn exec_unknown_command_fails() {
    let home = TempDir::new().expect("tempdir");
    craft(&home)
        .args(["exec", "lunch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected 'lunch'"));
}

#[test]
fn exec_launch_in_named_cluster() {
    let home = TempDir::new().expect("tempdir");
    craft(&home)
        .args(["exec", "server", "launch", "steve", "world", "minecraft"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Launched server world for steve in cluster minecraft",
        ));
}

#[test]
fn exec_exit_prints_report() {
    let home = TempDir::new().expect("tempdir");
    craft(&home)
        .args(["exec", "exit"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Session ended"));
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().expect("tempdir");
    craft(&home)
        .args(["exec", "help", "server"])
        .assert()
        .success()
        .stdout(predicate::str::contains("server launch <user> <server-name>"));
}

#[test]
fn config_file_sets_clusters() {
    let home = TempDir::new().expect("tempdir");
    let path = home.path().join("craft.toml");
    fs::write(
        &path,
        r#"
default_cluster = "lobby"

[fleet]
seed_clusters = ["lobby", "survival"]
"#,
    )
    .expect("write config");

    craft(&home)
        .arg("--config")
        .arg(&path)
        .args(["exec", "cluster", "list"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"(?m)^\*\s+lobby").expect("regex"))
        .stdout(predicate::str::contains("survival"));
}

#[test]
fn default_config_location_is_read() {
    let home = TempDir::new().expect("tempdir");
    let dir = home.path().join(".config").join("craft");
    fs::create_dir_all(&dir).expect("config dir");
    fs::write(
        dir.join("config.toml"),
        "default_cluster = \"hub\"\n[fleet]\nseed_clusters = [\"hub\"]\n",
    )
    .expect("write config");

    craft(&home)
        .args(["exec", "cluster", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cluster hub"));
}

#[test]
fn invalid_config_is_reported() {
    let home = TempDir::new().expect("tempdir");
    let path = home.path().join("bad.toml");
    fs::write(&path, "[fleet]\ncall_timeout_secs = 0\n").expect("write config");

    craft(&home)
        .arg("--config")
        .arg(&path)
        .args(["exec", "cluster", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration error"));
}

#[test]
fn missing_explicit_config_is_an_error() {
    let home = TempDir::new().expect("tempdir");
    craft(&home)
        .args(["--config", "/nonexistent/craft.toml", "exec", "dns"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read config file"));
}
