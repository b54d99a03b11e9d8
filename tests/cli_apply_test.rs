//! Tests for `tplsync apply` and `tplsync tree` failure paths.
//!
//! Nothing here reaches the real service: runs either stop before any
//! request (no token) or point `--api-url` at a closed local port.

mod common;

use common::{TestEnv, UNREACHABLE_API};
use predicates::prelude::*;

#[test]
fn test_apply_without_token_fails() {
    let env = TestEnv::new();

    env.tplsync()
        .args(["apply"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API token"));
}

#[test]
fn test_tree_without_token_fails_human() {
    let env = TestEnv::new();

    env.tplsync()
        .args(["-H", "tree"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error: No API token"));
}

#[test]
fn test_apply_unreachable_service_fails() {
    let env = TestEnv::new();

    env.tplsync()
        .args(["--api-url", UNREACHABLE_API, "apply", "--token", "abc"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("\"error\""))
        .stderr(predicate::str::contains("Transport error"));
}

#[test]
fn test_dry_run_unreachable_service_fails() {
    let env = TestEnv::new();

    env.tplsync()
        .env("TODOIST_API_TOKEN", "abc")
        .args(["--api-url", UNREACHABLE_API, "apply", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Transport error"));
}

#[test]
fn test_api_url_from_config_file() {
    let env = TestEnv::new();
    std::fs::write(
        env.config_path(),
        format!("api-url \"{}\"\n", UNREACHABLE_API),
    )
    .unwrap();

    env.tplsync()
        .args(["tree", "-k", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Transport error"));
}

#[test]
fn test_help_lists_commands() {
    let env = TestEnv::new();

    env.tplsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("tree"))
        .stdout(predicate::str::contains("config"));
}
