//! Common test utilities for tplsync integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch the
//! user's `~/.config/tplsync/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// Address nothing listens on; requests fail at connect time.
pub const UNREACHABLE_API: &str = "http://127.0.0.1:9";

/// A test environment with an isolated config directory.
///
/// The `tplsync()` method returns a `Command` that sets `TPLSYNC_CONFIG_DIR`
/// per-invocation and clears any ambient token, making tests parallel-safe.
pub struct TestEnv {
    pub config_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the tplsync binary with isolated config directory.
    pub fn tplsync(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tplsync"));
        cmd.env("TPLSYNC_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("TODOIST_API_TOKEN");
        cmd.env_remove("TPLSYNC_LOG");
        cmd
    }

    pub fn path(&self) -> &std::path::Path {
        self.config_dir.path()
    }

    pub fn config_path(&self) -> std::path::PathBuf {
        self.path().join("config.kdl")
    }

    pub fn state_path(&self) -> std::path::PathBuf {
        self.path().join("state.kdl")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
