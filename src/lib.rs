//! tplsync - replicate template task trees across Todoist projects.
//!
//! This library provides the core functionality for the `tplsync` CLI tool:
//! rebuilding project and task trees from flat sync records, locating
//! "Task Templates" projects, and idempotently copying their subtask
//! structure onto the matching tasks of the parent project.

pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod models;
pub mod remote;
pub mod render;

pub use remote::RemoteError;

/// Test utilities for isolated config directories.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::Path;
    use tempfile::TempDir;

    use crate::config::ConfigStore;

    /// Test environment with an isolated config directory.
    pub struct TestEnv {
        pub config_dir: TempDir,
    }

    impl TestEnv {
        pub fn new() -> Self {
            Self {
                config_dir: TempDir::new().unwrap(),
            }
        }

        pub fn path(&self) -> &Path {
            self.config_dir.path()
        }

        /// Config store rooted in this environment (DI, no env vars).
        pub fn store(&self) -> ConfigStore {
            ConfigStore::at(self.path())
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Library-level error type for tplsync operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Kdl(#[from] kdl::KdlError),

    #[error("Remote service error: {0}")]
    Remote(#[from] RemoteError),

    #[error(
        "No API token: pass --token, set TODOIST_API_TOKEN, or run `tplsync config set-token`"
    )]
    MissingToken,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0} malformed record(s) found")]
    MalformedRecords(usize),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for tplsync operations.
pub type Result<T> = std::result::Result<T, Error>;
