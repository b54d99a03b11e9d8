//! Remote task-service boundary.
//!
//! The engine only talks to the service through two traits:
//! - [`RemoteStateSource`] - fetch the full project and task collections
//! - [`MutationSink`] - queue task creations and commit them as one batch
//!
//! [`todoist::SyncClient`] implements both over the Todoist Sync API;
//! [`memory::MemoryRemote`] implements both in memory for tests.

pub mod memory;
pub mod todoist;

use thiserror::Error;

use crate::models::{NewTask, Record};

pub use memory::MemoryRemote;
pub use todoist::SyncClient;

/// Errors from fetch, create, or commit. Never retried.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Token is invalid or expired (401 Unauthorized)
    #[error("Invalid or expired token: service returned 401 Unauthorized")]
    Unauthorized,

    /// Token lacks required permissions (403 Forbidden)
    #[error("Token lacks required permissions: service returned 403 Forbidden")]
    Forbidden,

    /// Non-success HTTP status
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Connection-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Failed to parse response
    #[error("Failed to parse service response: {0}")]
    Parse(String),

    /// The service refused one queued command
    #[error("Command {command} rejected: {reason}")]
    Rejected { command: String, reason: String },
}

/// Full current state as flat record collections.
#[derive(Debug, Clone, Default)]
pub struct RemoteState {
    pub projects: Vec<Record>,
    pub tasks: Vec<Record>,
}

/// Source of the project/task snapshot a run works against.
pub trait RemoteStateSource {
    fn fetch(&mut self) -> Result<RemoteState, RemoteError>;
}

/// Destination for task creations.
///
/// `create` queues one task and returns its record with an assigned id;
/// later creations may use that id as `parent_id`. Nothing is visible
/// remotely until `commit` succeeds.
pub trait MutationSink {
    fn create(&mut self, task: &NewTask) -> Result<Record, RemoteError>;

    fn commit(&mut self) -> Result<(), RemoteError>;
}
