//! In-memory remote for tests and offline runs.
//!
//! Committed creations are appended to the stored task list, so a second
//! run against the same `MemoryRemote` sees the first run's tasks.

use serde_json::Value;

use super::{MutationSink, RemoteError, RemoteState, RemoteStateSource};
use crate::models::{NewTask, Record, RecordId, RecordKind};

#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    pub projects: Vec<Record>,
    pub tasks: Vec<Record>,

    /// Every `create` call received, committed or not
    pub created: Vec<NewTask>,

    /// Successful commits
    pub commits: usize,

    pub fail_fetch: bool,
    pub fail_create: bool,
    pub fail_commit: bool,

    pending: Vec<Record>,
    next_id: usize,
}

impl MemoryRemote {
    /// Build from raw sync-style JSON objects.
    pub fn from_values(projects: Vec<Value>, tasks: Vec<Value>) -> Self {
        Self {
            projects: projects
                .into_iter()
                .map(|v| Record::from_value(RecordKind::Project, v))
                .collect(),
            tasks: tasks
                .into_iter()
                .map(|v| Record::from_value(RecordKind::Task, v))
                .collect(),
            ..Default::default()
        }
    }

    /// Stored tasks (committed state) with the given content.
    pub fn tasks_named(&self, content: &str) -> Vec<&Record> {
        self.tasks.iter().filter(|t| t.content == content).collect()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl RemoteStateSource for MemoryRemote {
    fn fetch(&mut self) -> Result<RemoteState, RemoteError> {
        if self.fail_fetch {
            return Err(RemoteError::Unauthorized);
        }
        Ok(RemoteState {
            projects: self.projects.clone(),
            tasks: self.tasks.clone(),
        })
    }
}

impl MutationSink for MemoryRemote {
    fn create(&mut self, task: &NewTask) -> Result<Record, RemoteError> {
        if self.fail_create {
            return Err(RemoteError::Rejected {
                command: "item_add".to_string(),
                reason: format!("refusing to create {:?}", task.content),
            });
        }
        self.next_id += 1;
        let record = task
            .clone()
            .into_record(RecordId::new(format!("mem-{}", self.next_id)));
        self.created.push(task.clone());
        self.pending.push(record.clone());
        Ok(record)
    }

    fn commit(&mut self) -> Result<(), RemoteError> {
        if self.fail_commit {
            self.pending.clear();
            return Err(RemoteError::Http("HTTP 503: unavailable".to_string()));
        }
        self.tasks.append(&mut self.pending);
        self.commits += 1;
        Ok(())
    }
}
