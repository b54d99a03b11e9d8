//! The set of creations produced by one run.
//!
//! In live mode each creation goes straight to the [`MutationSink`] and a
//! single commit is issued by [`MutationBatch::finish`]. In dry-run mode
//! creations get a locally fabricated id so replication can keep descending,
//! and nothing is committed.

use crate::models::{NewTask, Record, RecordId};
use crate::remote::{MutationSink, RemoteError};

/// Prefix of ids fabricated in dry-run mode
pub const DRY_RUN_ID_PREFIX: &str = "dry-run-";

/// Result of [`MutationBatch::finish`].
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub operations: Vec<NewTask>,
    pub committed: bool,
}

pub struct MutationBatch<'a> {
    sink: Option<&'a mut dyn MutationSink>,
    operations: Vec<NewTask>,
}

impl<'a> MutationBatch<'a> {
    pub fn live(sink: &'a mut dyn MutationSink) -> Self {
        Self {
            sink: Some(sink),
            operations: Vec::new(),
        }
    }

    pub fn dry_run() -> Self {
        Self {
            sink: None,
            operations: Vec::new(),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.sink.is_none()
    }

    /// Creations requested so far, in order.
    pub fn operations(&self) -> &[NewTask] {
        &self.operations
    }

    /// Queue one task and return its record with an assigned id.
    pub fn create(&mut self, task: NewTask) -> Result<Record, RemoteError> {
        let record = match self.sink {
            Some(ref mut sink) => sink.create(&task)?,
            None => {
                let id = format!("{}{}", DRY_RUN_ID_PREFIX, self.operations.len() + 1);
                task.clone().into_record(RecordId::new(id))
            }
        };
        self.operations.push(task);
        Ok(record)
    }

    /// Commit in live mode; a dry run just hands back the operations.
    pub fn finish(self) -> Result<BatchOutcome, RemoteError> {
        let committed = match self.sink {
            Some(sink) => {
                sink.commit()?;
                true
            }
            None => false,
        };
        Ok(BatchOutcome {
            operations: self.operations,
            committed,
        })
    }
}
