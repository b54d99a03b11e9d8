//! Template propagation pipeline.
//!
//! One run goes: fetch → build project and task forests → bind tasks to
//! projects → locate template pairs → replicate → commit.
//!
//! Every decision is made against the single snapshot fetched at the start.
//! Remote state only changes through the [`MutationBatch`], and only when it
//! is committed at the end of a live run.

pub mod batch;
pub mod binder;
pub mod locator;
pub mod replicator;

use serde::Serialize;

use crate::models::{BadRecord, Forest, IntegrityWarning, NewTask, RecordKind};
use crate::remote::{MutationSink, RemoteError, RemoteState, RemoteStateSource};

pub use batch::{BatchOutcome, MutationBatch};
pub use binder::Binding;
pub use locator::{PairSummary, TEMPLATE_PROJECT_NAME, TemplatePair, find_template_pairs};
pub use replicator::{Outcome, Replication, replicate};

/// Project and task forests for one snapshot.
#[derive(Debug, Clone)]
pub struct StateTree {
    pub projects: Forest,
    pub tasks: Forest,
    pub binding: Binding,
}

impl StateTree {
    pub fn build(state: RemoteState) -> Self {
        let projects = Forest::build(RecordKind::Project, state.projects);
        let tasks = Forest::build(RecordKind::Task, state.tasks);
        let binding = Binding::bind(&projects, &tasks);
        Self {
            projects,
            tasks,
            binding,
        }
    }

    /// Records kept out of either forest, projects first.
    pub fn bad_records(&self) -> Vec<BadRecord> {
        self.projects
            .bad_records()
            .iter()
            .chain(self.tasks.bad_records())
            .cloned()
            .collect()
    }

    pub fn warnings(&self) -> Vec<IntegrityWarning> {
        self.projects
            .warnings()
            .iter()
            .chain(self.tasks.warnings())
            .chain(self.binding.warnings())
            .cloned()
            .collect()
    }
}

/// Settings for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Name identifying template projects
    pub template_name: String,
    /// Compute creations without touching remote state
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            template_name: TEMPLATE_PROJECT_NAME.to_string(),
            dry_run: false,
        }
    }
}

/// Everything a run decided and did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub dry_run: bool,
    pub committed: bool,
    pub pairs: Vec<PairSummary>,
    pub replications: Vec<Replication>,
    pub operations: Vec<NewTask>,
    pub bad_records: Vec<BadRecord>,
    pub warnings: Vec<IntegrityWarning>,
}

impl RunReport {
    /// Number of tasks created (or that would be created in a dry run).
    pub fn created(&self) -> usize {
        self.operations.len()
    }

    pub fn has_bad_records(&self) -> bool {
        !self.bad_records.is_empty()
    }
}

/// Run the whole pipeline against one remote.
///
/// Remote failures abort immediately and are returned unchanged. Bad records
/// and integrity warnings never abort; they are returned in the report.
pub fn run<R>(remote: &mut R, options: &RunOptions) -> Result<RunReport, RemoteError>
where
    R: RemoteStateSource + MutationSink,
{
    let state = remote.fetch()?;
    tracing::info!(
        projects = state.projects.len(),
        tasks = state.tasks.len(),
        "fetched remote state"
    );

    let mut tree = StateTree::build(state);
    let bad_records = tree.bad_records();
    for bad in &bad_records {
        tracing::warn!(kind = %bad.kind, issue = %bad.issue, "bad record");
    }
    let warnings = tree.warnings();
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    let pairs = find_template_pairs(&tree, &options.template_name);
    let summaries = pairs.iter().map(|p| p.summary(&tree)).collect();
    tracing::info!(pairs = pairs.len(), "located template pairs");

    let mut batch = if options.dry_run {
        tracing::warn!("dry run: no changes will be committed");
        MutationBatch::dry_run()
    } else {
        MutationBatch::live(remote)
    };
    let replications = replicate(&mut tree.tasks, &tree.projects, &pairs, &mut batch)?;
    let outcome = batch.finish()?;

    Ok(RunReport {
        dry_run: options.dry_run,
        committed: outcome.committed,
        pairs: summaries,
        replications,
        operations: outcome.operations,
        bad_records,
        warnings,
    })
}
