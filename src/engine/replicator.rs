//! Idempotent copy of template subtrees onto target tasks.
//!
//! For each template child the target is searched for an open child (not
//! checked, not archived) with identical content. A match is reused;
//! otherwise a new task is created through the [`MutationBatch`] and linked
//! into the in-memory task forest so later pairs in the same run see it.
//! Either way the walk descends into the template child's own children.
//!
//! The walk is pre-order and uses an explicit stack, so template depth does
//! not consume call stack.

use serde::Serialize;

use super::batch::MutationBatch;
use super::locator::TemplatePair;
use crate::models::{Forest, NewTask, NodeId, RecordId, TaskAttributes};
use crate::remote::RemoteError;

/// Indent assumed for a target task that carries none
const DEFAULT_INDENT: i64 = 1;

/// What happened to one template child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    AlreadyPresent,
    Added,
}

/// One replication decision, in the order it was made.
#[derive(Debug, Clone, Serialize)]
pub struct Replication {
    pub content: String,
    pub target: String,
    pub target_id: RecordId,
    pub id: RecordId,
    pub depth: usize,
    pub outcome: Outcome,
}

/// Replicate every pair's template subtree under its target task.
///
/// `tasks` gains a node for each creation. The first failed creation aborts
/// the walk; nothing already queued is rolled back.
pub fn replicate(
    tasks: &mut Forest,
    projects: &Forest,
    pairs: &[TemplatePair],
    batch: &mut MutationBatch<'_>,
) -> Result<Vec<Replication>, RemoteError> {
    let mut log = Vec::new();

    for pair in pairs {
        let project_id = projects.node(pair.target_project).id.clone();

        let mut stack: Vec<(NodeId, NodeId, usize)> = tasks
            .node(pair.template_task)
            .children
            .iter()
            .rev()
            .map(|&child| (child, pair.target_task, 1))
            .collect();

        while let Some((template, target, depth)) = stack.pop() {
            let counterpart = match find_open_child(tasks, target, tasks.node(template).content())
            {
                Some(existing) => {
                    tracing::info!(
                        template = %tasks.node(template).content(),
                        target = %tasks.node(target).content(),
                        "already present"
                    );
                    log.push(entry(tasks, existing, target, depth, Outcome::AlreadyPresent));
                    existing
                }
                None => {
                    let new_task = placement(tasks, template, target, &project_id);
                    let record = batch.create(new_task).inspect_err(|e| {
                        tracing::error!(
                            template = %tasks.node(template).content(),
                            error = %e,
                            "create failed"
                        );
                    })?;
                    let id = record.id.clone().ok_or_else(|| {
                        RemoteError::Parse("created task came back without an id".to_string())
                    })?;
                    let created = tasks.attach(target, id, record);
                    tracing::info!(
                        template = %tasks.node(template).content(),
                        target = %tasks.node(target).content(),
                        dry_run = batch.is_dry_run(),
                        "added"
                    );
                    log.push(entry(tasks, created, target, depth, Outcome::Added));
                    created
                }
            };

            for &child in tasks.node(template).children.iter().rev() {
                stack.push((child, counterpart, depth + 1));
            }
        }
    }

    Ok(log)
}

/// First child of `parent` with exactly `content` that is still open.
fn find_open_child(tasks: &Forest, parent: NodeId, content: &str) -> Option<NodeId> {
    tasks.node(parent).children.iter().copied().find(|&child| {
        let record = &tasks.node(child).record;
        record.content == content && !record.checked() && !record.archived()
    })
}

/// Creation request copying `template` under `target`.
fn placement(tasks: &Forest, template: NodeId, target: NodeId, project_id: &RecordId) -> NewTask {
    let template = tasks.node(template);
    let target = tasks.node(target);
    NewTask {
        content: template.record.content.clone(),
        project_id: project_id.clone(),
        parent_id: target.id.clone(),
        item_order: target.record.item_order(),
        indent: target.record.indent().unwrap_or(DEFAULT_INDENT) + 1,
        attributes: TaskAttributes::from_record(&template.record),
    }
}

fn entry(tasks: &Forest, node: NodeId, target: NodeId, depth: usize, outcome: Outcome) -> Replication {
    Replication {
        content: tasks.node(node).content().to_string(),
        target: tasks.node(target).content().to_string(),
        target_id: tasks.node(target).id.clone(),
        id: tasks.node(node).id.clone(),
        depth,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::StateTree;
    use crate::engine::locator::{TEMPLATE_PROJECT_NAME, find_template_pairs};
    use crate::models::{Record, RecordKind};
    use crate::remote::RemoteState;
    use serde_json::{Value, json};

    fn tree(tasks: Vec<Value>) -> StateTree {
        let projects = vec![
            json!({"id": "alpha", "parent_id": null, "name": "Alpha"}),
            json!({"id": "tpl", "parent_id": "alpha", "name": "Task Templates"}),
        ];
        StateTree::build(RemoteState {
            projects: projects
                .into_iter()
                .map(|v| Record::from_value(RecordKind::Project, v))
                .collect(),
            tasks: tasks
                .into_iter()
                .map(|v| Record::from_value(RecordKind::Task, v))
                .collect(),
        })
    }

    fn run_dry(tree: &mut StateTree) -> (Vec<Replication>, Vec<NewTask>) {
        let pairs = find_template_pairs(tree, TEMPLATE_PROJECT_NAME);
        let mut batch = MutationBatch::dry_run();
        let log = replicate(&mut tree.tasks, &tree.projects, &pairs, &mut batch).unwrap();
        (log, batch.finish().unwrap().operations)
    }

    #[test]
    fn test_creates_missing_subtask_with_placement() {
        let mut tree = tree(vec![
            json!({"id": "t1", "parent_id": null, "content": "Review", "project_id": "tpl"}),
            json!({"id": "t2", "parent_id": "t1", "content": "Read doc", "project_id": "tpl",
                   "priority": 3, "labels": [7], "note_count": 2}),
            json!({"id": "a1", "parent_id": null, "content": "Review", "project_id": "alpha",
                   "indent": 1, "item_order": 5}),
        ]);

        let (log, ops) = run_dry(&mut tree);

        assert_eq!(ops.len(), 1);
        let op = &ops[0];
        assert_eq!(op.content, "Read doc");
        assert_eq!(op.parent_id, RecordId::new("a1"));
        assert_eq!(op.project_id, RecordId::new("alpha"));
        assert_eq!(op.indent, 2);
        assert_eq!(op.item_order, Some(5));
        assert_eq!(op.attributes.priority, Some(3));
        assert_eq!(op.attributes.labels, Some(vec![json!(7)]));

        assert_eq!(log.len(), 1);
        assert_eq!(log[0].outcome, Outcome::Added);
        assert_eq!(log[0].target, "Review");

        let target = tree.tasks.find(&RecordId::new("a1")).unwrap();
        assert_eq!(tree.tasks.node(target).children.len(), 1);
    }

    #[test]
    fn test_existing_open_child_reused() {
        let mut tree = tree(vec![
            json!({"id": "t1", "parent_id": null, "content": "Review", "project_id": "tpl"}),
            json!({"id": "t2", "parent_id": "t1", "content": "Read doc", "project_id": "tpl"}),
            json!({"id": "t3", "parent_id": "t2", "content": "Take notes", "project_id": "tpl"}),
            json!({"id": "a1", "parent_id": null, "content": "Review", "project_id": "alpha"}),
            json!({"id": "a2", "parent_id": "a1", "content": "Read doc", "project_id": "alpha"}),
        ]);

        let (log, ops) = run_dry(&mut tree);

        let outcomes: Vec<_> = log.iter().map(|r| (r.content.as_str(), r.outcome)).collect();
        assert_eq!(
            outcomes,
            vec![
                ("Read doc", Outcome::AlreadyPresent),
                ("Take notes", Outcome::Added)
            ]
        );
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].parent_id, RecordId::new("a2"));
    }

    #[test]
    fn test_checked_or_archived_child_not_reused() {
        let mut tree = tree(vec![
            json!({"id": "t1", "parent_id": null, "content": "Review", "project_id": "tpl"}),
            json!({"id": "t2", "parent_id": "t1", "content": "Read doc", "project_id": "tpl"}),
            json!({"id": "a1", "parent_id": null, "content": "Review", "project_id": "alpha"}),
            json!({"id": "a2", "parent_id": "a1", "content": "Read doc", "project_id": "alpha", "checked": 1}),
            json!({"id": "a3", "parent_id": "a1", "content": "Read doc", "project_id": "alpha", "is_archived": true}),
        ]);

        let (_, ops) = run_dry(&mut tree);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].content, "Read doc");
    }

    #[test]
    fn test_preorder_creation_and_nested_parents() {
        let mut tree = tree(vec![
            json!({"id": "t1", "parent_id": null, "content": "Review", "project_id": "tpl"}),
            json!({"id": "t2", "parent_id": "t1", "content": "A", "project_id": "tpl"}),
            json!({"id": "t3", "parent_id": "t2", "content": "A.1", "project_id": "tpl"}),
            json!({"id": "t4", "parent_id": "t1", "content": "B", "project_id": "tpl"}),
            json!({"id": "a1", "parent_id": null, "content": "Review", "project_id": "alpha", "indent": 1}),
        ]);

        let (log, ops) = run_dry(&mut tree);

        let order: Vec<_> = ops.iter().map(|o| o.content.as_str()).collect();
        assert_eq!(order, vec!["A", "A.1", "B"]);
        assert_eq!(ops[1].parent_id, log[0].id);
        assert_eq!(ops[1].indent, 3);
        assert_eq!(log.iter().map(|r| r.depth).collect::<Vec<_>>(), vec![1, 2, 1]);
    }

    #[test]
    fn test_second_pass_in_same_forest_creates_nothing() {
        let mut tree = tree(vec![
            json!({"id": "t1", "parent_id": null, "content": "Review", "project_id": "tpl"}),
            json!({"id": "t2", "parent_id": "t1", "content": "Read doc", "project_id": "tpl"}),
            json!({"id": "a1", "parent_id": null, "content": "Review", "project_id": "alpha"}),
        ]);

        let (_, first) = run_dry(&mut tree);
        let (_, second) = run_dry(&mut tree);
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn test_missing_indent_defaults() {
        let mut tree = tree(vec![
            json!({"id": "t1", "parent_id": null, "content": "Review", "project_id": "tpl"}),
            json!({"id": "t2", "parent_id": "t1", "content": "Read doc", "project_id": "tpl"}),
            json!({"id": "a1", "parent_id": null, "content": "Review", "project_id": "alpha"}),
        ]);
        let (_, ops) = run_dry(&mut tree);
        assert_eq!(ops[0].indent, DEFAULT_INDENT + 1);
        assert_eq!(ops[0].item_order, None);
    }
}
