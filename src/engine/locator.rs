//! Template project discovery and template/target task pairing.
//!
//! A project named [`TEMPLATE_PROJECT_NAME`] that sits under another project
//! is a template for that parent. Each of its tasks pairs with every task of
//! the parent project that has exactly the same content and the same depth
//! in the task tree. No trimming or case folding is applied.

use serde::Serialize;

use super::StateTree;
use crate::models::{NodeId, RecordId};

/// Reserved project name marking a template project.
pub const TEMPLATE_PROJECT_NAME: &str = "Task Templates";

/// A template task matched to the target task that receives its subtasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatePair {
    pub template_project: NodeId,
    pub target_project: NodeId,
    pub template_task: NodeId,
    pub target_task: NodeId,
    pub content: String,
}

/// Report view of a [`TemplatePair`].
#[derive(Debug, Clone, Serialize)]
pub struct PairSummary {
    pub content: String,
    pub target_project: String,
    pub template_task_id: RecordId,
    pub target_task_id: RecordId,
}

impl TemplatePair {
    pub fn summary(&self, tree: &StateTree) -> PairSummary {
        PairSummary {
            content: self.content.clone(),
            target_project: tree.projects.node(self.target_project).content().to_string(),
            template_task_id: tree.tasks.node(self.template_task).id.clone(),
            target_task_id: tree.tasks.node(self.target_task).id.clone(),
        }
    }
}

/// Every (template task, target task) pair in project collection order.
pub fn find_template_pairs(tree: &StateTree, template_name: &str) -> Vec<TemplatePair> {
    let mut pairs = Vec::new();

    for project in tree.projects.node_ids() {
        let node = tree.projects.node(project);
        if node.content() != template_name {
            continue;
        }
        let Some(target_project) = node.parent else {
            tracing::debug!(project = %node.id, "template project has no parent, skipping");
            continue;
        };

        for &target_task in tree.binding.tasks_of(target_project) {
            let target = tree.tasks.node(target_task);
            for &template_task in tree.binding.tasks_of(project) {
                let template = tree.tasks.node(template_task);
                if template.content() == target.content()
                    && tree.tasks.depth(template_task) == tree.tasks.depth(target_task)
                {
                    pairs.push(TemplatePair {
                        template_project: project,
                        target_project,
                        template_task,
                        target_task,
                        content: template.content().to_string(),
                    });
                }
            }
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Record, RecordKind};
    use crate::remote::RemoteState;
    use serde_json::{Value, json};

    fn tree(projects: Vec<Value>, tasks: Vec<Value>) -> StateTree {
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

    fn projects() -> Vec<Value> {
        vec![
            json!({"id": "alpha", "parent_id": null, "name": "Alpha"}),
            json!({"id": "tpl", "parent_id": "alpha", "name": "Task Templates"}),
        ]
    }

    #[test]
    fn test_pairs_by_exact_content() {
        let tree = tree(
            projects(),
            vec![
                json!({"id": "t1", "parent_id": null, "content": "Review", "project_id": "tpl"}),
                json!({"id": "t2", "parent_id": null, "content": "Review", "project_id": "alpha"}),
                json!({"id": "t3", "parent_id": null, "content": "Review ", "project_id": "alpha"}),
                json!({"id": "t4", "parent_id": null, "content": "Ship", "project_id": "alpha"}),
            ],
        );

        let pairs = find_template_pairs(&tree, TEMPLATE_PROJECT_NAME);
        assert_eq!(pairs.len(), 1);
        let summary = pairs[0].summary(&tree);
        assert_eq!(summary.content, "Review");
        assert_eq!(summary.target_project, "Alpha");
        assert_eq!(summary.template_task_id, RecordId::new("t1"));
        assert_eq!(summary.target_task_id, RecordId::new("t2"));
    }

    #[test]
    fn test_pairs_require_same_depth() {
        let tree = tree(
            projects(),
            vec![
                json!({"id": "t1", "parent_id": null, "content": "Review", "project_id": "tpl"}),
                json!({"id": "t2", "parent_id": null, "content": "Launch", "project_id": "alpha"}),
                json!({"id": "t3", "parent_id": "t2", "content": "Review", "project_id": "alpha"}),
            ],
        );
        assert!(find_template_pairs(&tree, TEMPLATE_PROJECT_NAME).is_empty());
    }

    #[test]
    fn test_task_nested_under_its_template_is_not_a_target() {
        // t3 sits in Alpha but hangs off the template task itself
        let tree = tree(
            projects(),
            vec![
                json!({"id": "t1", "parent_id": null, "content": "Review", "project_id": "tpl"}),
                json!({"id": "t2", "parent_id": null, "content": "Review", "project_id": "alpha"}),
                json!({"id": "t3", "parent_id": "t1", "content": "Review", "project_id": "alpha"}),
            ],
        );

        let pairs = find_template_pairs(&tree, TEMPLATE_PROJECT_NAME);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].summary(&tree).target_task_id, RecordId::new("t2"));
    }

    #[test]
    fn test_root_template_project_ignored() {
        let tree = tree(
            vec![json!({"id": "tpl", "parent_id": null, "name": "Task Templates"})],
            vec![json!({"id": "t1", "parent_id": null, "content": "Review", "project_id": "tpl"})],
        );
        assert!(find_template_pairs(&tree, TEMPLATE_PROJECT_NAME).is_empty());
    }

    #[test]
    fn test_custom_template_name() {
        let tree = tree(
            vec![
                json!({"id": "alpha", "parent_id": null, "name": "Alpha"}),
                json!({"id": "tpl", "parent_id": "alpha", "name": "Blueprints"}),
            ],
            vec![
                json!({"id": "t1", "parent_id": null, "content": "Review", "project_id": "tpl"}),
                json!({"id": "t2", "parent_id": null, "content": "Review", "project_id": "alpha"}),
            ],
        );
        assert!(find_template_pairs(&tree, TEMPLATE_PROJECT_NAME).is_empty());
        assert_eq!(find_template_pairs(&tree, "Blueprints").len(), 1);
    }

    #[test]
    fn test_pair_order_follows_target_tasks() {
        let tree = tree(
            projects(),
            vec![
                json!({"id": "a", "parent_id": null, "content": "A", "project_id": "tpl"}),
                json!({"id": "b", "parent_id": null, "content": "B", "project_id": "tpl"}),
                json!({"id": "tb", "parent_id": null, "content": "B", "project_id": "alpha"}),
                json!({"id": "ta", "parent_id": null, "content": "A", "project_id": "alpha"}),
            ],
        );
        let contents: Vec<_> = find_template_pairs(&tree, TEMPLATE_PROJECT_NAME)
            .into_iter()
            .map(|p| p.content)
            .collect();
        assert_eq!(contents, vec!["B", "A"]);
    }
}
