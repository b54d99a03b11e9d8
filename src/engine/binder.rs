//! Project/task association by `project_id`.

use crate::models::{Forest, IntegrityWarning, NodeId};

/// Tasks owned by each project, in task collection order.
#[derive(Debug, Clone, Default)]
pub struct Binding {
    tasks: Vec<Vec<NodeId>>,
    warnings: Vec<IntegrityWarning>,
}

impl Binding {
    /// Attach every task to the first project whose id equals its `project_id`.
    ///
    /// Nesting plays no part here; subtasks are bound to their project just
    /// like top-level tasks.
    pub fn bind(projects: &Forest, tasks: &Forest) -> Self {
        let mut binding = Self {
            tasks: vec![Vec::new(); projects.len()],
            warnings: Vec::new(),
        };

        for task in tasks.node_ids() {
            let node = tasks.node(task);
            let Some(project_id) = node.record.project_id() else {
                binding.warnings.push(IntegrityWarning::MissingProjectId {
                    task_id: node.id.clone(),
                });
                continue;
            };
            match projects.find(&project_id) {
                Some(project) => binding.tasks[project.index()].push(task),
                None => binding.warnings.push(IntegrityWarning::UnresolvedProject {
                    task_id: node.id.clone(),
                    project_id,
                }),
            }
        }

        binding
    }

    pub fn tasks_of(&self, project: NodeId) -> &[NodeId] {
        self.tasks
            .get(project.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn warnings(&self) -> &[IntegrityWarning] {
        &self.warnings
    }
}
