//! Console rendering of the project/task tree.
//!
//! Projects are indented three spaces per nesting level. Under each project
//! its top-level tasks follow one level deeper, each task line carrying a
//! bullet that cycles through [`BULLETS`] by task depth. Child projects come
//! after the project's tasks.

use std::fmt::Write;

use crate::engine::StateTree;
use crate::models::NodeId;

const INDENT: &str = "   ";

/// Task bullets by depth (depth 0 first)
pub const BULLETS: [char; 3] = ['-', '+', '#'];

/// Render every project tree in the snapshot.
pub fn render_tree(tree: &StateTree) -> String {
    let mut out = String::new();
    for &root in tree.projects.roots() {
        render_project(tree, root, 0, &mut out);
    }
    out
}

fn render_project(tree: &StateTree, project: NodeId, level: usize, out: &mut String) {
    let node = tree.projects.node(project);
    let _ = writeln!(out, "{}{}", INDENT.repeat(level), node.content());

    // Iterative so deep task chains cannot exhaust the stack
    let mut stack: Vec<(NodeId, usize, usize)> = tree
        .binding
        .tasks_of(project)
        .iter()
        .rev()
        .filter(|&&task| tree.tasks.node(task).parent.is_none())
        .map(|&task| (task, level + 1, 0))
        .collect();
    while let Some((task, task_level, depth)) = stack.pop() {
        let task_node = tree.tasks.node(task);
        let _ = writeln!(
            out,
            "{}{} {}",
            INDENT.repeat(task_level),
            BULLETS[depth % BULLETS.len()],
            task_node.content()
        );
        for &child in task_node.children.iter().rev() {
            stack.push((child, task_level + 1, depth + 1));
        }
    }

    for &child in &node.children {
        render_project(tree, child, level + 1, out);
    }
}
