//! Tree reconstruction from flat record collections.
//!
//! Records reference their parent by id. [`Forest::build`] links them into an
//! arena of [`TreeNode`]s whose parent/children links are [`NodeId`] indices,
//! so the forest has no ownership cycles and is cheap to inspect in tests.
//!
//! Records that cannot take part in a tree are never repaired or dropped
//! silently; they are returned as [`BadRecord`]s:
//! - no `id`, or no `parent_id` key at all (malformed)
//! - `parent_id` equal to the record's own `id`
//! - membership in a parent cycle
//!
//! A record whose parent was rejected becomes a root, exactly as if its
//! parent had never been fetched.

use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;

use super::{ParentRef, Record, RecordId, RecordKind};

/// Index of a node within its [`Forest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A record plus its position in the tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: RecordId,

    pub record: Record,

    /// Relation only; the forest owns every node
    pub parent: Option<NodeId>,

    /// In order of appearance in the source collection
    pub children: Vec<NodeId>,
}

impl TreeNode {
    pub fn content(&self) -> &str {
        &self.record.content
    }
}

/// Why a record was kept out of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordIssue {
    MissingId,
    MissingParentId,
    SelfParent,
    Cycle,
}

impl fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordIssue::MissingId => write!(f, "missing id"),
            RecordIssue::MissingParentId => write!(f, "missing or invalid parent_id"),
            RecordIssue::SelfParent => write!(f, "parent_id equals own id"),
            RecordIssue::Cycle => write!(f, "part of a parent cycle"),
        }
    }
}

fn serialize_record<S: Serializer>(record: &Record, serializer: S) -> Result<S::Ok, S::Error> {
    record.to_value().serialize(serializer)
}

/// A record excluded from the tree, reported to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct BadRecord {
    pub kind: RecordKind,

    pub issue: RecordIssue,

    #[serde(serialize_with = "serialize_record")]
    pub record: Record,
}

/// Data-integrity problems that do not stop processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum IntegrityWarning {
    /// Several records share an id; the first one wins every lookup
    DuplicateId { kind: RecordKind, id: RecordId },
    /// A task's `project_id` matches no project
    UnresolvedProject {
        task_id: RecordId,
        project_id: RecordId,
    },
    /// A task has no usable `project_id`
    MissingProjectId { task_id: RecordId },
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityWarning::DuplicateId { kind, id } => {
                write!(f, "duplicate {} id {}", kind, id)
            }
            IntegrityWarning::UnresolvedProject {
                task_id,
                project_id,
            } => write!(f, "task {} references unknown project {}", task_id, project_id),
            IntegrityWarning::MissingProjectId { task_id } => {
                write!(f, "task {} has no project_id", task_id)
            }
        }
    }
}

/// All records of one kind, linked into trees.
#[derive(Debug, Clone)]
pub struct Forest {
    nodes: Vec<TreeNode>,
    roots: Vec<NodeId>,
    index: HashMap<RecordId, NodeId>,
    bad: Vec<BadRecord>,
    warnings: Vec<IntegrityWarning>,
}

impl Forest {
    /// Build a forest from a flat collection of records of one kind.
    ///
    /// Parent lookup is by id with first-match semantics when ids repeat.
    pub fn build(kind: RecordKind, records: Vec<Record>) -> Self {
        let mut bad = Vec::new();
        let mut alive = Vec::with_capacity(records.len());

        for record in records {
            let Some(id) = record.id.clone() else {
                bad.push(BadRecord {
                    kind,
                    issue: RecordIssue::MissingId,
                    record,
                });
                continue;
            };
            let issue = match record.parent {
                ParentRef::Missing => Some(RecordIssue::MissingParentId),
                ParentRef::Id(ref pid) if *pid == id => Some(RecordIssue::SelfParent),
                _ => None,
            };
            match issue {
                Some(issue) => bad.push(BadRecord {
                    kind,
                    issue,
                    record,
                }),
                None => alive.push((id, record)),
            }
        }

        let warnings = duplicate_ids(kind, &alive);

        // Removing a cycle member can re-route a lookup to a later duplicate,
        // so resolve again until no cycle remains.
        let parents = loop {
            let parents = resolve_parents(&alive);
            let cyclic = cycle_members(&parents);
            if cyclic.is_empty() {
                break parents;
            }
            let mut kept = Vec::with_capacity(alive.len() - cyclic.len());
            for (i, (id, record)) in alive.into_iter().enumerate() {
                if cyclic.contains(&i) {
                    bad.push(BadRecord {
                        kind,
                        issue: RecordIssue::Cycle,
                        record,
                    });
                } else {
                    kept.push((id, record));
                }
            }
            alive = kept;
        };

        let mut forest = Self {
            nodes: Vec::with_capacity(alive.len()),
            roots: Vec::new(),
            index: HashMap::new(),
            bad,
            warnings,
        };
        for ((rid, record), parent) in alive.into_iter().zip(&parents) {
            let id = NodeId(forest.nodes.len());
            forest.index.entry(rid.clone()).or_insert(id);
            forest.nodes.push(TreeNode {
                id: rid,
                record,
                parent: parent.map(NodeId),
                children: Vec::new(),
            });
        }
        for i in 0..forest.nodes.len() {
            match forest.nodes[i].parent {
                Some(parent) => forest.nodes[parent.0].children.push(NodeId(i)),
                None => forest.roots.push(NodeId(i)),
            }
        }

        forest
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Nodes with no resolvable parent, in collection order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn bad_records(&self) -> &[BadRecord] {
        &self.bad
    }

    pub fn warnings(&self) -> &[IntegrityWarning] {
        &self.warnings
    }

    /// First node carrying `id`.
    pub fn find(&self, id: &RecordId) -> Option<NodeId> {
        self.index.get(id).copied()
    }

    /// Number of ancestors above `id` (roots have depth 0).
    pub fn depth(&self, id: NodeId) -> usize {
        self.path_to_root(id).len() - 1
    }

    /// `id` followed by each of its ancestors up to the root.
    pub fn path_to_root(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut current = self.nodes[id.0].parent;
        while let Some(parent) = current {
            path.push(parent);
            current = self.nodes[parent.0].parent;
        }
        path
    }

    /// Link a freshly created record under `parent` and return its node.
    pub fn attach(&mut self, parent: NodeId, rid: RecordId, mut record: Record) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.index.entry(rid.clone()).or_insert(id);
        record.id = Some(rid.clone());
        self.nodes.push(TreeNode {
            id: rid,
            record,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }
}

fn duplicate_ids(kind: RecordKind, records: &[(RecordId, Record)]) -> Vec<IntegrityWarning> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut warnings = Vec::new();
    for (id, _) in records {
        if !seen.insert(id) && reported.insert(id) {
            warnings.push(IntegrityWarning::DuplicateId {
                kind,
                id: id.clone(),
            });
        }
    }
    warnings
}

/// Position of each record's parent within `records`, first match by id.
fn resolve_parents(records: &[(RecordId, Record)]) -> Vec<Option<usize>> {
    let mut index: HashMap<&RecordId, usize> = HashMap::new();
    for (i, (id, _)) in records.iter().enumerate() {
        index.entry(id).or_insert(i);
    }
    records
        .iter()
        .map(|(_, record)| record.parent_id().and_then(|pid| index.get(pid).copied()))
        .collect()
}

/// Positions that lie on a cycle of the parent relation.
fn cycle_members(parents: &[Option<usize>]) -> HashSet<usize> {
    const UNSEEN: u8 = 0;
    const ON_PATH: u8 = 1;
    const DONE: u8 = 2;

    let mut state = vec![UNSEEN; parents.len()];
    let mut members = HashSet::new();

    for start in 0..parents.len() {
        let mut path = Vec::new();
        let mut current = Some(start);
        while let Some(i) = current {
            match state[i] {
                UNSEEN => {
                    state[i] = ON_PATH;
                    path.push(i);
                    current = parents[i];
                }
                ON_PATH => {
                    if let Some(pos) = path.iter().position(|&p| p == i) {
                        members.extend(path[pos..].iter().copied());
                    }
                    break;
                }
                _ => break,
            }
        }
        for i in path {
            state[i] = DONE;
        }
    }

    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task(id: &str, parent: Option<&str>, content: &str) -> Record {
        Record::from_value(
            RecordKind::Task,
            json!({"id": id, "parent_id": parent, "content": content, "project_id": "p1"}),
        )
    }

    fn contents(forest: &Forest, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|&id| forest.node(id).content().to_string())
            .collect()
    }

    fn assert_acyclic(forest: &Forest) {
        for id in forest.node_ids() {
            let path = forest.path_to_root(id);
            let unique: HashSet<_> = path.iter().collect();
            assert_eq!(unique.len(), path.len(), "repeated node on path to root");
            let root = *path.last().unwrap();
            assert!(forest.roots().contains(&root));
        }
    }

    // ==================== Linking Tests ====================

    #[test]
    fn test_build_links_children_in_order() {
        let forest = Forest::build(
            RecordKind::Task,
            vec![
                task("2", Some("1"), "child a"),
                task("1", None, "root"),
                task("3", Some("1"), "child b"),
                task("4", Some("3"), "grandchild"),
            ],
        );

        assert_eq!(forest.len(), 4);
        assert_eq!(contents(&forest, forest.roots()), vec!["root"]);
        let root = forest.roots()[0];
        assert_eq!(
            contents(&forest, &forest.node(root).children),
            vec!["child a", "child b"]
        );
        let b = forest.find(&RecordId::new("3")).unwrap();
        assert_eq!(contents(&forest, &forest.node(b).children), vec!["grandchild"]);
        assert_eq!(forest.depth(forest.find(&RecordId::new("4")).unwrap()), 2);
        assert_acyclic(&forest);
    }

    #[test]
    fn test_unresolved_parent_becomes_root() {
        let forest = Forest::build(RecordKind::Task, vec![task("1", Some("missing"), "orphan")]);
        assert_eq!(forest.roots().len(), 1);
        assert!(forest.bad_records().is_empty());
    }

    #[test]
    fn test_empty_collection() {
        let forest = Forest::build(RecordKind::Project, Vec::new());
        assert!(forest.is_empty());
        assert!(forest.roots().is_empty());
    }

    // ==================== Rejection Tests ====================

    #[test]
    fn test_missing_parent_id_is_malformed() {
        let broken = Record::from_value(RecordKind::Task, json!({"id": "9", "content": "broken"}));
        let forest = Forest::build(RecordKind::Task, vec![task("1", None, "ok"), broken]);

        assert_eq!(forest.len(), 1);
        assert_eq!(forest.bad_records().len(), 1);
        assert_eq!(forest.bad_records()[0].issue, RecordIssue::MissingParentId);
    }

    #[test]
    fn test_non_id_parent_is_malformed_not_root() {
        let bool_parent = Record::from_value(
            RecordKind::Task,
            json!({"id": "7", "parent_id": true, "content": "flag"}),
        );
        let empty_parent = Record::from_value(
            RecordKind::Task,
            json!({"id": "8", "parent_id": "", "content": "blank"}),
        );
        let forest = Forest::build(
            RecordKind::Task,
            vec![task("1", None, "ok"), bool_parent, empty_parent],
        );

        assert_eq!(forest.roots().len(), 1);
        assert_eq!(forest.bad_records().len(), 2);
        assert!(
            forest
                .bad_records()
                .iter()
                .all(|b| b.issue == RecordIssue::MissingParentId)
        );
        assert_eq!(
            forest.bad_records()[0].issue.to_string(),
            "missing or invalid parent_id"
        );
    }

    #[test]
    fn test_missing_id_is_malformed() {
        let broken = Record::from_value(RecordKind::Task, json!({"parent_id": null}));
        let forest = Forest::build(RecordKind::Task, vec![broken]);
        assert_eq!(forest.bad_records()[0].issue, RecordIssue::MissingId);
        assert!(forest.is_empty());
    }

    #[test]
    fn test_self_parent_excluded() {
        let forest = Forest::build(
            RecordKind::Task,
            vec![task("1", None, "root"), task("2", Some("2"), "loop")],
        );

        assert_eq!(forest.len(), 1);
        assert!(forest.find(&RecordId::new("2")).is_none());
        assert_eq!(forest.bad_records()[0].issue, RecordIssue::SelfParent);
        for id in forest.node_ids() {
            assert!(forest.node(id).children.is_empty());
        }
    }

    #[test]
    fn test_cycle_rejected_and_descendants_rerooted() {
        let forest = Forest::build(
            RecordKind::Task,
            vec![
                task("a", Some("b"), "a"),
                task("b", Some("a"), "b"),
                task("c", Some("a"), "hangs off cycle"),
                task("r", None, "root"),
            ],
        );

        let issues: Vec<_> = forest.bad_records().iter().map(|b| b.issue).collect();
        assert_eq!(issues, vec![RecordIssue::Cycle, RecordIssue::Cycle]);
        assert_eq!(
            contents(&forest, forest.roots()),
            vec!["hangs off cycle", "root"]
        );
        assert_acyclic(&forest);
    }

    #[test]
    fn test_children_of_malformed_parent_become_roots() {
        let broken = Record::from_value(RecordKind::Task, json!({"id": "1", "content": "x"}));
        let forest = Forest::build(RecordKind::Task, vec![broken, task("2", Some("1"), "child")]);
        assert_eq!(contents(&forest, forest.roots()), vec!["child"]);
    }

    // ==================== Duplicate Id Tests ====================

    #[test]
    fn test_duplicate_ids_first_match_wins() {
        let forest = Forest::build(
            RecordKind::Task,
            vec![
                task("1", None, "first"),
                task("1", None, "second"),
                task("2", Some("1"), "child"),
            ],
        );

        let first = forest.find(&RecordId::new("1")).unwrap();
        assert_eq!(forest.node(first).content(), "first");
        assert_eq!(contents(&forest, &forest.node(first).children), vec!["child"]);
        assert_eq!(
            forest.warnings(),
            &[IntegrityWarning::DuplicateId {
                kind: RecordKind::Task,
                id: RecordId::new("1"),
            }]
        );
    }

    // ==================== Attach Tests ====================

    #[test]
    fn test_attach_links_new_node() {
        let mut forest = Forest::build(RecordKind::Task, vec![task("1", None, "root")]);
        let root = forest.roots()[0];
        let added = forest.attach(root, RecordId::new("tmp"), task("tmp", Some("1"), "new"));

        assert_eq!(forest.node(root).children, vec![added]);
        assert_eq!(forest.node(added).parent, Some(root));
        assert_eq!(forest.find(&RecordId::new("tmp")), Some(added));
        assert_eq!(forest.depth(added), 1);
    }
}
