//! Data models for tplsync.
//!
//! This module defines the core data structures:
//! - `Record` - One project or task entry as returned by the sync API
//! - `RecordId` - Opaque identifier (string or integer on the wire)
//! - `TaskAttributes` - The fixed set of attributes copied onto replicated tasks
//! - `NewTask` - A task creation request queued by the replicator

pub mod forest;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub use forest::{BadRecord, Forest, IntegrityWarning, NodeId, RecordIssue, TreeNode};

/// Opaque record identifier.
///
/// The sync API has used both integer and string ids over time; both
/// normalise to the string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert a JSON value into an id. Only strings and integers qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        RecordId::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid record id: {}", value)))
    }
}

/// Which collection a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Project,
    Task,
}

impl RecordKind {
    /// Name of the field holding the display label.
    pub fn content_key(&self) -> &'static str {
        match self {
            RecordKind::Project => "name",
            RecordKind::Task => "content",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Project => write!(f, "project"),
            RecordKind::Task => write!(f, "task"),
        }
    }
}

/// Parent linkage of a record as decoded from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParentRef {
    /// The `parent_id` key is absent or holds something that is not an id
    /// (bool, float, empty string): the record is malformed.
    Missing,
    /// `parent_id` is null.
    Root,
    Id(RecordId),
}

/// One externally-sourced project or task entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub kind: RecordKind,

    /// `None` when the `id` key is absent or unusable
    pub id: Option<RecordId>,

    pub parent: ParentRef,

    /// Display label (`name` for projects, `content` for tasks)
    pub content: String,

    /// Every other field the service returned
    pub attrs: Map<String, Value>,
}

impl Record {
    /// Decode a record from a raw JSON object.
    ///
    /// Non-object values decode to a record with no id, which the tree
    /// builder reports as malformed.
    pub fn from_value(kind: RecordKind, value: Value) -> Self {
        let mut attrs = match value {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };

        let id = attrs.remove("id").and_then(|v| RecordId::from_value(&v));
        let parent = match attrs.remove("parent_id") {
            None => ParentRef::Missing,
            Some(Value::Null) => ParentRef::Root,
            Some(v) => match RecordId::from_value(&v) {
                Some(pid) => ParentRef::Id(pid),
                None => {
                    // Kept so the bad-record report shows what was sent
                    attrs.insert("parent_id".to_string(), v);
                    ParentRef::Missing
                }
            },
        };
        let content = match attrs.remove(kind.content_key()) {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        Self {
            kind,
            id,
            parent,
            content,
            attrs,
        }
    }

    /// Re-encode to the wire shape (used when reporting records).
    pub fn to_value(&self) -> Value {
        let mut map = self.attrs.clone();
        if let Some(ref id) = self.id {
            map.insert("id".to_string(), Value::String(id.to_string()));
        }
        match self.parent {
            ParentRef::Missing => {}
            ParentRef::Root => {
                map.insert("parent_id".to_string(), Value::Null);
            }
            ParentRef::Id(ref pid) => {
                map.insert("parent_id".to_string(), Value::String(pid.to_string()));
            }
        }
        map.insert(
            self.kind.content_key().to_string(),
            Value::String(self.content.clone()),
        );
        Value::Object(map)
    }

    pub fn parent_id(&self) -> Option<&RecordId> {
        match self.parent {
            ParentRef::Id(ref pid) => Some(pid),
            _ => None,
        }
    }

    /// Owning project of a task record.
    pub fn project_id(&self) -> Option<RecordId> {
        self.attrs.get("project_id").and_then(RecordId::from_value)
    }

    pub fn checked(&self) -> bool {
        self.flag("checked")
    }

    pub fn archived(&self) -> bool {
        self.flag("is_archived")
    }

    pub fn item_order(&self) -> Option<i64> {
        self.attrs.get("item_order").and_then(Value::as_i64)
    }

    pub fn indent(&self) -> Option<i64> {
        self.attrs.get("indent").and_then(Value::as_i64)
    }

    /// Interpret a boolean-ish attribute (`true`/`false` or `1`/`0`).
    fn flag(&self, key: &str) -> bool {
        match self.attrs.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().is_some_and(|i| i != 0),
            _ => false,
        }
    }
}

fn de_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(b)),
        Some(Value::Number(n)) => Ok(n.as_i64().map(|i| i != 0)),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected boolean flag, got {}",
            other
        ))),
    }
}

/// Attributes copied from a template task onto its replica.
///
/// Anything not listed here is never copied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_completed: Option<String>,

    #[serde(default, deserialize_with = "de_flag", skip_serializing_if = "Option::is_none")]
    pub all_day: Option<bool>,

    #[serde(default, deserialize_with = "de_flag", skip_serializing_if = "Option::is_none")]
    pub in_history: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_lang: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_order: Option<i64>,

    #[serde(default, deserialize_with = "de_flag", skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_uid: Option<RecordId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_by_uid: Option<RecordId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<RecordId>,

    #[serde(default, deserialize_with = "de_flag", skip_serializing_if = "Option::is_none")]
    pub checked: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_string: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date_utc: Option<String>,

    #[serde(default, deserialize_with = "de_flag", skip_serializing_if = "Option::is_none")]
    pub is_deleted: Option<bool>,

    #[serde(default, deserialize_with = "de_flag", skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
}

impl TaskAttributes {
    /// Pick the whitelisted attributes out of a task record.
    ///
    /// A field whose value has an unexpected shape is skipped rather than
    /// failing the whole copy.
    pub fn from_record(record: &Record) -> Self {
        let mut picked = Map::new();
        for key in Self::KEYS {
            if let Some(value) = record.attrs.get(*key) {
                let mut single = Map::new();
                single.insert((*key).to_string(), value.clone());
                if serde_json::from_value::<TaskAttributes>(Value::Object(single)).is_ok() {
                    picked.insert((*key).to_string(), value.clone());
                }
            }
        }
        serde_json::from_value(Value::Object(picked)).unwrap_or_default()
    }

    /// Wire names of every whitelisted attribute.
    pub const KEYS: &'static [&'static str] = &[
        "date_completed",
        "all_day",
        "in_history",
        "priority",
        "labels",
        "date_lang",
        "day_order",
        "is_archived",
        "responsible_uid",
        "assigned_by_uid",
        "user_id",
        "checked",
        "date_string",
        "due_date_utc",
        "is_deleted",
        "collapsed",
    ];
}

/// A task creation queued by the replicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub content: String,

    pub project_id: RecordId,

    pub parent_id: RecordId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_order: Option<i64>,

    pub indent: i64,

    #[serde(flatten)]
    pub attributes: TaskAttributes,
}

impl NewTask {
    /// Record shape of this task once the service assigned it `id`.
    pub fn into_record(self, id: RecordId) -> Record {
        let mut attrs = match serde_json::to_value(&self.attributes) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        attrs.insert(
            "project_id".to_string(),
            Value::String(self.project_id.to_string()),
        );
        if let Some(order) = self.item_order {
            attrs.insert("item_order".to_string(), Value::from(order));
        }
        attrs.insert("indent".to_string(), Value::from(self.indent));

        Record {
            kind: RecordKind::Task,
            id: Some(id),
            parent: ParentRef::Id(self.parent_id),
            content: self.content,
            attrs,
        }
    }
}
