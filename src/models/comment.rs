//! Comment model
//!
//! In a bundle, comments form a forest: `pid` ties a thread to its post, and
//! inside a thread `parent` points up while `children` points down. Either
//! direction may be missing; import reconstructs the tree from whichever
//! links are present.

use super::{null_as_default, Extra, RecordRef};
use serde::{Deserialize, Serialize};

/// Comment as stored in a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrateComment {
    /// Id the comment had in the system it was exported from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Post the comment belongs to (original post id or slug)
    #[serde(default)]
    pub pid: String,
    /// Original id of the comment this one replies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CommentChild>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A reply listed under its parent: either the full nested comment or just
/// its original id (the shape export writes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommentChild {
    Id(String),
    Node(Box<MigrateComment>),
}

impl MigrateComment {
    pub fn new(id: impl Into<String>, pid: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            pid: pid.into(),
            parent: None,
            children: Vec::new(),
            extra: Extra::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_child(mut self, child: MigrateComment) -> Self {
        self.children.push(CommentChild::Node(Box::new(child)));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.extra.insert("text".into(), serde_json::Value::String(text.into()));
        self
    }
}

/// Comment as echoed by the comments service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<RecordRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<RecordRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<RecordRef>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl From<CommentRecord> for MigrateComment {
    /// Flatten service links into portable ids
    fn from(record: CommentRecord) -> Self {
        Self {
            id: Some(record.id),
            pid: record.pid.map(|p| p.id().to_string()).unwrap_or_default(),
            parent: record.parent.map(|p| p.id().to_string()),
            children: record
                .children
                .iter()
                .map(|c| CommentChild::Id(c.id().to_string()))
                .collect(),
            extra: record.extra,
        }
    }
}
