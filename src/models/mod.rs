//! Data models
//!
//! This module contains the data structures that flow through a migration run.
//! Models come in two flavours:
//! - Portable bundle types (`Migrate*`) - the import/export file format, keyed
//!   by slugs and original ids
//! - Service records (`*Record`) - what the content services echo back, keyed
//!   by service-assigned ids
//!
//! Fields the migration does not interpret are kept in a flattened `extra`
//! map so they survive a round trip untouched.

mod bundle;
mod category;
mod comment;
mod friend;
mod id_map;
mod page;
mod post;
mod user;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

pub use bundle::{CommentReport, ImportReport, MigrateData};
pub use category::{CategoryRecord, MigrateCategory};
pub use comment::{CommentChild, CommentRecord, MigrateComment};
pub use friend::{FriendRecord, MigrateFriend};
pub use id_map::IdMap;
pub use page::{MigratePage, PageRecord};
pub use post::{MigratePost, PostRecord};
pub use user::{MigrateUser, UserRecord};

/// Pass-through fields carried alongside the typed ones
pub type Extra = serde_json::Map<String, serde_json::Value>;

static OBJECT_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{24}$").unwrap());

/// Whether `value` has the syntax of a service-assigned identifier
/// (24 hex digits).
pub fn is_object_id(value: &str) -> bool {
    OBJECT_ID_RE.is_match(value)
}

/// A link to another record, echoed either as a bare id or as the embedded
/// document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordRef {
    Id(String),
    Document {
        id: String,
        #[serde(flatten)]
        rest: Extra,
    },
}

impl RecordRef {
    pub fn id(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Document { id, .. } => id,
        }
    }
}

impl From<&str> for RecordRef {
    fn from(id: &str) -> Self {
        Self::Id(id.to_string())
    }
}

/// Deserialize `null` as the type's default (JSON exports often write
/// `"children": null`).
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
