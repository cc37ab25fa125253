//! Post model

use super::{Extra, RecordRef};
use serde::{Deserialize, Serialize};

/// Post as stored in a bundle.
///
/// `category_id` is deliberately loose: older exports store the category's
/// id, newer ones its slug, and hand-written bundles anything at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigratePost {
    /// Id the post had in the system it was exported from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "categoryId", alias = "category_id")]
    pub category_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl MigratePost {
    pub fn new(title: impl Into<String>, category_id: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            slug: None,
            content: String::new(),
            category_id: category_id.into(),
            category: None,
            extra: Extra::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }
}

/// Post as echoed by the page service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "categoryId", default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<RecordRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<RecordRef>,
    #[serde(flatten)]
    pub extra: Extra,
}
