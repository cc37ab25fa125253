//! Page model for standalone documents (about, links, ...)

use super::Extra;
use serde::{Deserialize, Serialize};

/// Page as stored in a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigratePage {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub slug: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl MigratePage {
    pub fn new(title: impl Into<String>, slug: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            slug: slug.into(),
            extra: Extra::new(),
        }
    }
}

/// Page as echoed by the page service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub slug: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl From<PageRecord> for MigratePage {
    fn from(record: PageRecord) -> Self {
        Self {
            title: record.title,
            content: record.content,
            slug: record.slug,
            extra: record.extra,
        }
    }
}
