//! Category model
//!
//! The slug is a category's natural key: a bundle never refers to a category
//! by anything else, and import never creates a second category for a slug
//! that already exists.

use super::Extra;
use serde::{Deserialize, Serialize};

/// Category as stored in a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrateCategory {
    pub name: String,
    pub slug: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl MigrateCategory {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            extra: Extra::new(),
        }
    }
}

/// Category as echoed by the page service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl From<CategoryRecord> for MigrateCategory {
    fn from(record: CategoryRecord) -> Self {
        Self {
            name: record.name,
            slug: record.slug,
            extra: record.extra,
        }
    }
}
