//! Category pipeline and reference resolver
//!
//! Import walks the bundle's categories and creates only the slugs the page
//! service does not know yet, so re-running an import never duplicates a
//! category. The authoritative list it returns (including categories that
//! existed before the run) is what posts are resolved against.
//!
//! A post names its category loosely; `CategoryResolver` turns that loose
//! reference into a category id, creating the category when nothing matches.

use super::MigrateError;
use crate::gateway::{call, Event, Gateway};
use crate::models::{is_object_id, CategoryRecord, IdMap, MigrateCategory};
use serde_json::{json, Value};
use std::sync::Arc;

/// Category pipeline
pub struct CategoryPipeline {
    gateway: Arc<dyn Gateway>,
}

impl CategoryPipeline {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Create every category whose slug is not known yet, then return the
    /// full list of categories.
    ///
    /// # Errors
    /// Any failure other than a "not found" lookup aborts the import.
    pub async fn import(&self, categories: &[MigrateCategory]) -> Result<Vec<CategoryRecord>, MigrateError> {
        for category in categories {
            if self.exists(&category.slug).await? {
                tracing::debug!("Category '{}' already exists, skipping", category.slug);
                continue;
            }
            let _: Value = call(
                self.gateway.as_ref(),
                Event::CategoryCreate,
                serde_json::to_value(category)?,
            )
            .await?;
            tracing::debug!("Created category '{}'", category.slug);
        }

        self.list().await
    }

    /// All categories, for export
    pub async fn export(&self) -> Result<Vec<MigrateCategory>, MigrateError> {
        Ok(self.list().await?.into_iter().map(Into::into).collect())
    }

    /// Authoritative category list
    pub async fn list(&self) -> Result<Vec<CategoryRecord>, MigrateError> {
        Ok(call(self.gateway.as_ref(), Event::CategoryGetAll, json!({})).await?)
    }

    async fn exists(&self, slug: &str) -> Result<bool, MigrateError> {
        match call::<Value>(self.gateway.as_ref(), Event::CategoryGet, json!({ "_query": slug })).await {
            Ok(found) => Ok(!is_empty_answer(&found)),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Lookups answer "nothing" in several ways depending on the service version
fn is_empty_answer(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

/// How a post refers to its category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryRef<'a> {
    /// Looks like a service id; matched against ids only
    Id(&'a str),
    /// Anything else; matched against slugs
    Slug(&'a str),
}

impl<'a> CategoryRef<'a> {
    pub fn parse(raw: &'a str) -> Self {
        if is_object_id(raw) {
            Self::Id(raw)
        } else {
            Self::Slug(raw)
        }
    }
}

/// Resolves loose category references against the authoritative list
#[derive(Debug, Default)]
pub struct CategoryResolver {
    categories: Vec<CategoryRecord>,
    /// Raw references already turned into new categories during this run
    synthesized: IdMap,
}

impl CategoryResolver {
    pub fn new(categories: Vec<CategoryRecord>) -> Self {
        Self {
            categories,
            synthesized: IdMap::new(),
        }
    }

    pub fn lookup(&self, reference: CategoryRef<'_>) -> Option<&CategoryRecord> {
        match reference {
            CategoryRef::Id(id) => self.categories.iter().find(|c| c.id == id),
            CategoryRef::Slug(slug) => self.categories.iter().find(|c| c.slug == slug),
        }
    }

    /// Id of the category `raw` refers to.
    ///
    /// When nothing matches, a category named and slugged `raw` is created;
    /// later references to the same string reuse it.
    pub async fn resolve(&mut self, gateway: &dyn Gateway, raw: &str) -> Result<String, MigrateError> {
        if let Some(id) = self.synthesized.get(raw) {
            return Ok(id.to_string());
        }
        if let Some(found) = self.lookup(CategoryRef::parse(raw)) {
            return Ok(found.id.clone());
        }

        let created: CategoryRecord = call(
            gateway,
            Event::CategoryCreate,
            json!({ "name": raw, "slug": raw }),
        )
        .await?;
        tracing::info!("Created missing category '{}' ({})", raw, created.id);

        self.synthesized.insert(raw, created.id.clone());
        let id = created.id.clone();
        self.categories.push(created);
        Ok(id)
    }

    pub fn categories(&self) -> &[CategoryRecord] {
        &self.categories
    }
}
