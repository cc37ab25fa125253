//! Page pipeline
//!
//! Standalone pages (about, links, ...) are independent of every other
//! entity. A page the service refuses, typically because its slug is already
//! taken, is logged and skipped.

use super::MigrateError;
use crate::gateway::{call, Event, Gateway};
use crate::models::{MigratePage, PageRecord};
use serde_json::{json, Value};
use std::sync::Arc;

/// Page pipeline
pub struct PagePipeline {
    gateway: Arc<dyn Gateway>,
}

impl PagePipeline {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn import(&self, pages: &[MigratePage]) -> Result<Vec<PageRecord>, MigrateError> {
        for page in pages {
            let payload = serde_json::to_value(page)?;
            if let Err(e) = call::<Value>(self.gateway.as_ref(), Event::PageCreate, payload).await {
                tracing::warn!("Page '{}' could not be imported: {}", page.title, e);
            }
        }

        self.list().await
    }

    pub async fn export(&self) -> Result<Vec<MigratePage>, MigrateError> {
        Ok(self.list().await?.into_iter().map(Into::into).collect())
    }

    pub async fn list(&self) -> Result<Vec<PageRecord>, MigrateError> {
        Ok(call(self.gateway.as_ref(), Event::PagesGetAll, json!({})).await?)
    }
}
