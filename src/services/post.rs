//! Post pipeline
//!
//! Posts are imported one by one after categories. Each post's loose
//! category reference is resolved (or its category created) before the post
//! is sent, so every imported post ends up in a real category. A post the
//! service refuses is logged and skipped; the rest of the batch carries on.

use super::{CategoryResolver, MigrateError};
use crate::gateway::{call, Event, Gateway};
use crate::models::{CategoryRecord, Extra, IdMap, MigratePost, PostRecord};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Outcome of a post import
#[derive(Debug, Clone)]
pub struct ImportedPosts {
    /// Authoritative post list after the import
    pub posts: Vec<PostRecord>,
    /// Categories after the import, including any created for posts
    pub categories: Vec<CategoryRecord>,
    /// Original post id or slug -> id assigned by the service
    pub translations: IdMap,
}

/// Create payload: the bundle post with its category pinned to an id
#[derive(Serialize)]
struct PostPayload<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    slug: Option<&'a str>,
    content: &'a str,
    #[serde(rename = "categoryId")]
    category_id: &'a str,
    #[serde(flatten)]
    extra: &'a Extra,
}

/// Post pipeline
pub struct PostPipeline {
    gateway: Arc<dyn Gateway>,
}

impl PostPipeline {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Import `posts`, resolving categories against `categories`.
    ///
    /// # Errors
    /// Creating a missing category is not tolerated; a failed post create is.
    pub async fn import(
        &self,
        posts: &[MigratePost],
        categories: Vec<CategoryRecord>,
    ) -> Result<ImportedPosts, MigrateError> {
        let gateway = self.gateway.as_ref();
        let mut resolver = CategoryResolver::new(categories);
        let mut translations = IdMap::new();

        for post in posts {
            let category_id = resolver.resolve(gateway, &post.category_id).await?;
            let payload = serde_json::to_value(PostPayload {
                title: &post.title,
                slug: post.slug.as_deref(),
                content: &post.content,
                category_id: &category_id,
                extra: &post.extra,
            })?;

            match call::<Value>(gateway, Event::PostCreate, payload).await {
                Ok(echo) => {
                    if let Ok(created) = serde_json::from_value::<PostRecord>(echo) {
                        if let Some(ref old_id) = post.id {
                            translations.insert(old_id.as_str(), created.id.as_str());
                        }
                        if let Some(ref slug) = post.slug {
                            translations.insert(slug.as_str(), created.id.as_str());
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Post '{}' could not be imported: {}", post.title, e);
                }
            }
        }

        Ok(ImportedPosts {
            posts: self.list().await?,
            categories: resolver.categories().to_vec(),
            translations,
        })
    }

    /// All posts, with `category` and `category_id` mapped back to slugs
    pub async fn export(&self) -> Result<Vec<MigratePost>, MigrateError> {
        let posts = self.list().await?;
        let categories: Vec<CategoryRecord> =
            call(self.gateway.as_ref(), Event::CategoryGetAll, json!({})).await?;

        let mut slugs = IdMap::new();
        for category in &categories {
            slugs.insert(category.id.as_str(), category.slug.as_str());
        }

        Ok(posts.into_iter().map(|post| to_portable(post, &slugs)).collect())
    }

    /// Authoritative post list
    pub async fn list(&self) -> Result<Vec<PostRecord>, MigrateError> {
        Ok(call(self.gateway.as_ref(), Event::PostsListGetAll, json!({})).await?)
    }
}

fn to_portable(post: PostRecord, slugs: &IdMap) -> MigratePost {
    let category = post
        .category
        .as_ref()
        .and_then(|c| slugs.get(c.id()))
        .map(str::to_string);
    let category_id = post
        .category_id
        .as_ref()
        .and_then(|c| slugs.get(c.id()))
        .map(str::to_string)
        .or_else(|| category.clone())
        .unwrap_or_else(|| {
            // Keep whatever id the post had; import will recreate a category for it
            let raw = post.category_id.as_ref().map(|c| c.id().to_string()).unwrap_or_default();
            tracing::warn!("Post '{}' points at unknown category '{}'", post.title, raw);
            raw
        });

    MigratePost {
        id: Some(post.id),
        title: post.title,
        slug: post.slug,
        content: post.content,
        category_id,
        category,
        extra: post.extra,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;

    fn setup() -> (Arc<MemoryGateway>, PostPipeline) {
        let gateway = Arc::new(MemoryGateway::new());
        let pipeline = PostPipeline::new(gateway.clone());
        (gateway, pipeline)
    }

    async fn seed_category(gateway: &MemoryGateway, slug: &str) -> CategoryRecord {
        call(gateway, Event::CategoryCreate, json!({ "name": slug, "slug": slug }))
            .await
            .expect("Failed to seed category")
    }

    #[tokio::test]
    async fn test_resolves_by_slug_and_by_id() {
        let (gateway, pipeline) = setup();
        let tech = seed_category(&gateway, "tech").await;
        let posts = vec![
            MigratePost::new("By slug", "tech"),
            MigratePost::new("By id", tech.id.clone()),
        ];

        let imported = pipeline.import(&posts, vec![tech.clone()]).await.unwrap();

        assert_eq!(imported.posts.len(), 2);
        for post in &imported.posts {
            assert_eq!(post.category_id.as_ref().map(|c| c.id()), Some(tech.id.as_str()));
        }
        assert_eq!(gateway.count(Event::CategoryCreate), 1);
    }

    #[tokio::test]
    async fn test_unknown_category_synthesized_once() {
        let (gateway, pipeline) = setup();
        let posts = vec![
            MigratePost::new("One", "notes"),
            MigratePost::new("Two", "notes"),
            MigratePost::new("Three", "drafts"),
        ];

        let imported = pipeline.import(&posts, Vec::new()).await.unwrap();

        assert_eq!(imported.posts.len(), 3);
        assert_eq!(imported.categories.len(), 2);
        assert_eq!(gateway.count(Event::CategoryCreate), 2);
        let categories: Vec<CategoryRecord> = call(gateway.as_ref(), Event::CategoryGetAll, json!({}))
            .await
            .unwrap();
        let notes = categories.iter().find(|c| c.slug == "notes").unwrap();
        assert_eq!(notes.name, "notes");
    }

    #[tokio::test]
    async fn test_payload_drops_loose_category_fields() {
        let (gateway, pipeline) = setup();
        let tech = seed_category(&gateway, "tech").await;
        let mut post = MigratePost::new("Hello", "tech");
        post.category = Some("tech".into());
        post.extra.insert("summary".into(), json!("short"));

        pipeline.import(&[post], vec![tech.clone()]).await.unwrap();

        let calls = gateway.calls();
        let (_, payload) = calls.iter().find(|(e, _)| *e == Event::PostCreate).unwrap();
        assert_eq!(payload["categoryId"], json!(tech.id));
        assert_eq!(payload["summary"], "short");
        assert!(payload.get("category").is_none());
        assert!(payload.get("category_id").is_none());
        assert!(payload.get("id").is_none());
    }

    #[tokio::test]
    async fn test_failed_post_does_not_stop_the_batch() {
        let (gateway, pipeline) = setup();
        let tech = seed_category(&gateway, "tech").await;
        gateway.fail_when(Event::PostCreate, 500, |p| p["title"] == "Second");
        let posts: Vec<_> = ["First", "Second", "Third", "Fourth"]
            .iter()
            .map(|t| MigratePost::new(*t, "tech"))
            .collect();

        let imported = pipeline.import(&posts, vec![tech]).await.unwrap();

        let titles: Vec<_> = imported.posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Third", "Fourth"]);
        assert_eq!(gateway.count(Event::PostCreate), 4);
    }

    #[tokio::test]
    async fn test_category_synthesis_failure_aborts() {
        let (gateway, pipeline) = setup();
        gateway.fail_always(Event::CategoryCreate);

        let result = pipeline.import(&[MigratePost::new("Hello", "missing")], Vec::new()).await;

        assert!(result.is_err());
        assert_eq!(gateway.count(Event::PostCreate), 0);
    }

    #[tokio::test]
    async fn test_translations_map_original_ids_and_slugs() {
        let (gateway, pipeline) = setup();
        let tech = seed_category(&gateway, "tech").await;
        let posts = vec![MigratePost::new("Hello", "tech").with_id("old-1").with_slug("hello")];

        let imported = pipeline.import(&posts, vec![tech]).await.unwrap();

        let new_id = imported.posts[0].id.as_str();
        assert_eq!(imported.translations.get("old-1"), Some(new_id));
        assert_eq!(imported.translations.get("hello"), Some(new_id));
    }

    #[tokio::test]
    async fn test_export_maps_categories_to_slugs() {
        let (gateway, pipeline) = setup();
        let tech = seed_category(&gateway, "tech").await;
        pipeline
            .import(&[MigratePost::new("Hello", tech.id.clone())], vec![tech.clone()])
            .await
            .unwrap();

        let exported = pipeline.export().await.unwrap();

        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].category_id, "tech");
        assert_eq!(exported[0].category.as_deref(), Some("tech"));
        assert!(exported[0].id.is_some());
    }
}
