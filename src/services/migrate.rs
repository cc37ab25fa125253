//! Migration orchestrator
//!
//! Sequences the entity pipelines for one import or export run. Import order
//! follows the references between entities:
//!
//! categories -> posts -> comments, then user, friends and pages
//!
//! Nothing is rolled back: when a stage fails, everything written by earlier
//! stages stays in the services.

use super::{
    CategoryPipeline, CommentPipeline, FriendPipeline, ImportedPosts, MigrateError, PagePipeline,
    PostPipeline, UserPipeline,
};
use crate::config::MigrateConfig;
use crate::gateway::Gateway;
use crate::models::{ImportReport, MigrateData};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Migration orchestrator
pub struct MigrateService {
    categories: CategoryPipeline,
    posts: PostPipeline,
    comments: CommentPipeline,
    user: UserPipeline,
    friends: FriendPipeline,
    pages: PagePipeline,
    config: MigrateConfig,
}

impl MigrateService {
    /// Create a new migration service with the default run configuration
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self::with_config(gateway, MigrateConfig::default())
    }

    pub fn with_config(gateway: Arc<dyn Gateway>, config: MigrateConfig) -> Self {
        Self {
            categories: CategoryPipeline::new(gateway.clone()),
            posts: PostPipeline::new(gateway.clone()),
            comments: CommentPipeline::new(gateway.clone()),
            user: UserPipeline::new(gateway.clone()),
            friends: FriendPipeline::new(gateway.clone()),
            pages: PagePipeline::new(gateway),
            config,
        }
    }

    /// Import a bundle.
    ///
    /// # Errors
    /// Stops at the first stage that fails in a way it does not tolerate
    /// (see the pipelines). Earlier stages stay applied.
    #[instrument(name = "migrate_import", skip_all, fields(run_id = %Uuid::new_v4()))]
    pub async fn import(&self, data: MigrateData) -> Result<ImportReport, MigrateError> {
        tracing::info!("Importing {} categories", data.categories.len());
        let categories = self.categories.import(&data.categories).await?;

        tracing::info!("Importing {} posts", data.posts.len());
        let ImportedPosts {
            posts,
            categories,
            translations,
        } = self.posts.import(&data.posts, categories).await?;

        tracing::info!("Importing {} comments", data.comments.len());
        let comments = self.comments.import(&data.comments, &translations).await?;

        tracing::info!(
            "Importing user, {} friends and {} pages",
            data.friends.len(),
            data.pages.len()
        );
        let (user, friends, pages) = if self.config.parallel_independent {
            futures::future::try_join3(
                self.user.import(&data.user),
                self.friends.import(&data.friends),
                self.pages.import(&data.pages),
            )
            .await?
        } else {
            let user = self.user.import(&data.user).await?;
            let friends = self.friends.import(&data.friends).await?;
            let pages = self.pages.import(&data.pages).await?;
            (user, friends, pages)
        };

        tracing::info!(
            "Import finished: {} categories, {} posts, {} friends, {} pages",
            categories.len(),
            posts.len(),
            friends.len(),
            pages.len()
        );

        Ok(ImportReport {
            user,
            friends,
            pages,
            categories,
            posts,
            comments,
        })
    }

    /// Export everything the services hold as a portable bundle
    #[instrument(name = "migrate_export", skip_all, fields(run_id = %Uuid::new_v4()))]
    pub async fn export(&self) -> Result<MigrateData, MigrateError> {
        let pages = self.pages.export().await?;
        let friends = self.friends.export().await?;
        let user = self.user.export().await?;
        let comments = self.comments.export().await?;
        let posts = self.posts.export().await?;
        let categories = self.categories.export().await?;

        tracing::info!(
            "Exported {} categories, {} posts, {} comments",
            categories.len(),
            posts.len(),
            comments.len()
        );

        Ok(MigrateData {
            user,
            friends,
            pages,
            categories,
            posts,
            comments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{call, Event, MemoryGateway};
    use crate::models::{CategoryRecord, CommentRecord};
    use serde_json::{json, Value};

    fn bundle() -> MigrateData {
        serde_json::from_value(json!({
            "user": {"username": "owner", "mail": "owner@example.com", "password": "pw"},
            "friends": [{"name": "alice", "url": "https://alice.example.com", "status": "approved"}],
            "pages": [{"title": "About", "slug": "about", "content": "Hi"}],
            "categories": [{"name": "Tech", "slug": "tech"}],
            "posts": [
                {"id": "old-p1", "title": "Hello", "slug": "hello", "content": "...", "categoryId": "tech"},
                {"id": "old-p2", "title": "Notes", "slug": "notes", "content": "...", "categoryId": "journal"}
            ],
            "comments": [
                {"id": "c1", "pid": "old-p1", "text": "first", "children": [
                    {"id": "c2", "parent": "c1", "text": "reply", "children": [
                        {"id": "c3", "parent": "c2", "text": "deeper"}
                    ]}
                ]},
                {"id": "c4", "pid": "hello", "text": "by slug"},
                {"id": "c5", "pid": "gone", "text": "lost"},
                {"id": "c6", "pid": "old-p2", "parent": "ghost", "text": "orphan"}
            ]
        }))
        .expect("Failed to parse test bundle")
    }

    /// (text, parent text) for every comment, sorted
    async fn thread_shape(gateway: &MemoryGateway) -> Vec<(String, Option<String>)> {
        let all: Vec<CommentRecord> = call(gateway, Event::CommentsGetAll, json!({})).await.unwrap();
        let text = |id: &str| {
            all.iter()
                .find(|c| c.id == id)
                .and_then(|c| c.extra.get("text"))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        let mut shape: Vec<_> = all
            .iter()
            .map(|c| (text(&c.id).unwrap_or_default(), c.parent.as_ref().and_then(|p| text(p.id()))))
            .collect();
        shape.sort();
        shape
    }

    fn expected_shape() -> Vec<(String, Option<String>)> {
        let mut shape = vec![
            ("first".to_string(), None),
            ("reply".to_string(), Some("first".to_string())),
            ("deeper".to_string(), Some("reply".to_string())),
            ("by slug".to_string(), None),
        ];
        shape.sort();
        shape
    }

    #[tokio::test]
    async fn test_full_import() {
        let gateway = Arc::new(MemoryGateway::new());
        let service = MigrateService::new(gateway.clone());

        let report = service.import(bundle()).await.unwrap();

        assert_eq!(report.user.username, "owner");
        assert_eq!(report.friends.len(), 1);
        assert_eq!(report.pages.len(), 1);
        let slugs: Vec<_> = report.categories.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["tech", "journal"]);
        assert_eq!(report.posts.len(), 2);
        assert_eq!(report.comments.post_error, vec!["gone"]);
        assert_eq!(report.comments.parent_error, vec!["ghost"]);
        assert_eq!(thread_shape(&gateway).await, expected_shape());
    }

    #[tokio::test]
    async fn test_categories_are_imported_before_anything_else() {
        let gateway = Arc::new(MemoryGateway::new());
        let service = MigrateService::new(gateway.clone());

        service.import(bundle()).await.unwrap();

        let events: Vec<Event> = gateway.calls().into_iter().map(|(e, _)| e).collect();
        let first_post = events.iter().position(|e| *e == Event::PostCreate).unwrap();
        let first_comment = events.iter().position(|e| *e == Event::CommentCreate).unwrap();
        let register = events.iter().position(|e| *e == Event::UserRegister).unwrap();
        assert_eq!(events[0], Event::CategoryGet);
        assert!(first_post < first_comment);
        assert!(first_comment < register);
    }

    #[tokio::test]
    async fn test_reimport_does_not_duplicate_keyed_entities() {
        let gateway = Arc::new(MemoryGateway::new());
        let service = MigrateService::new(gateway.clone());

        let first = service.import(bundle()).await.unwrap();
        let second = service.import(bundle()).await.unwrap();

        assert_eq!(second.user.id, first.user.id);
        assert_eq!(second.categories.len(), 2);
        assert_eq!(second.posts.len(), 2);
        assert_eq!(second.pages.len(), 1);
        assert_eq!(gateway.count(Event::UserRegister), 1);
        assert_eq!(gateway.count(Event::UserPatch), 1);
    }

    #[tokio::test]
    async fn test_category_failure_aborts_before_later_stages() {
        let gateway = Arc::new(MemoryGateway::new());
        let service = MigrateService::new(gateway.clone());
        gateway.fail_always(Event::CategoryCreate);

        let err = service.import(bundle()).await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(gateway.count(Event::PostCreate), 0);
        assert_eq!(gateway.count(Event::UserRegister), 0);
    }

    #[tokio::test]
    async fn test_failed_post_is_reported_through_comments() {
        let gateway = Arc::new(MemoryGateway::new());
        let service = MigrateService::new(gateway.clone());
        gateway.fail_when(Event::PostCreate, 500, |p| p["title"] == "Notes");

        let report = service.import(bundle()).await.unwrap();

        assert_eq!(report.posts.len(), 1);
        assert_eq!(report.comments.post_error, vec!["gone", "old-p2"]);
        assert!(report.comments.parent_error.is_empty());
        assert_eq!(report.pages.len(), 1);
    }

    #[tokio::test]
    async fn test_parallel_independent_stages() {
        let sequential = MigrateService::new(Arc::new(MemoryGateway::new()))
            .import(bundle())
            .await
            .unwrap();
        let gateway = Arc::new(MemoryGateway::new());
        let config = MigrateConfig {
            parallel_independent: true,
        };

        let parallel = MigrateService::with_config(gateway.clone(), config)
            .import(bundle())
            .await
            .unwrap();

        assert_eq!(parallel.comments, sequential.comments);
        assert_eq!(parallel.user.username, sequential.user.username);
        assert_eq!(parallel.friends.len(), sequential.friends.len());
        assert_eq!(parallel.pages.len(), sequential.pages.len());
        assert_eq!(thread_shape(&gateway).await, expected_shape());
    }

    #[tokio::test]
    async fn test_export_reimports_into_fresh_services() {
        let source = Arc::new(MemoryGateway::new());
        MigrateService::new(source.clone()).import(bundle()).await.unwrap();
        let exported = MigrateService::new(source).export().await.unwrap();

        assert_eq!(exported.user.password, None);
        for (title, slug) in [("Hello", "tech"), ("Notes", "journal")] {
            let post = exported.posts.iter().find(|p| p.title == title).unwrap();
            assert_eq!(post.category_id, slug);
            assert_eq!(post.category.as_deref(), Some(slug));
        }
        assert!(exported.comments.iter().all(|c| c.id.is_some()));

        // Shift the target's id sequence so source ids mean nothing there
        let target = Arc::new(MemoryGateway::new());
        let _: CategoryRecord = call(target.as_ref(), Event::CategoryCreate, json!({"name": "Misc", "slug": "misc"}))
            .await
            .unwrap();
        let report = MigrateService::new(target.clone()).import(exported).await.unwrap();

        assert!(report.comments.is_clean());
        assert_eq!(report.posts.len(), 2);
        assert_eq!(report.categories.len(), 3);
        assert_eq!(thread_shape(&target).await, expected_shape());
    }

    #[tokio::test]
    async fn test_export_performs_no_writes() {
        let gateway = Arc::new(MemoryGateway::new());
        let service = MigrateService::new(gateway.clone());
        service.import(bundle()).await.unwrap();
        let before = gateway.calls().len();

        service.export().await.unwrap();

        let writes = gateway.calls()[before..]
            .iter()
            .filter(|(e, _)| {
                matches!(
                    e,
                    Event::UserRegister
                        | Event::UserPatch
                        | Event::FriendCreate
                        | Event::PageCreate
                        | Event::CategoryCreate
                        | Event::PostCreate
                        | Event::CommentCreate
                )
            })
            .count();
        assert_eq!(writes, 0);
    }
}
