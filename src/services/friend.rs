//! Friend link pipeline

use super::MigrateError;
use crate::gateway::{call, Event, Gateway};
use crate::models::{FriendRecord, MigrateFriend};
use serde_json::{json, Value};
use std::sync::Arc;

/// Friend link pipeline
pub struct FriendPipeline {
    gateway: Arc<dyn Gateway>,
}

impl FriendPipeline {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Create every friend link as the site owner, so links keep their
    /// exported status instead of going back to review.
    ///
    /// # Errors
    /// The first failed create aborts the import.
    pub async fn import(&self, friends: &[MigrateFriend]) -> Result<Vec<FriendRecord>, MigrateError> {
        for friend in friends {
            let payload = json!({ "data": serde_json::to_value(friend)?, "isMaster": true });
            let _: Value = call(self.gateway.as_ref(), Event::FriendCreate, payload).await?;
        }
        tracing::debug!("Imported {} friend links", friends.len());

        self.list().await
    }

    pub async fn export(&self) -> Result<Vec<MigrateFriend>, MigrateError> {
        Ok(self.list().await?.into_iter().map(Into::into).collect())
    }

    /// Every friend link regardless of status
    pub async fn list(&self) -> Result<Vec<FriendRecord>, MigrateError> {
        Ok(call(self.gateway.as_ref(), Event::FriendsGetAllByMaster, json!({ "all": true })).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;

    fn friend(name: &str, status: Option<&str>) -> MigrateFriend {
        MigrateFriend {
            name: name.into(),
            url: format!("https://{}.example.com", name),
            avatar: None,
            status: status.map(str::to_string),
            extra: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_import_keeps_status_and_sends_as_master() {
        let gateway = Arc::new(MemoryGateway::new());
        let pipeline = FriendPipeline::new(gateway.clone());

        let all = pipeline
            .import(&[friend("alice", Some("rejected")), friend("bob", None)])
            .await
            .unwrap();

        assert_eq!(all.len(), 2);
        assert_eq!(all[0].status.as_deref(), Some("rejected"));
        assert_eq!(all[1].status.as_deref(), Some("approved"));
        for (_, payload) in gateway.calls().iter().filter(|(e, _)| *e == Event::FriendCreate) {
            assert_eq!(payload["isMaster"], true);
        }
    }

    #[tokio::test]
    async fn test_failure_aborts() {
        let gateway = Arc::new(MemoryGateway::new());
        let pipeline = FriendPipeline::new(gateway.clone());
        gateway.fail_when(Event::FriendCreate, 500, |p| p["data"]["name"] == "alice");

        let err = pipeline
            .import(&[friend("alice", None), friend("bob", None)])
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert_eq!(gateway.count(Event::FriendCreate), 1);
    }

    #[tokio::test]
    async fn test_export_strips_ids() {
        let gateway = Arc::new(MemoryGateway::new());
        let pipeline = FriendPipeline::new(gateway.clone());
        pipeline.import(&[friend("alice", Some("approved"))]).await.unwrap();

        let exported = pipeline.export().await.unwrap();

        assert_eq!(exported, vec![friend("alice", Some("approved"))]);
    }
}
