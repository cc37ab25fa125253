//! User pipeline
//!
//! A site has exactly one owner account (the master user). Import upserts it:
//! the bundle's user is registered when the user service has no master yet,
//! and patched onto the existing master otherwise.

use super::MigrateError;
use crate::gateway::{call, Event, Gateway};
use crate::models::{MigrateUser, UserRecord};
use serde_json::json;
use std::sync::Arc;

/// User pipeline
pub struct UserPipeline {
    gateway: Arc<dyn Gateway>,
}

impl UserPipeline {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Register or update the master user.
    ///
    /// A patch never carries the bundle's password; an existing owner keeps
    /// their credentials.
    ///
    /// # Errors
    /// Fails on any lookup error other than "not found", and on any failed
    /// register or patch.
    pub async fn import(&self, user: &MigrateUser) -> Result<UserRecord, MigrateError> {
        let gateway = self.gateway.as_ref();

        match self.master().await {
            Ok(existing) => {
                tracing::debug!("Master user '{}' exists, patching", existing.username);
                let mut patch = user.clone();
                patch.password = None;
                Ok(call(gateway, Event::UserPatch, serde_json::to_value(&patch)?).await?)
            }
            Err(MigrateError::Gateway(e)) if e.is_not_found() => {
                tracing::debug!("No master user, registering '{}'", user.username);
                Ok(call(gateway, Event::UserRegister, serde_json::to_value(user)?).await?)
            }
            Err(e) => Err(e),
        }
    }

    /// The master user as portable data (without password)
    pub async fn export(&self) -> Result<MigrateUser, MigrateError> {
        Ok(self.master().await?.into())
    }

    async fn master(&self) -> Result<UserRecord, MigrateError> {
        Ok(call(self.gateway.as_ref(), Event::UserGetMaster, json!({})).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;

    fn setup() -> (Arc<MemoryGateway>, UserPipeline) {
        let gateway = Arc::new(MemoryGateway::new());
        let pipeline = UserPipeline::new(gateway.clone());
        (gateway, pipeline)
    }

    fn owner(mail: &str) -> MigrateUser {
        MigrateUser {
            username: "owner".into(),
            name: Some("Site Owner".into()),
            mail: Some(mail.into()),
            password: Some("secret".into()),
            extra: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_first_import_registers() {
        let (gateway, pipeline) = setup();

        let record = pipeline.import(&owner("a@example.com")).await.unwrap();

        assert_eq!(record.username, "owner");
        assert_eq!(gateway.count(Event::UserRegister), 1);
        assert_eq!(gateway.count(Event::UserPatch), 0);
    }

    #[tokio::test]
    async fn test_second_import_patches_same_master() {
        let (gateway, pipeline) = setup();
        let first = pipeline.import(&owner("a@example.com")).await.unwrap();

        let second = pipeline.import(&owner("b@example.com")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.mail.as_deref(), Some("b@example.com"));
        assert_eq!(gateway.count(Event::UserRegister), 1);
        let calls = gateway.calls();
        let (_, patch) = calls.iter().find(|(e, _)| *e == Event::UserPatch).unwrap();
        assert!(patch.get("password").is_none());
    }

    #[tokio::test]
    async fn test_master_after_reimport_is_one_updated_record() {
        let (gateway, pipeline) = setup();
        let first = pipeline.import(&owner("a@example.com")).await.unwrap();
        let mut renamed = owner("b@example.com");
        renamed.name = Some("New Name".into());

        pipeline.import(&renamed).await.unwrap();

        let master: UserRecord = call(gateway.as_ref(), Event::UserGetMaster, json!({})).await.unwrap();
        assert_eq!(master.id, first.id);
        assert_eq!(master.username, "owner");
        assert_eq!(master.mail.as_deref(), Some("b@example.com"));
        assert_eq!(master.name.as_deref(), Some("New Name"));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_not_treated_as_missing() {
        let (gateway, pipeline) = setup();
        gateway.fail_always(Event::UserGetMaster);

        let err = pipeline.import(&owner("a@example.com")).await.unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert_eq!(gateway.count(Event::UserRegister), 0);
    }

    #[tokio::test]
    async fn test_export_has_no_password() {
        let (_gateway, pipeline) = setup();
        pipeline.import(&owner("a@example.com")).await.unwrap();

        let exported = pipeline.export().await.unwrap();

        assert_eq!(exported.username, "owner");
        assert_eq!(exported.password, None);
        assert!(exported.extra.get("id").is_none());
    }
}
