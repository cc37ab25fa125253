//! Master user model
//!
//! A site has exactly one master user; the bundle carries its profile.

use super::Extra;
use serde::{Deserialize, Serialize};

/// Master profile as stored in a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrateUser {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,
    /// Only present on import bundles; services never echo it back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Master user as echoed by the user service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl From<UserRecord> for MigrateUser {
    fn from(record: UserRecord) -> Self {
        Self {
            username: record.username,
            name: record.name,
            mail: record.mail,
            password: None,
            extra: record.extra,
        }
    }
}
