//! Friend link model

use super::Extra;
use serde::{Deserialize, Serialize};

/// Friend link as stored in a bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrateFriend {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// Moderation status; services decide it unless the link is master-authored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Friend link as echoed by the friends service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendRecord {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl From<FriendRecord> for MigrateFriend {
    fn from(record: FriendRecord) -> Self {
        Self {
            name: record.name,
            url: record.url,
            avatar: record.avatar,
            status: record.status,
            extra: record.extra,
        }
    }
}
