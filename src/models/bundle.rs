//! Migration bundle and import report

use super::{
    CategoryRecord, FriendRecord, MigrateCategory, MigrateComment, MigrateFriend, MigratePage,
    MigratePost, MigrateUser, PageRecord, PostRecord, UserRecord,
};
use serde::{Deserialize, Serialize};

/// Everything one import or export run moves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrateData {
    pub user: MigrateUser,
    #[serde(default)]
    pub friends: Vec<MigrateFriend>,
    #[serde(default)]
    pub pages: Vec<MigratePage>,
    #[serde(default)]
    pub categories: Vec<MigrateCategory>,
    #[serde(default)]
    pub posts: Vec<MigratePost>,
    #[serde(default)]
    pub comments: Vec<MigrateComment>,
}

/// References the comment pipeline could not resolve
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentReport {
    /// `pid`s that matched no post
    pub post_error: Vec<String>,
    /// `parent` keys that matched no imported comment
    pub parent_error: Vec<String>,
}

impl CommentReport {
    pub fn is_clean(&self) -> bool {
        self.post_error.is_empty() && self.parent_error.is_empty()
    }

    /// Note an unknown post reference, once per distinct value
    pub fn record_post_error(&mut self, pid: &str) {
        push_unique(&mut self.post_error, pid);
    }

    /// Note an unknown parent reference, once per distinct value
    pub fn record_parent_error(&mut self, parent: &str) {
        push_unique(&mut self.parent_error, parent);
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// Result of an import run: the authoritative state of every service after
/// the run, except for comments, which report what could not be linked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub user: UserRecord,
    pub friends: Vec<FriendRecord>,
    pub pages: Vec<PageRecord>,
    pub categories: Vec<CategoryRecord>,
    pub posts: Vec<PostRecord>,
    pub comments: CommentReport,
}
