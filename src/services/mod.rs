//! Services layer - migration pipelines
//!
//! Each entity type has a pipeline that knows how to push a bundle's entities
//! into its owning service and how to pull them back out as portable data.
//! `MigrateService` sequences the pipelines for a full run.
//!
//! Pipelines differ in how much failure they absorb:
//! - categories, friends, user: any unexpected error aborts the run
//! - posts, pages: a failed create is logged and skipped
//! - comments: unresolved references are collected into a `CommentReport`

pub mod category;
pub mod comment;
pub mod friend;
pub mod migrate;
pub mod page;
pub mod post;
pub mod user;

pub use category::{CategoryPipeline, CategoryRef, CategoryResolver};
pub use comment::CommentPipeline;
pub use friend::FriendPipeline;
pub use migrate::MigrateService;
pub use page::PagePipeline;
pub use post::{ImportedPosts, PostPipeline};
pub use user::UserPipeline;

use crate::gateway::GatewayError;

/// Error types for migration runs
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// A service call failed in a way the pipeline does not tolerate
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// A bundle entity could not be encoded as a request payload
    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl MigrateError {
    /// Status code of the underlying service error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Gateway(e) => e.status(),
            _ => None,
        }
    }
}
