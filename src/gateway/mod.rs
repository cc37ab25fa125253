//! Service gateway
//!
//! Every content service is addressed through a single request/response
//! contract: a named event plus a JSON payload, answered by a JSON value or
//! an error carrying a status code. Pipelines never talk to a service
//! directly; they only hold an `Arc<dyn Gateway>`.
//!
//! Two implementations ship with the crate:
//! - `HttpGateway` - posts events to `{service_url}/{event}` over HTTP
//! - `MemoryGateway` - simulates all services in-process (tests, dry runs)
//!
//! # Usage
//!
//! ```rust,ignore
//! use noteva_migrate::gateway::{create_gateway, call, Event};
//! use noteva_migrate::config::GatewayConfig;
//!
//! let gateway = create_gateway(&GatewayConfig::default())?;
//! let categories: Vec<CategoryRecord> = call(gateway.as_ref(), Event::CategoryGetAll, json!({})).await?;
//! ```

pub mod http;
pub mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::config::{GatewayConfig, GatewayDriver};

pub use http::HttpGateway;
pub use memory::MemoryGateway;

/// Status code services use for "no such entity"
pub const STATUS_NOT_FOUND: u16 = 404;

/// Target services reachable through the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    User,
    Friends,
    Page,
    Comments,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Friends => "friends",
            Self::Page => "page",
            Self::Comments => "comments",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events the migration tool sends.
///
/// Categories and posts live in the page service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    UserGetMaster,
    UserRegister,
    UserPatch,
    FriendCreate,
    FriendsGetAllByMaster,
    PageCreate,
    PagesGetAll,
    CategoryGet,
    CategoryCreate,
    CategoryGetAll,
    PostCreate,
    PostsListGetAll,
    CommentCreate,
    CommentsGetAll,
}

impl Event {
    /// Service that owns this event
    pub fn service(&self) -> Service {
        match self {
            Self::UserGetMaster | Self::UserRegister | Self::UserPatch => Service::User,
            Self::FriendCreate | Self::FriendsGetAllByMaster => Service::Friends,
            Self::PageCreate
            | Self::PagesGetAll
            | Self::CategoryGet
            | Self::CategoryCreate
            | Self::CategoryGetAll
            | Self::PostCreate
            | Self::PostsListGetAll => Service::Page,
            Self::CommentCreate | Self::CommentsGetAll => Service::Comments,
        }
    }

    /// Wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserGetMaster => "user.getMaster",
            Self::UserRegister => "user.register",
            Self::UserPatch => "user.patch",
            Self::FriendCreate => "friend.create",
            Self::FriendsGetAllByMaster => "friends.getAllByMaster",
            Self::PageCreate => "page.create",
            Self::PagesGetAll => "pages.getAll",
            Self::CategoryGet => "category.get",
            Self::CategoryCreate => "category.create",
            Self::CategoryGetAll => "category.getAll",
            Self::PostCreate => "post.create",
            Self::PostsListGetAll => "posts.list.getAll",
            Self::CommentCreate => "comment.create",
            Self::CommentsGetAll => "comments.getAll",
        }
    }

    /// Parse a wire name back into an event
    pub fn from_wire(name: &str) -> Option<Self> {
        const ALL: [Event; 14] = [
            Event::UserGetMaster,
            Event::UserRegister,
            Event::UserPatch,
            Event::FriendCreate,
            Event::FriendsGetAllByMaster,
            Event::PageCreate,
            Event::PagesGetAll,
            Event::CategoryGet,
            Event::CategoryCreate,
            Event::CategoryGetAll,
            Event::PostCreate,
            Event::PostsListGetAll,
            Event::CommentCreate,
            Event::CommentsGetAll,
        ];
        ALL.into_iter().find(|e| e.as_str() == name)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types for gateway calls
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The service answered with an error status
    #[error("{service} rejected '{event}' with status {code}: {message}")]
    Status {
        service: Service,
        event: String,
        code: u16,
        message: String,
    },

    /// The request never produced an answer
    #[error("Transport failure calling {service}: {message}")]
    Transport { service: Service, message: String },

    /// The answer did not have the expected shape
    #[error("Unexpected response to '{event}': {source}")]
    Decode {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

impl GatewayError {
    /// Status code carried by the error, if the service answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the service reported the entity as missing
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(STATUS_NOT_FOUND)
    }
}

/// Request/response transport to the content services
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Send a named event with a payload to a service and wait for its answer
    async fn send(&self, service: Service, event: &str, payload: Value) -> Result<Value, GatewayError>;
}

/// Send `event` to its owning service and decode the answer into `T`
pub async fn call<T: DeserializeOwned>(
    gateway: &dyn Gateway,
    event: Event,
    payload: Value,
) -> Result<T, GatewayError> {
    let value = gateway.send(event.service(), event.as_str(), payload).await?;
    tracing::debug!("{} answered '{}'", event.service(), event);
    serde_json::from_value(value).map_err(|source| GatewayError::Decode {
        event: event.as_str().to_string(),
        source,
    })
}

/// Create a gateway based on configuration
pub fn create_gateway(config: &GatewayConfig) -> anyhow::Result<Arc<dyn Gateway>> {
    match config.driver {
        GatewayDriver::Http => {
            tracing::info!("Using HTTP gateway at {}", config.base_url);
            Ok(Arc::new(HttpGateway::new(config)?))
        }
        GatewayDriver::Memory => {
            tracing::info!("Using in-memory gateway");
            Ok(Arc::new(MemoryGateway::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_service_routing() {
        assert_eq!(Event::UserGetMaster.service(), Service::User);
        assert_eq!(Event::FriendCreate.service(), Service::Friends);
        assert_eq!(Event::CategoryGet.service(), Service::Page);
        assert_eq!(Event::PostsListGetAll.service(), Service::Page);
        assert_eq!(Event::CommentCreate.service(), Service::Comments);
    }

    #[test]
    fn test_event_wire_names_parse_back() {
        for name in ["user.getMaster", "category.get", "posts.list.getAll", "comments.getAll"] {
            let event = Event::from_wire(name).expect("known event");
            assert_eq!(event.as_str(), name);
        }
        assert!(Event::from_wire("post.delete").is_none());
    }

    #[test]
    fn test_not_found_detection() {
        let missing = GatewayError::Status {
            service: Service::User,
            event: "user.getMaster".into(),
            code: 404,
            message: "no master".into(),
        };
        let broken = GatewayError::Transport {
            service: Service::User,
            message: "connection refused".into(),
        };

        assert!(missing.is_not_found());
        assert_eq!(missing.status(), Some(404));
        assert!(!broken.is_not_found());
        assert_eq!(broken.status(), None);
    }
}
