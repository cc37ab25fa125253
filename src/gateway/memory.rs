//! In-memory gateway
//!
//! Simulates the user, friends, page and comments services inside the
//! process. The simulation follows the services' observable contract closely
//! enough to exercise a migration end to end:
//! - ids are 24-hex-digit object ids assigned on create
//! - `category.get` / `user.getMaster` answer 404 for missing entities
//! - duplicate category and page slugs are rejected with 409
//! - posts and comments must reference existing records (400 otherwise)
//! - listed posts embed their category, listed comments embed their parent
//!
//! Failures can be injected per event with `fail_when`, and every call is
//! recorded for inspection.

use super::{Event, Gateway, GatewayError, Service, STATUS_NOT_FOUND};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::{Mutex, MutexGuard};

const STATUS_BAD_REQUEST: u16 = 400;
const STATUS_CONFLICT: u16 = 409;
const STATUS_UNAVAILABLE: u16 = 503;

type Object = Map<String, Value>;
type Predicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;

struct Failure {
    event: Event,
    code: u16,
    predicate: Predicate,
}

#[derive(Default)]
struct State {
    next_id: u64,
    master: Option<Object>,
    friends: Vec<Object>,
    pages: Vec<Object>,
    categories: Vec<Object>,
    posts: Vec<Object>,
    comments: Vec<Object>,
    failures: Vec<Failure>,
    calls: Vec<(Event, Value)>,
}

/// In-process stand-in for every content service
#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<State>,
}

impl std::fmt::Debug for MemoryGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryGateway").finish_non_exhaustive()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make `event` fail with `code` whenever `predicate` accepts its payload
    pub fn fail_when<F>(&self, event: Event, code: u16, predicate: F)
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.lock().failures.push(Failure {
            event,
            code,
            predicate: Box::new(predicate),
        });
    }

    /// Make every `event` fail with 503
    pub fn fail_always(&self, event: Event) {
        self.fail_when(event, STATUS_UNAVAILABLE, |_| true);
    }

    /// Payloads of every call made so far, in order
    pub fn calls(&self) -> Vec<(Event, Value)> {
        self.lock().calls.clone()
    }

    /// Number of times `event` was sent
    pub fn count(&self, event: Event) -> usize {
        self.lock().calls.iter().filter(|(e, _)| *e == event).count()
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn send(&self, service: Service, event: &str, payload: Value) -> Result<Value, GatewayError> {
        let parsed = Event::from_wire(event).filter(|e| e.service() == service);
        let Some(event) = parsed else {
            return Err(reject(service, event, STATUS_NOT_FOUND, "No handler for event"));
        };

        let mut state = self.lock();
        state.calls.push((event, payload.clone()));

        if let Some(failure) = state
            .failures
            .iter()
            .find(|f| f.event == event && (f.predicate)(&payload))
        {
            return Err(reject(service, event.as_str(), failure.code, "Injected failure"));
        }

        state.handle(event, payload)
    }
}

fn reject(service: Service, event: &str, code: u16, message: impl Into<String>) -> GatewayError {
    GatewayError::Status {
        service,
        event: event.to_string(),
        code,
        message: message.into(),
    }
}

fn as_object(event: Event, value: Value) -> Result<Object, GatewayError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(reject(event.service(), event.as_str(), STATUS_BAD_REQUEST, "Payload must be an object")),
    }
}

fn str_field<'a>(object: &'a Object, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn find_by<'a>(records: &'a [Object], key: &str, value: &str) -> Option<&'a Object> {
    records.iter().find(|r| str_field(r, key) == Some(value))
}

fn list(records: &[Object]) -> Value {
    Value::Array(records.iter().cloned().map(Value::Object).collect())
}

impl State {
    fn mint_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:024x}", 0x5f00_0000_0000_0000_u64 + self.next_id)
    }

    fn handle(&mut self, event: Event, payload: Value) -> Result<Value, GatewayError> {
        let bad = |message: &str| reject(event.service(), event.as_str(), STATUS_BAD_REQUEST, message);
        let missing = |message: &str| reject(event.service(), event.as_str(), STATUS_NOT_FOUND, message);
        let conflict = |message: &str| reject(event.service(), event.as_str(), STATUS_CONFLICT, message);

        match event {
            Event::UserGetMaster => self
                .master
                .clone()
                .map(Value::Object)
                .ok_or_else(|| missing("Master user not found")),

            Event::UserRegister => {
                if self.master.is_some() {
                    return Err(conflict("Master user already registered"));
                }
                let mut user = as_object(event, payload)?;
                if str_field(&user, "username").is_none() {
                    return Err(bad("username is required"));
                }
                user.remove("password");
                user.insert("id".into(), Value::String(self.mint_id()));
                self.master = Some(user.clone());
                Ok(Value::Object(user))
            }

            Event::UserPatch => {
                let patch = as_object(event, payload)?;
                let master = self.master.as_mut().ok_or_else(|| missing("Master user not found"))?;
                for (key, value) in patch {
                    if key != "id" && key != "password" {
                        master.insert(key, value);
                    }
                }
                Ok(Value::Object(master.clone()))
            }

            Event::FriendCreate => {
                let mut payload = as_object(event, payload)?;
                let is_master = payload.get("isMaster").and_then(Value::as_bool).unwrap_or(false);
                let mut friend = match payload.remove("data") {
                    Some(data) => as_object(event, data)?,
                    None => return Err(bad("data is required")),
                };
                if str_field(&friend, "url").is_none() {
                    return Err(bad("url is required"));
                }
                if !is_master || str_field(&friend, "status").is_none() {
                    let status = if is_master { "approved" } else { "pending" };
                    friend.insert("status".into(), json!(status));
                }
                friend.insert("id".into(), Value::String(self.mint_id()));
                self.friends.push(friend.clone());
                Ok(Value::Object(friend))
            }

            Event::FriendsGetAllByMaster => Ok(list(&self.friends)),

            Event::PageCreate => {
                let mut page = as_object(event, payload)?;
                let slug = str_field(&page, "slug").ok_or_else(|| bad("slug is required"))?;
                if find_by(&self.pages, "slug", slug).is_some() {
                    return Err(conflict("Page slug already exists"));
                }
                page.insert("id".into(), Value::String(self.mint_id()));
                self.pages.push(page.clone());
                Ok(Value::Object(page))
            }

            Event::PagesGetAll => Ok(list(&self.pages)),

            Event::CategoryGet => {
                let query = as_object(event, payload)?;
                let key = str_field(&query, "_query").ok_or_else(|| bad("_query is required"))?;
                find_by(&self.categories, "slug", key)
                    .or_else(|| find_by(&self.categories, "id", key))
                    .cloned()
                    .map(Value::Object)
                    .ok_or_else(|| missing("Category not found"))
            }

            Event::CategoryCreate => {
                let mut category = as_object(event, payload)?;
                if str_field(&category, "name").is_none() {
                    return Err(bad("name is required"));
                }
                let slug = str_field(&category, "slug").ok_or_else(|| bad("slug is required"))?;
                if find_by(&self.categories, "slug", slug).is_some() {
                    return Err(conflict("Category slug already exists"));
                }
                category.insert("id".into(), Value::String(self.mint_id()));
                self.categories.push(category.clone());
                Ok(Value::Object(category))
            }

            Event::CategoryGetAll => Ok(list(&self.categories)),

            Event::PostCreate => {
                let mut post = as_object(event, payload)?;
                if str_field(&post, "title").is_none() {
                    return Err(bad("title is required"));
                }
                let category_id = str_field(&post, "categoryId").ok_or_else(|| bad("categoryId is required"))?;
                if find_by(&self.categories, "id", category_id).is_none() {
                    return Err(bad("Category not found"));
                }
                if let Some(slug) = str_field(&post, "slug") {
                    if find_by(&self.posts, "slug", slug).is_some() {
                        return Err(conflict("Post slug already exists"));
                    }
                }
                post.remove("category");
                post.insert("id".into(), Value::String(self.mint_id()));
                self.posts.push(post.clone());
                Ok(Value::Object(post))
            }

            Event::PostsListGetAll => {
                let posts = self
                    .posts
                    .iter()
                    .map(|post| {
                        let mut post = post.clone();
                        let category = str_field(&post, "categoryId")
                            .and_then(|id| find_by(&self.categories, "id", id))
                            .cloned();
                        if let Some(category) = category {
                            post.insert("category".into(), Value::Object(category));
                        }
                        Value::Object(post)
                    })
                    .collect();
                Ok(Value::Array(posts))
            }

            Event::CommentCreate => {
                let mut payload = as_object(event, payload)?;
                let mut comment = match payload.remove("data") {
                    Some(data) => as_object(event, data)?,
                    None => return Err(bad("data is required")),
                };
                let pid = str_field(&comment, "pid").ok_or_else(|| bad("pid is required"))?;
                if find_by(&self.posts, "id", pid).is_none() {
                    return Err(bad("Post not found"));
                }
                let parent = str_field(&comment, "parent").map(str::to_string);
                if let Some(ref parent) = parent {
                    if find_by(&self.comments, "id", parent).is_none() {
                        return Err(bad("Parent comment not found"));
                    }
                }

                let id = self.mint_id();
                comment.remove("children");
                comment.insert("id".into(), Value::String(id.clone()));
                comment.insert("children".into(), json!([]));

                if let Some(parent) = parent {
                    if let Some(parent) = self.comments.iter_mut().find(|c| str_field(c, "id") == Some(parent.as_str())) {
                        if let Some(Value::Array(children)) = parent.get_mut("children") {
                            children.push(Value::String(id));
                        }
                    }
                }

                self.comments.push(comment.clone());
                Ok(Value::Object(comment))
            }

            Event::CommentsGetAll => {
                let comments = self
                    .comments
                    .iter()
                    .map(|comment| {
                        let mut comment = comment.clone();
                        let parent = str_field(&comment, "parent")
                            .and_then(|id| find_by(&self.comments, "id", id))
                            .map(|p| {
                                let mut embedded = p.clone();
                                embedded.remove("children");
                                embedded
                            });
                        if let Some(parent) = parent {
                            comment.insert("parent".into(), Value::Object(parent));
                        }
                        Value::Object(comment)
                    })
                    .collect();
                Ok(Value::Array(comments))
            }
        }
    }
}
