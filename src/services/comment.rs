//! Comment pipeline
//!
//! Comments arrive as a forest flattened into a list: threads hang off posts
//! through `pid`, replies point at their parent through `parent` or sit
//! nested in their parent's `children`. The comments service assigns new ids,
//! so a reply can only be created once its parent exists and its new id is
//! known. Import therefore proceeds one thread depth at a time:
//!
//! 1. translate every `pid` to the id of an existing post
//! 2. create the current level with ids cleared
//! 3. re-fetch all comments and record original key -> new id for every
//!    create the service confirms
//! 4. move on to the replies of that level, pointing each at its parent's
//!    new id
//!
//! References that cannot be resolved are not fatal; they are collected in
//! the returned `CommentReport`.

use super::MigrateError;
use crate::gateway::{call, Event, Gateway};
use crate::models::{
    CommentChild, CommentRecord, CommentReport, Extra, IdMap, MigrateComment, PostRecord,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Where a comment hangs in the thread forest
#[derive(Debug, Clone, PartialEq)]
enum Placement {
    /// Top-level comment of a thread
    Root,
    /// Reply to the node at this index
    Reply(usize),
    /// Reply to a comment that is not in the bundle
    Orphan(String),
}

#[derive(Debug)]
struct ThreadNode {
    /// Original id, or a positional key for comments exported without one
    key: String,
    pid: String,
    placement: Placement,
    fields: Extra,
}

/// A bundle's comments arranged as a forest of arena-indexed nodes
#[derive(Debug, Default)]
struct Forest {
    nodes: Vec<ThreadNode>,
    replies: Vec<Vec<usize>>,
}

enum Link {
    Top,
    Nested(usize),
    Key(String),
}

impl Forest {
    /// Arrange `comments` into a forest.
    ///
    /// Nested replies inherit the enclosing comment's `pid` when they carry
    /// none. A comment listed twice (flat and nested) becomes one node.
    fn build(comments: &[MigrateComment]) -> Self {
        let mut nodes: Vec<(ThreadNode, Link)> = Vec::new();
        let mut by_key: HashMap<String, usize> = HashMap::new();
        let mut stack: Vec<(&MigrateComment, Option<usize>)> =
            comments.iter().rev().map(|c| (c, None)).collect();

        while let Some((comment, enclosing)) = stack.pop() {
            let original = comment.id.as_deref().filter(|id| !id.is_empty());
            let index = match original.and_then(|id| by_key.get(id)) {
                Some(&existing) => existing,
                None => {
                    let index = nodes.len();
                    let key = original.map(str::to_string).unwrap_or_else(|| format!("#{}", index));
                    let pid = match enclosing {
                        Some(outer) if comment.pid.is_empty() => nodes[outer].0.pid.clone(),
                        _ => comment.pid.clone(),
                    };
                    let link = match (enclosing, comment.parent.as_deref()) {
                        (Some(outer), _) => Link::Nested(outer),
                        (None, Some(parent)) if !parent.is_empty() => Link::Key(parent.to_string()),
                        _ => Link::Top,
                    };
                    by_key.insert(key.clone(), index);
                    nodes.push((
                        ThreadNode {
                            key,
                            pid,
                            placement: Placement::Root,
                            fields: comment.extra.clone(),
                        },
                        link,
                    ));
                    index
                }
            };

            for child in comment.children.iter().rev() {
                if let CommentChild::Node(nested) = child {
                    stack.push((&**nested, Some(index)));
                }
            }
        }

        let mut replies = vec![Vec::new(); nodes.len()];
        let nodes: Vec<ThreadNode> = nodes
            .into_iter()
            .enumerate()
            .map(|(index, (mut node, link))| {
                node.placement = match link {
                    Link::Top => Placement::Root,
                    Link::Nested(parent) => Placement::Reply(parent),
                    Link::Key(key) => match by_key.get(&key) {
                        Some(&parent) => Placement::Reply(parent),
                        None => Placement::Orphan(key),
                    },
                };
                if let Placement::Reply(parent) = node.placement {
                    replies[parent].push(index);
                }
                node
            })
            .collect();

        Self { nodes, replies }
    }

    fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.placement == Placement::Root)
            .map(|(i, _)| i)
    }
}

/// Comment pipeline
pub struct CommentPipeline {
    gateway: Arc<dyn Gateway>,
}

impl CommentPipeline {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Import `comments` level by level.
    ///
    /// `post_translations` maps original post ids/slugs to the ids the post
    /// pipeline just created; posts already in the service resolve by their
    /// own id or slug.
    ///
    /// # Errors
    /// Unresolved post and parent references end up in the report. A failed
    /// comment create aborts the import.
    pub async fn import(
        &self,
        comments: &[MigrateComment],
        post_translations: &IdMap,
    ) -> Result<CommentReport, MigrateError> {
        let mut report = CommentReport::default();
        let forest = Forest::build(comments);

        // Step 1: translate pid to the service's post id
        let post_ids = self.post_ids(post_translations).await?;
        let posts: Vec<Option<String>> = forest
            .nodes
            .iter()
            .map(|node| match post_ids.get(&node.pid) {
                Some(id) => Some(id.to_string()),
                None => {
                    report.record_post_error(&node.pid);
                    None
                }
            })
            .collect();

        for (index, node) in forest.nodes.iter().enumerate() {
            if let (Placement::Orphan(parent), Some(_)) = (&node.placement, &posts[index]) {
                report.record_parent_error(parent);
            }
        }

        // Step 2: create one depth level at a time
        let mut parents = IdMap::new();
        let mut visited = vec![false; forest.nodes.len()];
        let mut level: Vec<usize> = forest.roots().filter(|&i| posts[i].is_some()).collect();
        let mut depth = 0usize;

        while !level.is_empty() {
            tracing::debug!("Importing {} comments at depth {}", level.len(), depth);
            let mut receipts: Vec<(usize, String)> = Vec::new();

            for &index in &level {
                visited[index] = true;
                let node = &forest.nodes[index];
                let Some(post_id) = posts[index].as_deref() else {
                    continue;
                };

                let parent_id = match node.placement {
                    Placement::Reply(parent) => {
                        let parent_key = &forest.nodes[parent].key;
                        match parents.get(parent_key) {
                            Some(id) => Some(id.to_string()),
                            None => {
                                report.record_parent_error(parent_key);
                                continue;
                            }
                        }
                    }
                    _ => None,
                };

                let echo = self.create(node, post_id, parent_id.as_deref()).await?;
                match serde_json::from_value::<CommentRecord>(echo) {
                    Ok(created) => receipts.push((index, created.id)),
                    Err(e) => tracing::warn!("Comment '{}' was created but no id came back: {}", node.key, e),
                }
            }

            if !receipts.is_empty() {
                let confirmed: HashSet<String> = self.list().await?.into_iter().map(|c| c.id).collect();
                for (index, id) in receipts {
                    let key = &forest.nodes[index].key;
                    if confirmed.contains(&id) {
                        parents.insert(key.as_str(), id);
                    } else {
                        tracing::warn!("Comment '{}' ({}) is missing after create", key, id);
                    }
                }
            }

            level = level
                .iter()
                .flat_map(|&i| forest.replies[i].iter().copied())
                .filter(|&i| !visited[i])
                .collect();
            depth += 1;
        }

        // Replies never reached: under a dropped comment or in a parent cycle
        for (index, node) in forest.nodes.iter().enumerate() {
            if visited[index] || posts[index].is_none() {
                continue;
            }
            if let Placement::Reply(parent) = node.placement {
                report.record_parent_error(&forest.nodes[parent].key);
            }
        }

        if !report.is_clean() {
            tracing::warn!(
                "Comment import left {} unknown posts and {} unknown parents",
                report.post_error.len(),
                report.parent_error.len()
            );
        }
        Ok(report)
    }

    /// All comments with parent and children flattened to ids
    pub async fn export(&self) -> Result<Vec<MigrateComment>, MigrateError> {
        Ok(self.list().await?.into_iter().map(Into::into).collect())
    }

    /// Authoritative comment list
    pub async fn list(&self) -> Result<Vec<CommentRecord>, MigrateError> {
        Ok(call(self.gateway.as_ref(), Event::CommentsGetAll, json!({})).await?)
    }

    async fn post_ids(&self, translations: &IdMap) -> Result<IdMap, MigrateError> {
        let posts: Vec<PostRecord> = call(self.gateway.as_ref(), Event::PostsListGetAll, json!({})).await?;
        let mut ids = IdMap::new();
        for post in &posts {
            ids.insert(post.id.as_str(), post.id.as_str());
            if let Some(ref slug) = post.slug {
                ids.insert(slug.as_str(), post.id.as_str());
            }
        }
        ids.extend(translations);
        Ok(ids)
    }

    async fn create(&self, node: &ThreadNode, post_id: &str, parent_id: Option<&str>) -> Result<Value, MigrateError> {
        let mut data = node.fields.clone();
        data.insert("pid".into(), json!(post_id));
        if let Some(parent_id) = parent_id {
            data.insert("parent".into(), json!(parent_id));
        }

        // Replies carry `master` too, so no imported comment enters moderation
        let payload = json!({ "data": Value::Object(data), "master": true });
        Ok(call(self.gateway.as_ref(), Event::CommentCreate, payload).await?)
    }
}
