//! Posts and post lists.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single message on the platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    /// Server-assigned identifier.
    #[serde(default)]
    pub id: String,
    /// Creation time in milliseconds since the Unix epoch.
    #[serde(default)]
    pub create_at: i64,
    /// Last update time in milliseconds since the Unix epoch.
    #[serde(default)]
    pub update_at: i64,
    /// Last edit time in milliseconds; zero if never edited.
    #[serde(default)]
    pub edit_at: i64,
    /// Deletion time in milliseconds; zero while the post is live.
    #[serde(default)]
    pub delete_at: i64,
    /// Whether the post is pinned to its channel.
    #[serde(default)]
    pub is_pinned: bool,
    /// Author identifier.
    #[serde(default)]
    pub user_id: String,
    /// Channel the post belongs to.
    #[serde(default)]
    pub channel_id: String,
    /// Thread root; empty when the post is not a reply.
    #[serde(default)]
    pub root_id: String,
    /// Message body (markdown).
    #[serde(default)]
    pub message: String,
    /// System post type; empty for regular user posts.
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl Post {
    /// True when the post is a reply inside a thread.
    #[must_use]
    pub const fn is_reply(&self) -> bool {
        !self.root_id.is_empty()
    }
}

/// Body for `POST /posts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatePostRequest {
    /// Target channel.
    pub channel_id: String,
    /// Message body.
    pub message: String,
    /// Thread root to reply to; omitted for top-level posts.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub root_id: String,
}

/// Page of posts for a channel (`GET /channels/{id}/posts`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostList {
    /// Post identifiers, newest first.
    #[serde(default)]
    pub order: Vec<String>,
    /// Posts keyed by identifier.
    #[serde(default)]
    pub posts: HashMap<String, Post>,
    /// Cursor for the next (older) page, when the server provides one.
    #[serde(default)]
    pub next_post_id: String,
    /// Cursor for the previous (newer) page, when the server provides one.
    #[serde(default)]
    pub prev_post_id: String,
}

impl PostList {
    /// Posts in server order (newest first); ids missing from the map are skipped.
    #[must_use]
    pub fn to_vec(&self) -> Vec<&Post> {
        self.order
            .iter()
            .filter_map(|id| self.posts.get(id))
            .collect()
    }

    /// Posts oldest first, the order a terminal transcript reads in.
    #[must_use]
    pub fn chronological(&self) -> Vec<&Post> {
        let mut posts = self.to_vec();
        posts.reverse();
        posts
    }
}
