#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Wire DTOs for the collaboration server's REST (v4) and WebSocket API.
//!
//! The server owns these contracts; the types here only carry the fields the
//! CLI reads or writes. Unknown fields are ignored on decode, and empty strings
//! stand in for "absent" the same way the server encodes them.

pub mod directory;
pub mod post;
pub mod status;
pub mod websocket;

use serde::{Deserialize, Serialize};

pub use directory::{Channel, Team, User};
pub use post::{CreatePostRequest, Post, PostList};
pub use status::{Status, StatusKind, StatusParseError, UpdateStatusRequest, online_status_map};
pub use websocket::{
    EVENT_HELLO, EVENT_POSTED, PostDecodeError, WebSocketBroadcast, WebSocketEvent,
    WebSocketMessage, WebSocketRequest, WebSocketResponse,
};

/// Error document returned by the server on any non-2xx response.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppError {
    /// Translation identifier of the error (e.g. `api.context.404.app_error`).
    #[serde(default)]
    pub id: String,
    /// Human-readable summary.
    #[serde(default)]
    pub message: String,
    /// Additional diagnostic detail, often empty.
    #[serde(default)]
    pub detailed_error: String,
    /// Server-side request identifier for correlating logs.
    #[serde(default)]
    pub request_id: String,
    /// HTTP status code echoed by the server.
    #[serde(default)]
    pub status_code: u16,
}

impl AppError {
    /// Message followed by the detailed error when the server supplied one.
    #[must_use]
    pub fn summary(&self) -> String {
        let detail = self.detailed_error.trim();
        if detail.is_empty() {
            self.message.clone()
        } else {
            format!("{}: {detail}", self.message)
        }
    }
}
