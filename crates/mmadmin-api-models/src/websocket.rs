//! Frames exchanged over `/api/v4/websocket`.
//!
//! The server pushes two kinds of text frames: events (carrying an `event`
//! name) and replies to actions the client sent (carrying `seq_reply`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::post::Post;

/// Sent once right after the connection is authenticated.
pub const EVENT_HELLO: &str = "hello";
/// A post was created in a channel the user can see.
pub const EVENT_POSTED: &str = "posted";

const ACTION_AUTHENTICATION_CHALLENGE: &str = "authentication_challenge";

/// Audience metadata attached to every event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebSocketBroadcast {
    /// Channel the event was broadcast to, if any.
    #[serde(default)]
    pub channel_id: String,
    /// Team the event was broadcast to, if any.
    #[serde(default)]
    pub team_id: String,
    /// Single recipient, if the event was targeted.
    #[serde(default)]
    pub user_id: String,
}

/// Server-pushed event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebSocketEvent {
    /// Event name, e.g. [`EVENT_POSTED`].
    pub event: String,
    /// Event payload; shape depends on the event name.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Audience metadata.
    #[serde(default)]
    pub broadcast: WebSocketBroadcast,
    /// Per-connection sequence number.
    #[serde(default)]
    pub seq: i64,
}

/// Failure to extract a post from a `posted` event.
#[derive(Debug, Error)]
pub enum PostDecodeError {
    /// The event carried no `post` entry.
    #[error("event has no post payload")]
    Missing,
    /// The `post` entry was not a JSON-encoded string.
    #[error("post payload is not an encoded string")]
    NotEncoded,
    /// The encoded post was not valid JSON for a post.
    #[error("malformed post payload: {source}")]
    Malformed {
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

impl WebSocketEvent {
    /// True when this event announces a new post.
    #[must_use]
    pub fn is_posted(&self) -> bool {
        self.event == EVENT_POSTED
    }

    /// Decode the post carried by a `posted` event.
    ///
    /// The server double-encodes it: `data.post` is a string holding JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PostDecodeError`] when the entry is missing, not a string, or
    /// not a valid post document.
    pub fn posted_post(&self) -> Result<Post, PostDecodeError> {
        let raw = self.data.get("post").ok_or(PostDecodeError::Missing)?;
        let encoded = raw.as_str().ok_or(PostDecodeError::NotEncoded)?;
        serde_json::from_str(encoded).map_err(|source| PostDecodeError::Malformed { source })
    }
}

/// Reply to an action the client sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebSocketResponse {
    /// `OK` or `FAIL`.
    pub status: String,
    /// Sequence number of the request being answered.
    #[serde(default)]
    pub seq_reply: i64,
    /// Error document when `status` is `FAIL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl WebSocketResponse {
    /// True when the server accepted the action.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// Any text frame the server may send.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum WebSocketMessage {
    /// Pushed event.
    Event(WebSocketEvent),
    /// Reply to a client action.
    Response(WebSocketResponse),
}

/// Action sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebSocketRequest {
    /// Client-chosen sequence number echoed back in `seq_reply`.
    pub seq: i64,
    /// Action name.
    pub action: String,
    /// Action arguments.
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl WebSocketRequest {
    /// Authenticate the connection with a session or access token.
    #[must_use]
    pub fn authentication_challenge(seq: i64, token: &str) -> Self {
        let mut data = Map::new();
        data.insert("token".to_string(), Value::String(token.to_string()));
        Self {
            seq,
            action: ACTION_AUTHENTICATION_CHALLENGE.to_string(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn posted(post: &Value) -> WebSocketEvent {
        serde_json::from_value(json!({
            "event": "posted",
            "data": {"post": post.to_string(), "channel_type": "O"},
            "broadcast": {"channel_id": "c1", "team_id": "", "user_id": ""},
            "seq": 3
        }))
        .expect("decode event")
    }

    #[test]
    fn posted_event_decodes_double_encoded_post() {
        let event = posted(&json!({"id": "p1", "channel_id": "c1", "message": "hi"}));
        assert!(event.is_posted());
        let post = event.posted_post().expect("decode post");
        assert_eq!(post.id, "p1");
        assert_eq!(post.message, "hi");
    }

    #[test]
    fn posted_post_reports_each_failure_mode() {
        let mut event = posted(&json!({}));
        event.data.remove("post");
        assert!(matches!(event.posted_post(), Err(PostDecodeError::Missing)));

        event.data.insert("post".into(), json!({"id": "p1"}));
        assert!(matches!(
            event.posted_post(),
            Err(PostDecodeError::NotEncoded)
        ));

        event.data.insert("post".into(), json!("{not json"));
        assert!(matches!(
            event.posted_post(),
            Err(PostDecodeError::Malformed { .. })
        ));
    }

    #[test]
    fn message_distinguishes_events_from_replies() {
        let event: WebSocketMessage =
            serde_json::from_str(r#"{"event":"hello","data":{"server_version":"9"},"seq":0}"#)
                .expect("decode event");
        assert!(matches!(event, WebSocketMessage::Event(ref e) if e.event == EVENT_HELLO));

        let reply: WebSocketMessage =
            serde_json::from_str(r#"{"status":"OK","seq_reply":1}"#).expect("decode reply");
        match reply {
            WebSocketMessage::Response(response) => {
                assert!(response.is_ok());
                assert_eq!(response.seq_reply, 1);
            }
            WebSocketMessage::Event(other) => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn authentication_challenge_carries_token() {
        let request = WebSocketRequest::authentication_challenge(1, "secret-token");
        assert_eq!(
            serde_json::to_value(&request).expect("encode"),
            json!({
                "seq": 1,
                "action": "authentication_challenge",
                "data": {"token": "secret-token"}
            })
        );
    }
}
