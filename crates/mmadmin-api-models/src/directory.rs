//! Teams, channels, and users as returned by the directory endpoints.

use serde::{Deserialize, Serialize};

/// Team record (`GET /teams/{id}`, `GET /teams/name/{name}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    /// Server-assigned identifier.
    pub id: String,
    /// URL-safe team name used in `team:channel` references.
    #[serde(default)]
    pub name: String,
    /// Display name shown in clients.
    #[serde(default)]
    pub display_name: String,
}

/// Channel record (`GET /channels/{id}`, `GET /teams/{team}/channels/name/{name}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    /// Server-assigned identifier.
    pub id: String,
    /// Owning team; empty for direct and group messages.
    #[serde(default)]
    pub team_id: String,
    /// URL-safe channel name.
    #[serde(default)]
    pub name: String,
    /// Display name shown in clients.
    #[serde(default)]
    pub display_name: String,
    /// Channel type code (`O` open, `P` private, `D` direct, `G` group).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Deletion timestamp in milliseconds; zero while the channel is live.
    #[serde(default)]
    pub delete_at: i64,
}

/// User record (`GET /users/{id}` and friends).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Server-assigned identifier.
    pub id: String,
    /// Login name.
    #[serde(default)]
    pub username: String,
    /// Primary e-mail address.
    #[serde(default)]
    pub email: String,
    /// Given name, possibly empty.
    #[serde(default)]
    pub first_name: String,
    /// Family name, possibly empty.
    #[serde(default)]
    pub last_name: String,
}
