//! User presence status.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Presence values understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    /// Active in a client.
    Online,
    /// Idle.
    Away,
    /// Do not disturb; notifications are suppressed.
    Dnd,
    /// Not connected.
    Offline,
    /// Out of office.
    OutOfOffice,
}

impl StatusKind {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Dnd => "dnd",
            Self::Offline => "offline",
            Self::OutOfOffice => "ooo",
        }
    }
}

impl Display for StatusKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Raised when a status string is not one of the known presence values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown status '{value}' (expected online, away, dnd, offline, or ooo)")]
pub struct StatusParseError {
    /// Value supplied by the caller.
    pub value: String,
}

impl FromStr for StatusKind {
    type Err = StatusParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "away" => Ok(Self::Away),
            "dnd" => Ok(Self::Dnd),
            "offline" => Ok(Self::Offline),
            "ooo" => Ok(Self::OutOfOffice),
            _ => Err(StatusParseError {
                value: value.to_string(),
            }),
        }
    }
}

/// Presence record for one user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Status {
    /// User the status belongs to.
    pub user_id: String,
    /// Raw status value; see [`StatusKind`].
    pub status: String,
    /// Whether the user set the status explicitly.
    #[serde(default)]
    pub manual: bool,
    /// Last activity in milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_activity_at: i64,
    /// Channel the user is currently viewing; only meaningful server-side.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub active_channel: String,
    /// End of a timed do-not-disturb, in seconds since the Unix epoch.
    #[serde(default)]
    pub dnd_end_time: i64,
    /// Status before the most recent change; never sent over the wire.
    #[serde(skip)]
    pub prev_status: String,
}

impl Status {
    /// Typed view of the status value.
    ///
    /// # Errors
    ///
    /// Returns [`StatusParseError`] when the server sent an unknown value.
    pub fn kind(&self) -> Result<StatusKind, StatusParseError> {
        self.status.parse()
    }

    /// Copy suitable for showing to clients: the active channel is dropped.
    #[must_use]
    pub fn for_client(&self) -> Self {
        Self {
            active_channel: String::new(),
            ..self.clone()
        }
    }

    /// True when the user is offline.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.status == StatusKind::Offline.as_str()
    }
}

/// Map of user id to status string, leaving offline users out.
///
/// An absent user therefore means "offline".
#[must_use]
pub fn online_status_map(statuses: &[Status]) -> BTreeMap<String, String> {
    statuses
        .iter()
        .filter(|status| !status.is_offline())
        .map(|status| (status.user_id.clone(), status.status.clone()))
        .collect()
}

/// Body for `PUT /users/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateStatusRequest {
    /// User whose status is changing.
    pub user_id: String,
    /// New status value.
    pub status: String,
    /// End of a timed do-not-disturb, in seconds since the Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dnd_end_time: Option<i64>,
}

impl UpdateStatusRequest {
    /// Build a request for `user_id` switching to `kind`.
    #[must_use]
    pub fn new(user_id: impl Into<String>, kind: StatusKind, dnd_end_time: Option<i64>) -> Self {
        Self {
            user_id: user_id.into(),
            status: kind.as_str().to_string(),
            dnd_end_time,
        }
    }
}
