//! Real-time destinations and the payloads pushed to them.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::{MessageSent, ReadMarkerUpdated, ReadStatusChanged};
use crate::ids::{RoomId, UserId};
use crate::model::ConversationView;

const MESSAGE_PREFIX: &str = "/topic/message/roomId/";
const PRESENCE_PREFIX: &str = "/topic/onlineStatus/roomId/";
const READ_MARKER_PREFIX: &str = "/topic/readMarkers/roomId/";
const TYPING_PREFIX: &str = "/topic/typing/roomId/";
const USER_ROOMS_PATH: &str = "/user/topic/rooms";
const USER_READ_STATUS_PATH: &str = "/user/topic/readStatus";

/// A subscription target.
///
/// Room-scoped destinations carry the room id as the trailing path segment.
/// Private destinations are bound to the connection's own user and are never
/// broadcast to a room.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// New messages in a room.
    RoomMessages(RoomId),
    /// Online/offline changes of a room's participants.
    RoomPresence(RoomId),
    /// Read-marker updates in a room.
    RoomReadMarkers(RoomId),
    /// Typing indicators in a room.
    RoomTyping(RoomId),
    /// Personal conversation-view updates.
    UserRooms(UserId),
    /// Personal unread-flag changes.
    UserReadStatus(UserId),
    /// Any other path. Not room-scoped, so never membership-checked.
    Open(String),
}

/// A destination path that looks room-scoped but does not end in a room id.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed destination: {0}")]
pub struct MalformedDestination(pub String);

impl Destination {
    /// Parses a subscription path on behalf of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedDestination` when a room-scoped prefix is not followed
    /// by exactly one numeric segment.
    pub fn parse(path: &str, user_id: UserId) -> Result<Self, MalformedDestination> {
        let room_scoped: [(&str, fn(RoomId) -> Self); 4] = [
            (MESSAGE_PREFIX, Self::RoomMessages),
            (PRESENCE_PREFIX, Self::RoomPresence),
            (READ_MARKER_PREFIX, Self::RoomReadMarkers),
            (TYPING_PREFIX, Self::RoomTyping),
        ];
        for (prefix, build) in room_scoped {
            if let Some(rest) = path.strip_prefix(prefix) {
                return rest
                    .parse::<RoomId>()
                    .map(build)
                    .map_err(|_| MalformedDestination(path.to_owned()));
            }
        }

        Ok(match path {
            USER_ROOMS_PATH => Self::UserRooms(user_id),
            USER_READ_STATUS_PATH => Self::UserReadStatus(user_id),
            other => Self::Open(other.to_owned()),
        })
    }

    /// The room this destination is scoped to, if any.
    #[must_use]
    pub fn room_id(&self) -> Option<RoomId> {
        match self {
            Self::RoomMessages(id)
            | Self::RoomPresence(id)
            | Self::RoomReadMarkers(id)
            | Self::RoomTyping(id) => Some(*id),
            Self::UserRooms(_) | Self::UserReadStatus(_) | Self::Open(_) => None,
        }
    }

    /// Wire path as a subscribing client sees it.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::RoomMessages(id) => format!("{MESSAGE_PREFIX}{id}"),
            Self::RoomPresence(id) => format!("{PRESENCE_PREFIX}{id}"),
            Self::RoomReadMarkers(id) => format!("{READ_MARKER_PREFIX}{id}"),
            Self::RoomTyping(id) => format!("{TYPING_PREFIX}{id}"),
            Self::UserRooms(_) => USER_ROOMS_PATH.to_owned(),
            Self::UserReadStatus(_) => USER_READ_STATUS_PATH.to_owned(),
            Self::Open(path) => path.clone(),
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserRooms(user) | Self::UserReadStatus(user) => {
                write!(f, "{} (user {user})", self.path())
            }
            _ => f.write_str(&self.path()),
        }
    }
}

/// Online/offline record published to a room's presence stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceStatus {
    pub customer_id: UserId,
    pub online: bool,
}

/// Started/stopped typing record published to a room's typing stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingStatus {
    pub room_id: RoomId,
    pub customer_id: UserId,
    pub is_typing: bool,
}

/// Everything the gateway can push to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RealtimePayload {
    Message(MessageSent),
    ReadMarker(ReadMarkerUpdated),
    RoomView(ConversationView),
    ReadStatus(ReadStatusChanged),
    Presence(PresenceStatus),
    Typing(TypingStatus),
}

/// Fan-out target for real-time records.
///
/// Implementations must not block and must isolate failures: one unreachable
/// connection never prevents delivery to the others.
pub trait RealtimeSink: Send + Sync {
    /// Delivers `payload` to every connection subscribed to `destination`.
    /// Returns the number of connections that accepted it.
    fn deliver(&self, destination: &Destination, payload: &RealtimePayload) -> usize;
}
