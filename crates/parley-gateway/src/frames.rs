//! JSON frames exchanged over a gateway connection.

use parley_core::ids::RoomId;
use parley_core::realtime::RealtimePayload;
use serde::{Deserialize, Serialize};

/// Client → server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    Subscribe {
        destination: String,
    },
    Unsubscribe {
        destination: String,
    },
    Typing {
        #[serde(rename = "roomId")]
        room_id: RoomId,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
    Heartbeat,
}

/// Server → client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    Event {
        destination: String,
        payload: RealtimePayload,
    },
    Subscribed {
        destination: String,
    },
    Unsubscribed {
        destination: String,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination: Option<String>,
    },
}

impl ServerFrame {
    /// An error frame not tied to a destination.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            destination: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use parley_core::ids::UserId;
    use parley_core::realtime::TypingStatus;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_client_frames_parse_from_wire_json() {
        let typing: ClientFrame =
            serde_json::from_value(json!({"type": "typing", "roomId": 42, "isTyping": true}))
                .unwrap();
        let heartbeat: ClientFrame = serde_json::from_str(r#"{"type":"heartbeat"}"#).unwrap();

        assert_eq!(
            typing,
            ClientFrame::Typing {
                room_id: RoomId(42),
                is_typing: true
            }
        );
        assert_eq!(heartbeat, ClientFrame::Heartbeat);
    }

    #[test]
    fn test_event_frame_nests_tagged_payload() {
        let frame = ServerFrame::Event {
            destination: "/topic/typing/roomId/42".to_owned(),
            payload: RealtimePayload::Typing(TypingStatus {
                room_id: RoomId(42),
                customer_id: UserId(7),
                is_typing: false,
            }),
        };

        let json = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["type"], "event");
        assert_eq!(json["destination"], "/topic/typing/roomId/42");
        assert_eq!(json["payload"]["type"], "Typing");
        assert_eq!(json["payload"]["data"]["customerId"], 7);
        assert_eq!(json["payload"]["data"]["isTyping"], false);
    }

    #[test]
    fn test_error_frame_omits_missing_destination() {
        let json = serde_json::to_value(ServerFrame::error("bad frame")).unwrap();

        assert_eq!(json, json!({"type": "error", "message": "bad frame"}));
    }
}
