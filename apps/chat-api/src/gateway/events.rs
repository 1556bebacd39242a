//! Wire format for realtime chat frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::hub::RoomId;
use crate::models::chat_message::ChatMessage;

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// A chat message delivered to every connection in a room.
///
/// Frames produced by the HTTP send path carry the stored message id and
/// timestamp. Frames relayed from a live socket are ephemeral and carry neither.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatFrame {
    pub chat_id: RoomId,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
}

impl ChatFrame {
    /// Frame for a message that has been committed to the store.
    pub fn stored(message: &ChatMessage, username: &str) -> Self {
        Self {
            chat_id: message.chat_id,
            text: message.message_text.clone(),
            user_id: Some(message.user_id),
            username: Some(username.to_string()),
            message_id: Some(message.id),
            sent_at: Some(message.sent_at),
        }
    }

    /// Stamp the relaying connection's identity onto an inbound frame.
    pub fn from_sender(mut self, user_id: i64, username: &str) -> Self {
        self.user_id = Some(user_id);
        self.username = Some(username.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct InboundFrame {
    chat_id: RoomId,
    text: String,
}

/// What the reader task should do with one inbound text frame.
#[derive(Debug, PartialEq)]
pub enum Inbound {
    /// Broadcast to the connection's room.
    Relay(ChatFrame),
    /// The frame names a different room; it is not delivered anywhere.
    Dropped { claimed: RoomId },
}

/// Interpret an inbound text frame for a connection joined to `room`.
///
/// A `{chat_id, text}` object is relayed only when `chat_id` matches the
/// connection's room. Anything else is treated as plain text for that room.
pub fn interpret_inbound(room: RoomId, raw: &str) -> Inbound {
    match serde_json::from_str::<InboundFrame>(raw) {
        Ok(frame) if frame.chat_id == room => Inbound::Relay(ChatFrame {
            chat_id: room,
            text: frame.text,
            user_id: None,
            username: None,
            message_id: None,
            sent_at: None,
        }),
        Ok(frame) => Inbound::Dropped {
            claimed: frame.chat_id,
        },
        Err(_) => Inbound::Relay(ChatFrame {
            chat_id: room,
            text: raw.to_string(),
            user_id: None,
            username: None,
            message_id: None,
            sent_at: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_frame_is_relayed() {
        let inbound = interpret_inbound(7, r#"{"chat_id":7,"text":"hi"}"#);
        match inbound {
            Inbound::Relay(frame) => {
                assert_eq!(frame.chat_id, 7);
                assert_eq!(frame.text, "hi");
            }
            other => panic!("expected relay, got {other:?}"),
        }
    }

    #[test]
    fn foreign_room_is_dropped() {
        let inbound = interpret_inbound(7, r#"{"chat_id":9,"text":"hi"}"#);
        assert_eq!(inbound, Inbound::Dropped { claimed: 9 });
    }

    #[test]
    fn plain_text_is_wrapped_into_own_room() {
        let inbound = interpret_inbound(7, "hello there");
        match inbound {
            Inbound::Relay(frame) => {
                assert_eq!(frame.chat_id, 7);
                assert_eq!(frame.text, "hello there");
            }
            other => panic!("expected relay, got {other:?}"),
        }
    }

    #[test]
    fn sender_identity_is_serialized() {
        let frame = match interpret_inbound(7, "hey") {
            Inbound::Relay(frame) => frame.from_sender(3, "bob"),
            other => panic!("expected relay, got {other:?}"),
        };
        let json: serde_json::Value = serde_json::to_value(&frame).unwrap();

        assert_eq!(json["chat_id"], 7);
        assert_eq!(json["user_id"], 3);
        assert_eq!(json["username"], "bob");
        assert!(json.get("message_id").is_none());
        assert!(json.get("sent_at").is_none());
    }

    #[test]
    fn stored_frame_carries_message_identity() {
        let message = ChatMessage {
            id: 42,
            chat_id: 7,
            user_id: 3,
            message_text: "persisted".into(),
            sent_at: Utc::now(),
        };
        let frame = ChatFrame::stored(&message, "bob");

        assert_eq!(frame.message_id, Some(42));
        assert_eq!(frame.sent_at, Some(message.sent_at));
        assert_eq!(frame.username.as_deref(), Some("bob"));
    }
}
