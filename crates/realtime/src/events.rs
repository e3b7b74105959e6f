//! Event types for the realtime wire contract.
//!
//! Event names and payload shapes follow the connection channel contract:
//! clients emit `join:rooms`, `message:send`, `typing:start`, `typing:stop`,
//! `message:react` and `file:upload`; the core emits `message:new`,
//! `typing:start`, `typing:stop`, `message:reaction`, `users:online` and
//! `error`.

use serde::{Deserialize, Serialize};

use parley_store::{MessageType, Reaction, StoredMessage};

use crate::error::ErrorKind;
use crate::presence::OnlineUser;

/// Events a connected client sends to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Subscribe this session to a set of rooms. Room-level authorization
    /// has already happened by the time the core sees the ids.
    #[serde(rename = "join:rooms")]
    JoinRooms { rooms: Vec<String> },

    #[serde(rename = "message:send")]
    MessageSend {
        room_id: String,
        content: String,
        #[serde(rename = "type", default)]
        message_type: MessageType,
        #[serde(default)]
        reply_to: Option<String>,
    },

    #[serde(rename = "typing:start")]
    TypingStart { room_id: String },

    #[serde(rename = "typing:stop")]
    TypingStop { room_id: String },

    #[serde(rename = "message:react")]
    MessageReact { message_id: String, emoji: String },

    /// File metadata announcement; the blob itself lives elsewhere and the
    /// url is caller-supplied.
    #[serde(rename = "file:upload")]
    FileUpload {
        room_id: String,
        file_name: String,
        file_type: String,
        file_size: i64,
        file_url: String,
    },
}

/// Events the core delivers to sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// A durably stored message, fanned out to its room.
    #[serde(rename = "message:new")]
    MessageNew { message: StoredMessage },

    #[serde(rename = "typing:start")]
    TypingStart {
        room_id: String,
        user_id: String,
        username: String,
    },

    #[serde(rename = "typing:stop")]
    TypingStop { room_id: String, user_id: String },

    /// The complete reaction list after a toggle — never a delta, so every
    /// client converges regardless of missed updates.
    #[serde(rename = "message:reaction")]
    MessageReaction {
        message_id: String,
        reactions: Vec<Reaction>,
    },

    /// Full snapshot of all online users, sent to every session.
    #[serde(rename = "users:online")]
    UsersOnline { users: Vec<OnlineUser> },

    /// Delivered only to the originating session.
    #[serde(rename = "error")]
    Error { kind: ErrorKind, message: String },
}

impl ServerEvent {
    /// Get event type name for logging
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerEvent::MessageNew { .. } => "message:new",
            ServerEvent::TypingStart { .. } => "typing:start",
            ServerEvent::TypingStop { .. } => "typing:stop",
            ServerEvent::MessageReaction { .. } => "message:reaction",
            ServerEvent::UsersOnline { .. } => "users:online",
            ServerEvent::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_use_wire_names() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"message:send","data":{"roomId":"general","content":"hi","type":"text"}}"#,
        )
        .unwrap();

        match event {
            ClientEvent::MessageSend {
                room_id,
                content,
                message_type,
                reply_to,
            } => {
                assert_eq!(room_id, "general");
                assert_eq!(content, "hi");
                assert_eq!(message_type, MessageType::Text);
                assert!(reply_to.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn message_type_defaults_to_text() {
        let event: ClientEvent = serde_json::from_str(
            r#"{"type":"message:send","data":{"roomId":"general","content":"hi"}}"#,
        )
        .unwrap();
        assert!(matches!(
            event,
            ClientEvent::MessageSend {
                message_type: MessageType::Text,
                ..
            }
        ));
    }

    #[test]
    fn error_event_carries_tagged_kind() {
        let event = ServerEvent::Error {
            kind: ErrorKind::NotFound,
            message: "message m1 not found".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["data"]["kind"], "not_found");
    }

    #[test]
    fn users_online_serializes_camel_case() {
        let event = ServerEvent::UsersOnline {
            users: vec![OnlineUser {
                user_id: "u1".to_string(),
                username: "alice".to_string(),
                avatar: None,
            }],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["users"][0]["userId"], "u1");
    }
}
