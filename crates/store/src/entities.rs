//! Message entity definitions

use serde::{Deserialize, Serialize};

/// A message as persisted by the durable store.
///
/// Sender profile fields are denormalized onto the row so a broadcast
/// payload never needs a second lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub sender_username: String,
    pub sender_avatar: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub reply_to: Option<String>,
    pub file: Option<FileInfo>,
    pub reactions: Vec<Reaction>,
    #[serde(skip)]
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Request payload for persisting a new message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub room_id: String,
    pub sender_id: String,
    pub sender_username: String,
    pub sender_avatar: Option<String>,
    pub content: String,
    pub message_type: MessageType,
    pub reply_to: Option<String>,
    pub file: Option<FileInfo>,
}

/// One element of a message's reaction list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub user_id: String,
    pub emoji: String,
    pub reacted_at: String,
}

/// Metadata carried by file-typed messages. The url is caller-supplied;
/// blob storage is outside this system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub name: String,
    pub mime_type: String,
    pub size: i64,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    File,
    Audio,
    Video,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::File => "file",
            MessageType::Audio => "audio",
            MessageType::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(MessageType::Text),
            "image" => Some(MessageType::Image),
            "file" => Some(MessageType::File),
            "audio" => Some(MessageType::Audio),
            "video" => Some(MessageType::Video),
            _ => None,
        }
    }
}

impl Default for MessageType {
    fn default() -> Self {
        MessageType::Text
    }
}
