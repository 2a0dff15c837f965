//! Wire messages exchanged over the room channel.
//!
//! Outbound frames are a tagged union on `type`:
//!
//! ```text
//! { "type": "chat",     "author": "...", "text": "...", "room": "..." }
//! { "type": "presence", "room": "...",   "viewers": 3 }
//! ```
//!
//! Inbound frames are looser: clients may omit `type`, `author` and `room`.

use serde::{Deserialize, Serialize};

use super::{
    error::ValidationError,
    value_object::{ChatText, DisplayName, RoomName},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireMessage {
    Chat(ChatMessage),
    Presence(PresenceMessage),
}

impl WireMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub author: String,
    pub text: String,
    pub room: String,
}

/// Occupancy snapshot of one room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceMessage {
    pub room: String,
    pub viewers: usize,
}

impl PresenceMessage {
    pub fn new(room: &RoomName, viewers: usize) -> Self {
        Self {
            room: room.as_str().to_string(),
            viewers,
        }
    }
}

/// A chat frame as sent by a client, before defaults and sanitization.
#[derive(Debug, Default, Deserialize)]
pub struct InboundChat {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
}

impl InboundChat {
    pub fn parse(frame: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(frame).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// Sanitize the text and fill missing fields from the connection's
    /// bound identity.
    pub fn into_chat(
        self,
        author: &DisplayName,
        room: &RoomName,
        max_text_length: usize,
    ) -> Result<ChatMessage, ValidationError> {
        if let Some(kind) = self.kind.as_deref()
            && kind != "chat"
        {
            return Err(ValidationError::UnsupportedType(kind.to_string()));
        }

        let text = ChatText::parse(self.text.as_deref().unwrap_or_default(), max_text_length)?;

        Ok(ChatMessage {
            author: non_empty(self.author).unwrap_or_else(|| author.as_str().to_string()),
            text: text.into_string(),
            room: non_empty(self.room).unwrap_or_else(|| room.as_str().to_string()),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
