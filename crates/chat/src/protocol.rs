use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What travels between agents: one payload plus its addressing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatEnvelope {
    pub sender: String,
    pub recipient: String,
    pub payload: ChatPayload,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatPayload {
    Message(ChatMessage),
    Acknowledgement(ChatAcknowledgement),
}

impl ChatPayload {
    pub fn payload_type(&self) -> ChatPayloadType {
        match self {
            Self::Message(_) => ChatPayloadType::Message,
            Self::Acknowledgement(_) => ChatPayloadType::Acknowledgement,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChatPayloadType {
    Message,
    Acknowledgement,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub msg_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub content: Vec<ChatContent>,
}

impl ChatMessage {
    /// A fresh message with a new id, stamped now, holding a single text item.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            msg_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            content: vec![ChatContent::Text { text: text.into() }],
        }
    }
}

/// Content item kinds. Tags this agent does not know decode to `Unsupported`
/// so a newer peer never makes a whole message undecodable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChatContent {
    StartSession,
    Text { text: String },
    EndSession,
    Metadata { metadata: BTreeMap<String, String> },
    #[serde(other)]
    Unsupported,
}

impl ChatContent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StartSession => "start-session",
            Self::Text { .. } => "text",
            Self::EndSession => "end-session",
            Self::Metadata { .. } => "metadata",
            Self::Unsupported => "unsupported",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatAcknowledgement {
    pub acknowledged_msg_id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,
}

impl ChatAcknowledgement {
    pub fn for_message(message: &ChatMessage) -> Self {
        Self { acknowledged_msg_id: message.msg_id, timestamp: Utc::now(), metadata: None }
    }
}
