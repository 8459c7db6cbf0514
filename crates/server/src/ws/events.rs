use serde::{Deserialize, Serialize};

use crate::models::MessagePayload;

// ── Client → Server Events ──

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Join {
        room: String,
    },
    Leave {
        room: String,
    },
    Message {
        room: String,
        content: String,
    },
    Typing {
        room: String,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
}

// ── Server → Client Events ──

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Presence {
        room: String,
        msg: String,
    },
    Message {
        room: String,
        message: MessagePayload,
    },
    MessageEdit {
        room: String,
        #[serde(rename = "messageId")]
        message_id: String,
        content: String,
        #[serde(rename = "updatedAt")]
        updated_at: String,
    },
    MessageDelete {
        room: String,
        #[serde(rename = "messageId")]
        message_id: String,
    },
    Typing {
        room: String,
        user: String,
        #[serde(rename = "isTyping")]
        is_typing: bool,
    },
    Error {
        message: String,
    },
}
