//! Types for the messaging module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reference to one message the bot has sent (or received).
///
/// Carries the text as the bot last wrote it so status annotations can be
/// accumulated without reading the message back from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHandle {
    /// Chat the message lives in.
    pub chat_id: i64,
    /// Platform message ID within the chat.
    pub message_id: i64,
    /// Current text content.
    pub text: String,
}

impl MessageHandle {
    pub fn new(chat_id: i64, message_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            message_id,
            text: text.into(),
        }
    }

    /// Whether both handles point at the same platform message.
    pub fn same_message(&self, other: &MessageHandle) -> bool {
        self.chat_id == other.chat_id && self.message_id == other.message_id
    }
}

/// An audio file to deliver to a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDelivery {
    /// File on disk.
    pub path: PathBuf,
    /// Track title shown by the player.
    pub title: String,
    /// Message caption.
    pub caption: String,
    /// File name presented to the recipient.
    pub file_name: String,
    /// Optional cover thumbnail.
    pub thumbnail: Option<PathBuf>,
}

/// Who sent a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    /// Chat to reply into; also the per-requester archive namespace.
    pub chat_id: i64,
    /// Display name used in greetings.
    pub first_name: String,
}

/// An inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender.
    pub requester: Requester,
    /// Message text.
    pub text: String,
    /// Handle of the inbound message itself (used to delete it later).
    pub message: MessageHandle,
}
