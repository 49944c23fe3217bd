//! Trait definitions for the messaging module.

use async_trait::async_trait;

use super::error::MessagingError;
use super::types::{AudioDelivery, MessageHandle};

/// Outbound side of the chat platform.
#[async_trait]
pub trait MessagingSink: Send + Sync {
    /// Returns the name of this implementation.
    fn name(&self) -> &str;

    /// Sends a text message and returns a handle to it.
    async fn send(&self, chat_id: i64, text: &str) -> Result<MessageHandle, MessagingError>;

    /// Replaces the content of an existing message.
    ///
    /// The returned handle points at the same message with the new text.
    async fn edit(&self, handle: &MessageHandle, text: &str)
        -> Result<MessageHandle, MessagingError>;

    /// Deletes a message.
    async fn delete(&self, handle: &MessageHandle) -> Result<(), MessagingError>;

    /// Uploads an audio file to a chat.
    async fn send_audio(
        &self,
        chat_id: i64,
        audio: AudioDelivery,
    ) -> Result<MessageHandle, MessagingError>;
}
