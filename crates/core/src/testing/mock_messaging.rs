//! Mock messaging sink for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::messaging::{AudioDelivery, MessageHandle, MessagingError, MessagingSink};

use super::probe::ConcurrencyProbe;

/// First message ID handed out by the mock.
pub const FIRST_MESSAGE_ID: i64 = 1000;

/// One call made against the mock, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagingOp {
    Send {
        chat_id: i64,
        message_id: i64,
        text: String,
    },
    Edit {
        chat_id: i64,
        message_id: i64,
        text: String,
    },
    Delete {
        chat_id: i64,
        message_id: i64,
    },
    SendAudio {
        chat_id: i64,
        delivery: AudioDelivery,
    },
}

/// Mock implementation of the MessagingSink trait.
///
/// Every call is recorded, including failed ones. Sent messages get
/// increasing IDs starting at [`FIRST_MESSAGE_ID`].
#[derive(Debug)]
pub struct MockMessaging {
    ops: Arc<RwLock<Vec<MessagingOp>>>,
    next_message_id: AtomicI64,
    fail_sends: Arc<RwLock<bool>>,
    fail_edits: Arc<RwLock<bool>>,
    fail_deletes: Arc<RwLock<bool>>,
    fail_audio: Arc<RwLock<bool>>,
    audio_delay: Arc<RwLock<Duration>>,
    /// Tracks concurrent `send_audio` calls.
    audio_probe: ConcurrencyProbe,
}

impl Default for MockMessaging {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMessaging {
    pub fn new() -> Self {
        Self {
            ops: Arc::new(RwLock::new(Vec::new())),
            next_message_id: AtomicI64::new(FIRST_MESSAGE_ID),
            fail_sends: Arc::new(RwLock::new(false)),
            fail_edits: Arc::new(RwLock::new(false)),
            fail_deletes: Arc::new(RwLock::new(false)),
            fail_audio: Arc::new(RwLock::new(false)),
            audio_delay: Arc::new(RwLock::new(Duration::ZERO)),
            audio_probe: ConcurrencyProbe::new(),
        }
    }

    /// Get every recorded call.
    pub async fn recorded_ops(&self) -> Vec<MessagingOp> {
        self.ops.read().await.clone()
    }

    /// Text messages sent, as `(chat_id, message_id, text)`.
    pub async fn sent(&self) -> Vec<(i64, i64, String)> {
        self.ops
            .read()
            .await
            .iter()
            .filter_map(|op| match op {
                MessagingOp::Send {
                    chat_id,
                    message_id,
                    text,
                } => Some((*chat_id, *message_id, text.clone())),
                _ => None,
            })
            .collect()
    }

    /// Edits, as `(message_id, new_text)`.
    pub async fn edits(&self) -> Vec<(i64, String)> {
        self.ops
            .read()
            .await
            .iter()
            .filter_map(|op| match op {
                MessagingOp::Edit {
                    message_id, text, ..
                } => Some((*message_id, text.clone())),
                _ => None,
            })
            .collect()
    }

    /// IDs of deleted messages.
    pub async fn deleted(&self) -> Vec<i64> {
        self.ops
            .read()
            .await
            .iter()
            .filter_map(|op| match op {
                MessagingOp::Delete { message_id, .. } => Some(*message_id),
                _ => None,
            })
            .collect()
    }

    /// Audio deliveries, in delivery order.
    pub async fn audios(&self) -> Vec<AudioDelivery> {
        self.ops
            .read()
            .await
            .iter()
            .filter_map(|op| match op {
                MessagingOp::SendAudio { delivery, .. } => Some(delivery.clone()),
                _ => None,
            })
            .collect()
    }

    /// Make every `send` fail.
    pub async fn set_fail_sends(&self, fail: bool) {
        *self.fail_sends.write().await = fail;
    }

    /// Make every `edit` fail.
    pub async fn set_fail_edits(&self, fail: bool) {
        *self.fail_edits.write().await = fail;
    }

    /// Make every `delete` fail.
    pub async fn set_fail_deletes(&self, fail: bool) {
        *self.fail_deletes.write().await = fail;
    }

    /// Make every `send_audio` fail.
    pub async fn set_fail_audio(&self, fail: bool) {
        *self.fail_audio.write().await = fail;
    }

    /// Simulated upload time for each `send_audio`.
    pub async fn set_audio_delay(&self, delay: Duration) {
        *self.audio_delay.write().await = delay;
    }

    /// Concurrency of `send_audio` calls.
    pub fn audio_probe(&self) -> &ConcurrencyProbe {
        &self.audio_probe
    }

    async fn record(&self, op: MessagingOp) {
        self.ops.write().await.push(op);
    }
}

#[async_trait]
impl MessagingSink for MockMessaging {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, chat_id: i64, text: &str) -> Result<MessageHandle, MessagingError> {
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.record(MessagingOp::Send {
            chat_id,
            message_id,
            text: text.to_string(),
        })
        .await;

        if *self.fail_sends.read().await {
            return Err(MessagingError::api("sendMessage", "mock failure"));
        }
        Ok(MessageHandle::new(chat_id, message_id, text))
    }

    async fn edit(
        &self,
        handle: &MessageHandle,
        text: &str,
    ) -> Result<MessageHandle, MessagingError> {
        self.record(MessagingOp::Edit {
            chat_id: handle.chat_id,
            message_id: handle.message_id,
            text: text.to_string(),
        })
        .await;

        if *self.fail_edits.read().await {
            return Err(MessagingError::api("editMessageText", "mock failure"));
        }
        Ok(MessageHandle::new(handle.chat_id, handle.message_id, text))
    }

    async fn delete(&self, handle: &MessageHandle) -> Result<(), MessagingError> {
        self.record(MessagingOp::Delete {
            chat_id: handle.chat_id,
            message_id: handle.message_id,
        })
        .await;

        if *self.fail_deletes.read().await {
            return Err(MessagingError::api("deleteMessage", "mock failure"));
        }
        Ok(())
    }

    async fn send_audio(
        &self,
        chat_id: i64,
        audio: AudioDelivery,
    ) -> Result<MessageHandle, MessagingError> {
        let _inside = self.audio_probe.enter();
        let delay = *self.audio_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.record(MessagingOp::SendAudio {
            chat_id,
            delivery: audio.clone(),
        })
        .await;

        if *self.fail_audio.read().await {
            return Err(MessagingError::ConnectionFailed("mock failure".to_string()));
        }
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        Ok(MessageHandle::new(chat_id, message_id, audio.caption))
    }
}
