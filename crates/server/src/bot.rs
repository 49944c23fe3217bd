//! Chat front-end: long-polls updates and routes each text message.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tubecast_core::{
    media::MediaPaths,
    messaging::{InboundMessage, MessagingError, MessagingSink, TelegramClient, Update},
    PipelineDispatcher, PipelineError,
};

/// Pause after a failed poll before trying again.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Explains the bot to new users.
pub const USAGE: &str = "This bot creates your personal podcast from videos selected by you. \nSend video links to this bot and it will build your own audio podcast feed.";

pub fn greeting(first_name: &str) -> String {
    format!("Hello, {}\n{}", first_name, USAGE)
}

/// Source of chat updates.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Returns updates with an ID of at least `offset`, waiting for new ones.
    async fn poll(&self, offset: i64) -> Result<Vec<Update>, MessagingError>;
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn poll(&self, offset: i64) -> Result<Vec<Update>, MessagingError> {
        self.get_updates(offset).await
    }
}

/// What a text message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Cleanup,
    /// Anything else goes to the pipeline.
    Submit,
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let first = text.split_whitespace().next().unwrap_or_default();
        // Group chats address commands as `/start@botname`.
        let command = first.split('@').next().unwrap_or_default();
        match command {
            "/start" => Command::Start,
            "/cleanup" => Command::Cleanup,
            _ => Command::Submit,
        }
    }
}

/// Routes chat messages to replies or the pipeline.
pub struct BotFrontend {
    dispatcher: Arc<PipelineDispatcher>,
    messaging: Arc<dyn MessagingSink>,
    paths: MediaPaths,
}

impl BotFrontend {
    pub fn new(
        dispatcher: Arc<PipelineDispatcher>,
        messaging: Arc<dyn MessagingSink>,
        paths: MediaPaths,
    ) -> Self {
        Self {
            dispatcher,
            messaging,
            paths,
        }
    }

    /// Polls `source` until `shutdown` fires.
    pub async fn run<S>(self, source: Arc<S>, mut shutdown: broadcast::Receiver<()>)
    where
        S: UpdateSource + ?Sized,
    {
        info!("Bot polling started");
        let mut offset = 0;

        loop {
            let polled = tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                polled = source.poll(offset) => polled,
            };

            match polled {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        if let Some(message) = update.into_inbound() {
                            self.handle(message).await;
                        }
                    }
                }
                Err(e) => {
                    warn!("Polling for updates failed: {}", e);
                    tokio::select! {
                        biased;
                        _ = shutdown.recv() => break,
                        _ = tokio::time::sleep(POLL_RETRY_DELAY) => {}
                    }
                }
            }
        }

        info!("Bot polling stopped");
    }

    /// Handles one message.
    ///
    /// Submissions run on their own task so a busy pipeline never stalls
    /// polling; the handle of that task is returned.
    pub async fn handle(&self, message: InboundMessage) -> Option<JoinHandle<()>> {
        let chat_id = message.requester.chat_id;

        match Command::parse(&message.text) {
            Command::Start => {
                self.reply(chat_id, &greeting(&message.requester.first_name))
                    .await;
                None
            }
            Command::Cleanup => {
                let text = match self.paths.purge().await {
                    Ok(count) => {
                        info!(chat_id, count, "Purged temp directory");
                        format!("Cleaned up {} temporary files", count)
                    }
                    Err(e) => format!("Error while cleaning up: {}", e),
                };
                self.reply(chat_id, &text).await;
                None
            }
            Command::Submit => {
                let dispatcher = Arc::clone(&self.dispatcher);
                Some(tokio::spawn(async move {
                    match dispatcher.submit(message).await {
                        Ok(()) => {}
                        Err(PipelineError::InvalidRequestShape { .. }) => {
                            debug!(chat_id, "Ignored message that is not a link");
                        }
                        Err(e) => warn!(chat_id, "Failed to submit request: {}", e),
                    }
                }))
            }
        }
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.messaging.send(chat_id, text).await {
            warn!(chat_id, "Failed to reply: {}", e);
        }
    }
}
