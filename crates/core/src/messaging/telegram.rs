//! Telegram Bot API client.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::TelegramConfig;

use super::error::MessagingError;
use super::traits::MessagingSink;
use super::types::{AudioDelivery, InboundMessage, MessageHandle, Requester};

/// Parse mode used for every outgoing text.
const PARSE_MODE: &str = "Markdown";

/// Escapes text so it renders literally under the `Markdown` parse mode.
///
/// Unbalanced entity characters in user-supplied text would otherwise make
/// the Bot API reject the whole message.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Extra slack on top of the long-poll timeout before `getUpdates` is abandoned.
const POLL_GRACE: Duration = Duration::from_secs(30);

/// Bound on establishing a connection. Uploads themselves are not time-limited.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Envelope around every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// A single update from `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
}

impl Update {
    /// Converts a text message update into an inbound message.
    ///
    /// Returns `None` for updates that carry no text (joins, media, edits, ...).
    pub fn into_inbound(self) -> Option<InboundMessage> {
        let message = self.message?;
        let text = message.text?;
        let first_name = message
            .from
            .map(|u| u.first_name)
            .unwrap_or_default();

        Some(InboundMessage {
            requester: Requester {
                chat_id: message.chat.id,
                first_name,
            },
            message: MessageHandle::new(message.chat.id, message.message_id, text.clone()),
            text,
        })
    }
}

#[derive(Serialize)]
struct SendMessageParams<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Serialize)]
struct EditMessageParams<'a> {
    chat_id: i64,
    message_id: i64,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Serialize)]
struct DeleteMessageParams {
    chat_id: i64,
    message_id: i64,
}

#[derive(Serialize)]
struct GetUpdatesParams<'a> {
    offset: i64,
    timeout: u64,
    allowed_updates: &'a [&'a str],
}

/// Telegram Bot API client implementing [`MessagingSink`].
pub struct TelegramClient {
    client: Client,
    config: TelegramConfig,
    poll_grace: Duration,
}

impl TelegramClient {
    /// Creates a new client.
    pub fn new(config: TelegramConfig) -> Result<Self, MessagingError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| MessagingError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            client,
            config,
            poll_grace: POLL_GRACE,
        })
    }

    /// Overrides the slack granted to `getUpdates` past the long-poll timeout.
    pub fn with_poll_grace(mut self, grace: Duration) -> Self {
        self.poll_grace = grace;
        self
    }

    /// Deadline for one `getUpdates` request.
    fn poll_deadline(&self) -> Duration {
        Duration::from_secs(self.config.poll_timeout_secs) + self.poll_grace
    }

    /// Builds the URL of a Bot API method.
    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.token,
            method
        )
    }

    /// Calls a JSON method and unwraps the response envelope.
    async fn call<P, T>(&self, method: &str, params: &P) -> Result<T, MessagingError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.call_with_timeout(method, params, None).await
    }

    async fn call_with_timeout<P, T>(
        &self,
        method: &str,
        params: &P,
        timeout: Option<Duration>,
    ) -> Result<T, MessagingError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.client.post(self.method_url(method)).json(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;

        Self::unwrap_response(method, response).await
    }

    /// Calls a multipart method and unwraps the response envelope.
    async fn call_multipart<T>(&self, method: &str, form: multipart::Form) -> Result<T, MessagingError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await?;

        Self::unwrap_response(method, response).await
    }

    async fn unwrap_response<T>(method: &str, response: reqwest::Response) -> Result<T, MessagingError>
    where
        T: DeserializeOwned,
    {
        let status = response.status();
        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| MessagingError::ParseError(format!("HTTP {}: {}", status, e)))?;

        if !body.ok {
            return Err(MessagingError::api(
                method,
                body.description.unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }

        body.result
            .ok_or_else(|| MessagingError::api(method, "response has no result"))
    }

    /// Reads a file into a multipart part.
    async fn file_part(path: &Path, file_name: &str, mime: &str) -> Result<multipart::Part, MessagingError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| MessagingError::Attachment {
                path: path.to_path_buf(),
                source,
            })?;

        multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(mime)
            .map_err(|e| MessagingError::ParseError(e.to_string()))
    }

    /// Long-polls for new updates starting at `offset`.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, MessagingError> {
        let params = GetUpdatesParams {
            offset,
            timeout: self.config.poll_timeout_secs,
            allowed_updates: &["message"],
        };
        self.call_with_timeout("getUpdates", &params, Some(self.poll_deadline()))
            .await
    }
}

#[async_trait]
impl MessagingSink for TelegramClient {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, chat_id: i64, text: &str) -> Result<MessageHandle, MessagingError> {
        let params = SendMessageParams {
            chat_id,
            text,
            parse_mode: PARSE_MODE,
        };
        let message: Message = self.call("sendMessage", &params).await?;
        debug!(chat_id, message_id = message.message_id, "Sent message");

        Ok(MessageHandle::new(message.chat.id, message.message_id, text))
    }

    async fn edit(
        &self,
        handle: &MessageHandle,
        text: &str,
    ) -> Result<MessageHandle, MessagingError> {
        let params = EditMessageParams {
            chat_id: handle.chat_id,
            message_id: handle.message_id,
            text,
            parse_mode: PARSE_MODE,
        };
        // editMessageText returns either the message or `true` for inline messages
        let _: serde_json::Value = self.call("editMessageText", &params).await?;

        Ok(MessageHandle::new(handle.chat_id, handle.message_id, text))
    }

    async fn delete(&self, handle: &MessageHandle) -> Result<(), MessagingError> {
        let params = DeleteMessageParams {
            chat_id: handle.chat_id,
            message_id: handle.message_id,
        };
        let deleted: bool = self.call("deleteMessage", &params).await?;
        if !deleted {
            warn!(
                chat_id = handle.chat_id,
                message_id = handle.message_id,
                "Telegram reported message was not deleted"
            );
        }
        Ok(())
    }

    async fn send_audio(
        &self,
        chat_id: i64,
        audio: AudioDelivery,
    ) -> Result<MessageHandle, MessagingError> {
        let audio_part = Self::file_part(&audio.path, &audio.file_name, "audio/mpeg").await?;

        let mut form = multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("title", audio.title.clone())
            .text("caption", audio.caption.clone())
            .part("audio", audio_part);

        if let Some(ref thumb) = audio.thumbnail {
            match Self::file_part(thumb, "thumb.jpg", "image/jpeg").await {
                Ok(part) => form = form.part("thumbnail", part),
                Err(e) => warn!("Skipping thumbnail: {}", e),
            }
        }

        let message: Message = self.call_multipart("sendAudio", form).await?;
        debug!(chat_id, file = %audio.file_name, "Sent audio");

        Ok(MessageHandle::new(message.chat.id, message.message_id, audio.caption))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn test_config() -> TelegramConfig {
        TelegramConfig {
            token: "123:abc".to_string(),
            api_url: "https://api.telegram.org/".to_string(),
            poll_timeout_secs: 10,
        }
    }

    /// Bot API stand-in that reads each request in full, then answers after `delay`.
    async fn spawn_slow_api(delay: Duration) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(answer_after(stream, delay));
            }
        });

        addr
    }

    async fn answer_after(mut stream: TcpStream, delay: Duration) {
        let mut request = Vec::new();
        let mut buf = [0u8; 8192];
        let header_end = loop {
            let n = stream.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
            if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while request.len() < header_end + content_length {
            let n = stream.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        tokio::time::sleep(delay).await;

        let body = if head.contains("/getupdates") {
            r#"{"ok":true,"result":[]}"#
        } else {
            r#"{"ok":true,"result":{"message_id":9,"chat":{"id":42}}}"#
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }

    fn client_for(addr: SocketAddr) -> TelegramClient {
        let config = TelegramConfig {
            token: "123:abc".to_string(),
            api_url: format!("http://{}", addr),
            poll_timeout_secs: 0,
        };
        TelegramClient::new(config)
            .unwrap()
            .with_poll_grace(Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_send_audio_outlives_poll_deadline() {
        let addr = spawn_slow_api(Duration::from_millis(500)).await;
        let client = client_for(addr);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.00.mp3");
        tokio::fs::write(&path, vec![0u8; 64 * 1024]).await.unwrap();

        let audio = AudioDelivery {
            path,
            title: "A Talk".to_string(),
            caption: "A Talk : 00".to_string(),
            file_name: "abc.00.mp3".to_string(),
            thumbnail: None,
        };
        let handle = client.send_audio(42, audio).await.unwrap();

        assert_eq!(handle.chat_id, 42);
        assert_eq!(handle.message_id, 9);
    }

    #[tokio::test]
    async fn test_get_updates_is_bounded_by_poll_deadline() {
        let addr = spawn_slow_api(Duration::from_secs(5)).await;
        let client = client_for(addr);

        let started = std::time::Instant::now();
        let result = client.get_updates(0).await;

        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_poll_deadline_adds_grace() {
        let client = TelegramClient::new(test_config()).unwrap();
        assert_eq!(client.poll_deadline(), Duration::from_secs(40));
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("plain text"), "plain text");
        assert_eq!(escape_markdown("my_video *now*"), r"my\_video \*now\*");
        assert_eq!(escape_markdown("[link `x`"), r"\[link \`x\`");
    }

    #[test]
    fn test_method_url() {
        let client = TelegramClient::new(test_config()).unwrap();
        assert_eq!(
            client.method_url("sendMessage"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_update_into_inbound() {
        let json = r#"{
            "update_id": 10,
            "message": {
                "message_id": 5,
                "chat": {"id": 42},
                "from": {"id": 42, "first_name": "Ada"},
                "text": "https://example.com/watch?v=abc"
            }
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let inbound = update.into_inbound().unwrap();

        assert_eq!(inbound.requester.chat_id, 42);
        assert_eq!(inbound.requester.first_name, "Ada");
        assert_eq!(inbound.message.message_id, 5);
        assert_eq!(inbound.text, "https://example.com/watch?v=abc");
    }

    #[test]
    fn test_update_without_text_is_skipped() {
        let json = r#"{
            "update_id": 11,
            "message": {"message_id": 6, "chat": {"id": 42}}
        }"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert!(update.into_inbound().is_none());

        let update: Update = serde_json::from_str(r#"{"update_id": 12}"#).unwrap();
        assert!(update.into_inbound().is_none());
    }

    #[test]
    fn test_api_error_response() {
        let json = r#"{"ok": false, "description": "Bad Request: message not found"}"#;
        let body: ApiResponse<bool> = serde_json::from_str(json).unwrap();
        assert!(!body.ok);
        assert!(body.result.is_none());
        assert_eq!(
            body.description.as_deref(),
            Some("Bad Request: message not found")
        );
    }
}
