//! Messaging module for talking to requesters.
//!
//! The pipeline only sees the [`MessagingSink`] trait: send a status message,
//! edit it in place, delete it, and upload audio. [`TelegramClient`] is the
//! Bot API implementation and also exposes long polling for the front-end.

mod error;
mod telegram;
mod traits;
mod types;

pub use error::MessagingError;
pub use telegram::{escape_markdown, TelegramClient, Update};
pub use traits::MessagingSink;
pub use types::{AudioDelivery, InboundMessage, MessageHandle, Requester};
