//! Staged media pipeline: fetch -> transcode -> publish.
//!
//! Each stage has its own worker pool fed by a rendezvous channel, so a slow
//! stage throttles the stages in front of it instead of piling up work:
//! - Fetch: network-bound, downloads the source media
//! - Transcode: CPU-bound, extracts and segments the audio (small pool)
//! - Publish: network-bound, delivers segments, optionally archives, cleans up
//!
//! A [`TaskEnvelope`] is owned by exactly one worker at a time and only moves
//! forward. Any stage failure ends the task with an error annotation on its
//! status message; only a successful publish removes the task's temp files.
//!
//! # Example
//!
//! ```ignore
//! use tubecast_core::pipeline::{Collaborators, PipelineDispatcher};
//!
//! let dispatcher = PipelineDispatcher::new(config.pipeline_config(), collaborators);
//! dispatcher.start(5, 2, 5).await?;
//!
//! dispatcher.submit(inbound_message).await?;
//!
//! let status = dispatcher.status();
//! println!("Transcoding: {}", status.transcode_pool.active_jobs);
//!
//! dispatcher.stop().await;
//! ```

mod channel;
mod config;
mod dispatcher;
mod error;
mod handlers;
mod types;

pub use channel::{stage_channel, SendError, StageReceiver, StageSender};
pub use config::PipelineConfig;
pub use dispatcher::{invalid_request_reply, is_plausible_link, PipelineDispatcher};
pub use error::PipelineError;
pub use handlers::{
    status_archived, Collaborators, StageHandlers, STATUS_ARCHIVING, STATUS_ERROR,
    STATUS_FETCHING, STATUS_TRANSCODING,
};
pub use types::{FetchedTask, PipelineStatus, PoolStatus, Stage, TaskEnvelope, TaskEvent};
