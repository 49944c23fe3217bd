//! Types for the pipeline module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use crate::messaging::{InboundMessage, MessageHandle, Requester};

use super::error::PipelineError;

/// One of the three sequential processing phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Transcode,
    Publish,
}

impl Stage {
    /// All stages in processing order.
    pub const ALL: [Stage; 3] = [Stage::Fetch, Stage::Transcode, Stage::Publish];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fetch => "fetch",
            Stage::Transcode => "transcode",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of work threaded through every stage.
///
/// Owned by exactly one worker at a time; stage channels move it from one
/// worker to the next.
#[derive(Debug, Clone)]
pub struct TaskEnvelope {
    /// Correlates log lines and events of one task.
    pub task_id: Uuid,
    /// Who asked for it.
    pub requester: Requester,
    /// The requester's original message, deleted once the fetch succeeds.
    pub request_message: MessageHandle,
    /// Original request string. Never modified.
    pub source_locator: String,
    /// The task's status message. Set by the first stage, edited afterwards.
    pub status: Option<MessageHandle>,
    /// Set by the fetch stage.
    pub media_id: Option<String>,
    /// Set by the fetch stage.
    pub title: Option<String>,
    /// Set by the fetch stage when a thumbnail could be produced.
    pub thumbnail: Option<PathBuf>,
    pub submitted_at: DateTime<Utc>,
}

/// Fields every stage after fetch depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedTask {
    pub media_id: String,
    pub title: String,
    pub status: MessageHandle,
}

impl TaskEnvelope {
    /// Creates the envelope for an accepted request.
    pub fn new(request: InboundMessage) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            requester: request.requester,
            request_message: request.message,
            source_locator: request.text,
            status: None,
            media_id: None,
            title: None,
            thumbnail: None,
            submitted_at: Utc::now(),
        }
    }

    /// Returns the fetch-stage fields, failing if any of them is missing or empty.
    pub fn fetched(&self, stage: Stage) -> Result<FetchedTask, PipelineError> {
        let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_string);

        match (non_empty(&self.media_id), non_empty(&self.title), &self.status) {
            (Some(media_id), Some(title), Some(status)) => Ok(FetchedTask {
                media_id,
                title,
                status: status.clone(),
            }),
            _ => Err(PipelineError::IncompleteEnvelope(stage)),
        }
    }
}

/// Status of one stage's worker pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Stage served by the pool.
    pub stage: Stage,
    /// Configured worker count (0 before start).
    pub max_concurrent: usize,
    /// Workers currently inside the stage handler.
    pub active_jobs: usize,
    /// Senders blocked waiting for a free worker.
    pub queued_jobs: usize,
    /// Envelopes handled successfully since startup.
    pub total_processed: u64,
    /// Envelopes that failed in this stage since startup.
    pub total_failed: u64,
}

/// Overall pipeline status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStatus {
    /// Whether workers are running.
    pub running: bool,
    /// Whether delivered audio is also archived.
    pub archive_enabled: bool,
    pub fetch_pool: PoolStatus,
    pub transcode_pool: PoolStatus,
    pub publish_pool: PoolStatus,
}

impl PipelineStatus {
    /// Pool status of `stage`.
    pub fn pool(&self, stage: Stage) -> &PoolStatus {
        match stage {
            Stage::Fetch => &self.fetch_pool,
            Stage::Transcode => &self.transcode_pool,
            Stage::Publish => &self.publish_pool,
        }
    }
}

/// Progress notifications emitted while tasks move through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// Media was fetched.
    Fetched {
        task_id: Uuid,
        media_id: String,
        title: String,
    },
    /// Audio was extracted and segmented.
    Transcoded { task_id: Uuid, segments: usize },
    /// All segments were delivered to the requester.
    Delivered { task_id: Uuid, segments: usize },
    /// Audio was archived.
    Archived {
        task_id: Uuid,
        item_id: String,
        feed_url: String,
    },
    /// Temporary files were removed and the status message deleted.
    CleanedUp { task_id: Uuid, files_removed: usize },
    /// The task terminated.
    Failed {
        task_id: Uuid,
        stage: Stage,
        error: String,
    },
}

impl TaskEvent {
    pub fn task_id(&self) -> Uuid {
        match self {
            TaskEvent::Fetched { task_id, .. }
            | TaskEvent::Transcoded { task_id, .. }
            | TaskEvent::Delivered { task_id, .. }
            | TaskEvent::Archived { task_id, .. }
            | TaskEvent::CleanedUp { task_id, .. }
            | TaskEvent::Failed { task_id, .. } => *task_id,
        }
    }
}
