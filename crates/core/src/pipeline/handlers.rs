//! Stage handlers: the per-stage orchestration run by workers.
//!
//! Each handler takes ownership of an envelope, drives one collaborator, keeps
//! the status message current, and either returns the envelope for the next
//! stage or terminates the task with a [`PipelineError`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::converter::Converter;
use crate::downloader::{Downloader, DownloaderError, FetchedMedia};
use crate::media::MediaPaths;
use crate::messaging::{AudioDelivery, MessageHandle, MessagingError, MessagingSink};
use crate::metrics::{ARCHIVE_UPLOADS, CLEANUP_FILES_REMOVED, SEGMENTS_DELIVERED};
use crate::uploader::{ArchiveFeed, Uploader};

use super::config::PipelineConfig;
use super::error::PipelineError;
use super::types::{Stage, TaskEnvelope, TaskEvent};

/// First status text of every task.
pub const STATUS_FETCHING: &str = "*Download* ...";
/// Appended when transcoding starts.
pub const STATUS_TRANSCODING: &str = " *Extract audio* ... ";
/// Appended when archival starts.
pub const STATUS_ARCHIVING: &str = " *Upload to podcast* ... ";
/// Appended when a stage fails.
pub const STATUS_ERROR: &str = "\nError occurred";

/// Appended after a successful archive upload.
pub fn status_archived(feed_url: &str) -> String {
    format!(
        " *Done!*\n_It will take a couple of minutes to index a new file_\nAdd this [Link]({}) to your podcast player",
        feed_url
    )
}

/// External services the handlers drive.
#[derive(Clone)]
pub struct Collaborators {
    pub downloader: Arc<dyn Downloader>,
    pub converter: Arc<dyn Converter>,
    /// Required for archival; without it archival stays off.
    pub uploader: Option<Arc<dyn Uploader>>,
    pub messaging: Arc<dyn MessagingSink>,
}

/// Handlers for all three stages, shared by every worker.
pub struct StageHandlers {
    collaborators: Collaborators,
    config: PipelineConfig,
    paths: MediaPaths,
    events: Option<mpsc::Sender<TaskEvent>>,
}

impl StageHandlers {
    pub fn new(
        config: PipelineConfig,
        collaborators: Collaborators,
        events: Option<mpsc::Sender<TaskEvent>>,
    ) -> Self {
        if config.archive.is_some() && collaborators.uploader.is_none() {
            warn!("Archive feed configured without an uploader, archival disabled");
        }
        let paths = MediaPaths::new(&config.temp_dir);

        Self {
            collaborators,
            config,
            paths,
            events,
        }
    }

    /// Feed and uploader, when archival is active.
    fn archive_target(&self) -> Option<(&ArchiveFeed, &Arc<dyn Uploader>)> {
        self.config
            .archive
            .as_ref()
            .zip(self.collaborators.uploader.as_ref())
    }

    pub fn archive_enabled(&self) -> bool {
        self.archive_target().is_some()
    }

    /// Runs the handler of `stage`. `Some` means forward to the next stage.
    pub async fn handle(
        &self,
        stage: Stage,
        envelope: TaskEnvelope,
    ) -> Result<Option<TaskEnvelope>, PipelineError> {
        match stage {
            Stage::Fetch => self.fetch(envelope).await.map(Some),
            Stage::Transcode => self.transcode(envelope).await.map(Some),
            Stage::Publish => self.publish(envelope).await.map(|()| None),
        }
    }

    /// Fetch stage: create the status message, fetch, enrich the envelope.
    pub async fn fetch(&self, mut envelope: TaskEnvelope) -> Result<TaskEnvelope, PipelineError> {
        let messaging = &self.collaborators.messaging;
        let status = messaging
            .send(envelope.requester.chat_id, STATUS_FETCHING)
            .await?;
        envelope.status = Some(status.clone());

        let media = match self.fetch_with_deadline(&envelope.source_locator).await {
            Ok(media) => media,
            Err(e) => {
                self.annotate(status, STATUS_ERROR).await;
                return Err(PipelineError::FetchFailed(e.to_string()));
            }
        };

        info!(
            task_id = %envelope.task_id,
            media_id = %media.media_id,
            title = %media.title,
            "Fetched media"
        );

        if let Err(e) = messaging.delete(&envelope.request_message).await {
            warn!(task_id = %envelope.task_id, "Failed to delete request message: {}", e);
        }

        self.emit(TaskEvent::Fetched {
            task_id: envelope.task_id,
            media_id: media.media_id.clone(),
            title: media.title.clone(),
        });

        envelope.media_id = Some(media.media_id);
        envelope.title = Some(media.title);
        envelope.thumbnail = media.thumbnail;
        Ok(envelope)
    }

    async fn fetch_with_deadline(&self, locator: &str) -> Result<FetchedMedia, DownloaderError> {
        let fetch = self.collaborators.downloader.fetch(locator);
        match self.config.fetch_timeout_secs {
            0 => fetch.await,
            secs => tokio::time::timeout(Duration::from_secs(secs), fetch)
                .await
                .unwrap_or(Err(DownloaderError::Timeout { timeout_secs: secs })),
        }
    }

    /// Transcode stage: annotate, then extract and segment the audio.
    pub async fn transcode(
        &self,
        mut envelope: TaskEnvelope,
    ) -> Result<TaskEnvelope, PipelineError> {
        let task = envelope.fetched(Stage::Transcode)?;
        let status = self.annotate(task.status, STATUS_TRANSCODING).await;
        envelope.status = Some(status.clone());

        match self.collaborators.converter.transcode(&task.media_id).await {
            Ok(result) => {
                info!(
                    task_id = %envelope.task_id,
                    media_id = %task.media_id,
                    segments = result.segments.len(),
                    "Transcoded media"
                );
                self.emit(TaskEvent::Transcoded {
                    task_id: envelope.task_id,
                    segments: result.segments.len(),
                });
                Ok(envelope)
            }
            Err(e) => {
                self.annotate(status, STATUS_ERROR).await;
                Err(PipelineError::TranscodeFailed(e.to_string()))
            }
        }
    }

    /// Publish stage: deliver segments, optionally archive, then clean up.
    pub async fn publish(&self, envelope: TaskEnvelope) -> Result<(), PipelineError> {
        let task = envelope.fetched(Stage::Publish)?;
        let chat_id = envelope.requester.chat_id;
        let mut status = task.status;

        let segments = match self.paths.segments(&task.media_id).await {
            Ok(segments) if !segments.is_empty() => segments,
            Ok(_) => {
                self.annotate(status, STATUS_ERROR).await;
                return Err(PipelineError::PublishDeliveryFailed(format!(
                    "no segments found for {}",
                    task.media_id
                )));
            }
            Err(e) => {
                self.annotate(status, STATUS_ERROR).await;
                return Err(PipelineError::PublishDeliveryFailed(e.to_string()));
            }
        };

        // Highest index first.
        for segment in segments.iter().rev() {
            let label = format!("{} : {}", task.title, segment.label());
            let delivery = AudioDelivery {
                path: segment.path.clone(),
                title: label.clone(),
                caption: label.clone(),
                file_name: label,
                thumbnail: envelope.thumbnail.clone(),
            };

            if let Err(e) = self
                .collaborators
                .messaging
                .send_audio(chat_id, delivery)
                .await
            {
                self.annotate(status, STATUS_ERROR).await;
                return Err(PipelineError::PublishDeliveryFailed(e.to_string()));
            }
            SEGMENTS_DELIVERED.inc();
            debug!(task_id = %envelope.task_id, segment = segment.index, "Delivered segment");
        }

        self.emit(TaskEvent::Delivered {
            task_id: envelope.task_id,
            segments: segments.len(),
        });

        if let Some((feed, uploader)) = self.archive_target() {
            status = self.annotate(status, STATUS_ARCHIVING).await;
            let prefix = feed.item_prefix_for(chat_id);

            match uploader.upload(&task.media_id, &task.title, &prefix).await {
                Ok(receipt) => {
                    ARCHIVE_UPLOADS.with_label_values(&["success"]).inc();
                    let feed_url = feed.feed_url(&prefix);
                    info!(
                        task_id = %envelope.task_id,
                        item_id = %receipt.item_id,
                        "Archived audio"
                    );
                    status = self.annotate(status, &status_archived(&feed_url)).await;
                    self.emit(TaskEvent::Archived {
                        task_id: envelope.task_id,
                        item_id: receipt.item_id,
                        feed_url,
                    });
                }
                Err(e) => {
                    ARCHIVE_UPLOADS.with_label_values(&["failed"]).inc();
                    self.annotate(status, STATUS_ERROR).await;
                    return Err(PipelineError::ArchivalUploadFailed(e.to_string()));
                }
            }
        }

        self.cleanup(&envelope, &task.media_id, &status).await;
        Ok(())
    }

    /// Removes every temp artifact of the task and deletes its status message.
    async fn cleanup(&self, envelope: &TaskEnvelope, media_id: &str, status: &MessageHandle) {
        let files_removed = match self.paths.remove_artifacts(media_id).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(task_id = %envelope.task_id, media_id, "Failed to list temp artifacts: {}", e);
                0
            }
        };
        CLEANUP_FILES_REMOVED.inc_by(files_removed as u64);

        if let Err(e) = self.collaborators.messaging.delete(status).await {
            warn!(task_id = %envelope.task_id, "Failed to delete status message: {}", e);
        }

        debug!(task_id = %envelope.task_id, media_id, files_removed, "Cleaned up task");
        self.emit(TaskEvent::CleanedUp {
            task_id: envelope.task_id,
            files_removed,
        });
    }

    /// Appends `annotation` to the status message.
    ///
    /// A failed edit keeps the previous handle; the status text is cosmetic.
    async fn annotate(&self, handle: MessageHandle, annotation: &str) -> MessageHandle {
        let text = format!("{}{}", handle.text, annotation);
        match self.collaborators.messaging.edit(&handle, &text).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!(
                    chat_id = handle.chat_id,
                    message_id = handle.message_id,
                    "Failed to update status message: {}",
                    e
                );
                handle
            }
        }
    }

    /// Sends a standalone message to `chat_id`.
    pub async fn reply(&self, chat_id: i64, text: &str) -> Result<MessageHandle, MessagingError> {
        self.collaborators.messaging.send(chat_id, text).await
    }

    /// Emits an event without ever blocking the worker.
    pub(crate) fn emit(&self, event: TaskEvent) {
        if let Some(ref tx) = self.events {
            if let Err(e) = tx.try_send(event) {
                debug!("Dropped task event: {}", e);
            }
        }
    }
}
