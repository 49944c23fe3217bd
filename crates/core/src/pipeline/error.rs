//! Error types for the pipeline module.

use thiserror::Error;

use crate::messaging::MessagingError;

use super::types::Stage;

/// Errors raised by the dispatcher and the stage handlers.
///
/// Stage failures are terminal for their task; they reach the requester only as
/// an error annotation on the status message.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The request text is not a link.
    #[error("Not a link: {text:?}")]
    InvalidRequestShape { text: String },

    /// The downloader failed or timed out.
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// The converter failed.
    #[error("Transcode failed: {0}")]
    TranscodeFailed(String),

    /// Audio could not be delivered to the requester.
    #[error("Delivery failed: {0}")]
    PublishDeliveryFailed(String),

    /// The archive upload failed.
    #[error("Archive upload failed: {0}")]
    ArchivalUploadFailed(String),

    /// A stage received an envelope the fetch stage never enriched.
    #[error("Envelope reached {0} stage without media info")]
    IncompleteEnvelope(Stage),

    /// Pipeline is not running.
    #[error("Pipeline is not running")]
    NotRunning,

    /// Workers were already started.
    #[error("Pipeline already started")]
    AlreadyStarted,

    /// The messaging sink failed where the task cannot proceed without it.
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),
}

impl PipelineError {
    /// The stage this error terminated a task in, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::FetchFailed(_) => Some(Stage::Fetch),
            Self::TranscodeFailed(_) => Some(Stage::Transcode),
            Self::PublishDeliveryFailed(_) | Self::ArchivalUploadFailed(_) => Some(Stage::Publish),
            Self::IncompleteEnvelope(stage) => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_mapping() {
        assert_eq!(
            PipelineError::FetchFailed("x".into()).stage(),
            Some(Stage::Fetch)
        );
        assert_eq!(
            PipelineError::ArchivalUploadFailed("x".into()).stage(),
            Some(Stage::Publish)
        );
        assert_eq!(
            PipelineError::IncompleteEnvelope(Stage::Transcode).stage(),
            Some(Stage::Transcode)
        );
        assert_eq!(PipelineError::NotRunning.stage(), None);
    }

    #[test]
    fn test_display() {
        let err = PipelineError::IncompleteEnvelope(Stage::Publish);
        assert_eq!(err.to_string(), "Envelope reached publish stage without media info");
    }
}
