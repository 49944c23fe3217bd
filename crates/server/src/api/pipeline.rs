//! Pipeline API endpoints.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use tubecast_core::pipeline::{PoolStatus, Stage};

use crate::state::AppState;

/// Response for pipeline status endpoint.
#[derive(Debug, Serialize)]
pub struct PipelineStatusResponse {
    /// Whether the worker pools are running.
    pub running: bool,
    /// Whether delivered audio is also archived.
    pub archive_enabled: bool,
    /// Status message.
    pub message: String,
    /// One entry per stage, in processing order.
    pub pools: Vec<PoolStatusResponse>,
}

/// Pool status in response.
#[derive(Debug, Serialize)]
pub struct PoolStatusResponse {
    /// Stage served by the pool.
    pub name: String,
    /// Number of busy workers.
    pub active_jobs: usize,
    /// Configured worker count.
    pub max_concurrent: usize,
    /// Senders waiting for a free worker.
    pub queued_jobs: usize,
    /// Total envelopes handled since startup.
    pub total_processed: u64,
    /// Total envelopes failed since startup.
    pub total_failed: u64,
}

impl From<&PoolStatus> for PoolStatusResponse {
    fn from(pool: &PoolStatus) -> Self {
        Self {
            name: pool.stage.to_string(),
            active_jobs: pool.active_jobs,
            max_concurrent: pool.max_concurrent,
            queued_jobs: pool.queued_jobs,
            total_processed: pool.total_processed,
            total_failed: pool.total_failed,
        }
    }
}

/// GET /api/v1/pipeline/status
///
/// Returns the worker pool snapshot of every stage.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<PipelineStatusResponse> {
    let status = state.dispatcher().status();

    Json(PipelineStatusResponse {
        running: status.running,
        archive_enabled: status.archive_enabled,
        message: if status.running {
            "Pipeline is running".to_string()
        } else {
            "Pipeline is stopped".to_string()
        },
        pools: Stage::ALL
            .iter()
            .map(|stage| PoolStatusResponse::from(status.pool(*stage)))
            .collect(),
    })
}
