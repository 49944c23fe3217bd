//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Task intake (submitted, rejected)
//! - Stage outcomes and durations
//! - Delivery, archival and cleanup

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Intake
// =============================================================================

/// Requests accepted onto the fetch channel.
pub static TASKS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("tubecast_tasks_submitted_total", "Total tasks accepted").unwrap()
});

/// Requests rejected before an envelope was created.
pub static TASKS_REJECTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tubecast_tasks_rejected_total",
        "Total requests rejected as not being a link",
    )
    .unwrap()
});

// =============================================================================
// Stages
// =============================================================================

/// Stage handler runs by stage and result.
pub static STAGE_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tubecast_stage_outcomes_total", "Stage handler outcomes"),
        &["stage", "result"], // "fetch"/"transcode"/"publish", "success"/"failed"
    )
    .unwrap()
});

/// Stage handler duration in seconds.
pub static STAGE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("tubecast_stage_duration_seconds", "Duration of stage handlers")
            .buckets(vec![
                0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0,
            ]),
        &["stage", "result"],
    )
    .unwrap()
});

// =============================================================================
// Publish
// =============================================================================

/// Audio segments delivered to requesters.
pub static SEGMENTS_DELIVERED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tubecast_segments_delivered_total",
        "Total audio segments delivered",
    )
    .unwrap()
});

/// Archive uploads by result.
pub static ARCHIVE_UPLOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tubecast_archive_uploads_total", "Total archive uploads"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Temp files removed by task cleanup.
pub static CLEANUP_FILES_REMOVED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tubecast_cleanup_files_removed_total",
        "Total temporary files removed by cleanup",
    )
    .unwrap()
});

/// Returns all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Intake
        Box::new(TASKS_SUBMITTED.clone()),
        Box::new(TASKS_REJECTED.clone()),
        // Stages
        Box::new(STAGE_OUTCOMES.clone()),
        Box::new(STAGE_DURATION.clone()),
        // Publish
        Box::new(SEGMENTS_DELIVERED.clone()),
        Box::new(ARCHIVE_UPLOADS.clone()),
        Box::new(CLEANUP_FILES_REMOVED.clone()),
    ]
}
