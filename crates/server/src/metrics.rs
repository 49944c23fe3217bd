//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the tubecast server:
//! - HTTP request metrics (latency, counts)
//! - Worker pool gauges per stage (collected dynamically)
//! - Pipeline counters registered from the core crate

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

use tubecast_core::pipeline::Stage;

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tubecast_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tubecast_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "tubecast_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Pipeline Metrics (collected dynamically)
// =============================================================================

/// Pipeline running state (1 = running, 0 = stopped).
pub static PIPELINE_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "tubecast_pipeline_running",
        "Whether the pipeline is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Workers currently inside a stage handler.
pub static POOL_ACTIVE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("tubecast_pool_active", "Number of busy workers per stage"),
        &["stage"],
    )
    .unwrap()
});

/// Hand-offs blocked waiting for a free worker.
pub static POOL_QUEUED: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "tubecast_pool_queued",
            "Number of senders waiting for a free worker per stage",
        ),
        &["stage"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Pools
    registry
        .register(Box::new(PIPELINE_RUNNING.clone()))
        .unwrap();
    registry.register(Box::new(POOL_ACTIVE.clone())).unwrap();
    registry.register(Box::new(POOL_QUEUED.clone())).unwrap();

    // Core metrics (intake, stages, publish)
    for metric in tubecast_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Refresh pool gauges from the dispatcher before encoding.
pub fn collect_dynamic_metrics(state: &AppState) {
    let status = state.dispatcher().status();
    PIPELINE_RUNNING.set(if status.running { 1 } else { 0 });

    for stage in Stage::ALL {
        let pool = status.pool(stage);
        POOL_ACTIVE
            .with_label_values(&[stage.as_str()])
            .set(pool.active_jobs as i64);
        POOL_QUEUED
            .with_label_values(&[stage.as_str()])
            .set(pool.queued_jobs as i64);
    }
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    static UUID: Lazy<regex_lite::Regex> = Lazy::new(|| {
        regex_lite::Regex::new(
            r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        )
        .unwrap()
    });
    static NUMERIC: Lazy<regex_lite::Regex> =
        Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

    let result = UUID.replace_all(path, "{id}");
    let result = NUMERIC.replace_all(&result, "/{id}$1");
    result.to_string()
}
