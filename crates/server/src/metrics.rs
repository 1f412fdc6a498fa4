//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the mediaq server:
//! - HTTP request metrics (latency, counts)
//! - WebSocket connection and RPC call metrics
//! - Dispatch lane and job status gauges (collected on scrape)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry, TextEncoder,
};

use mediaq_core::{JobStatus, LaneStatus};

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
            "mediaq_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediaq_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediaq_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// WebSocket and RPC Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediaq_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediaq_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// RPC calls by method and result, over both transports.
pub static RPC_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediaq_rpc_calls_total", "JSON-RPC calls handled"),
        &["method", "result"],
    )
    .unwrap()
});

// =============================================================================
// Dispatch Metrics (collected on scrape)
// =============================================================================

/// Jobs holding a slot, per lane.
pub static LANE_ACTIVE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("mediaq_lane_active", "Jobs currently holding a lane slot"),
        &["lane"],
    )
    .unwrap()
});

/// Jobs waiting for a slot, per lane.
pub static LANE_QUEUED: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("mediaq_lane_queued", "Jobs waiting for a lane slot"),
        &["lane"],
    )
    .unwrap()
});

/// Registered jobs by status.
pub static JOBS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("mediaq_jobs_by_status", "Registered jobs by status"),
        &["status"],
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

    // WebSocket / RPC
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry.register(Box::new(RPC_CALLS.clone())).unwrap();

    // Dispatch
    registry.register(Box::new(LANE_ACTIVE.clone())).unwrap();
    registry.register(Box::new(LANE_QUEUED.clone())).unwrap();
    registry
        .register(Box::new(JOBS_BY_STATUS.clone()))
        .unwrap();

    // Core metrics (jobs, downloader, persistence, livestreams)
    for metric in mediaq_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

fn record_lane(lane: &LaneStatus) {
    LANE_ACTIVE
        .with_label_values(&[&lane.name])
        .set(lane.active as i64);
    LANE_QUEUED
        .with_label_values(&[&lane.name])
        .set(lane.queued as i64);
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so the gauges reflect the queue and registry at
/// scrape time.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = state.service().queue_status();
    record_lane(&status.download);
    record_lane(&status.metadata);

    let summaries = state.service().list().await;
    for wanted in [
        JobStatus::Pending,
        JobStatus::Downloading,
        JobStatus::Completed,
        JobStatus::Errored,
        JobStatus::LivestreamWaiting,
    ] {
        let count = summaries
            .iter()
            .filter(|s| s.progress.status == wanted)
            .count();
        JOBS_BY_STATUS
            .with_label_values(&[wanted.as_str()])
            .set(count as i64);
    }
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    static UUID_REGEX: Lazy<regex_lite::Regex> = Lazy::new(|| {
        regex_lite::Regex::new(
            r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        )
        .unwrap()
    });
    static NUMERIC_REGEX: Lazy<regex_lite::Regex> =
        Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

    let result = UUID_REGEX.replace_all(path, "{id}");
    let result = NUMERIC_REGEX.replace_all(&result, "/{id}$1");
    result.to_string()
}
