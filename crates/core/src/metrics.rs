//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Job submissions and outcomes
//! - Downloader subprocesses and metadata fetches
//! - Snapshot persistence
//! - Livestream watchers

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Jobs
// =============================================================================

/// Jobs submitted by kind.
pub static JOBS_SUBMITTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediaq_jobs_submitted_total", "Total jobs submitted"),
        &["kind"], // "single", "playlist_entry", "livestream"
    )
    .unwrap()
});

/// Jobs whose download run ended, by final status.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediaq_jobs_finished_total", "Total jobs whose download ended"),
        &["status"], // "completed", "errored"
    )
    .unwrap()
});

/// Kill requests by result.
pub static KILLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediaq_kills_total", "Total kill requests"),
        &["result"], // "killed", "no_process", "failed"
    )
    .unwrap()
});

// =============================================================================
// Downloader
// =============================================================================

/// Downloader subprocesses currently running.
pub static DOWNLOADS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediaq_downloads_active",
        "Number of downloader subprocesses currently running",
    )
    .unwrap()
});

/// Metadata fetches that failed.
pub static METADATA_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediaq_metadata_failures_total",
        "Total failed metadata fetches",
    )
    .unwrap()
});

// =============================================================================
// Persistence
// =============================================================================

/// Snapshot writes by target and result.
pub static PERSISTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("mediaq_persists_total", "Total snapshot writes"),
        &["target", "result"], // target: "session", "livestreams"
    )
    .unwrap()
});

// =============================================================================
// Livestreams
// =============================================================================

/// Livestreams currently watched.
pub static LIVESTREAMS_WATCHED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediaq_livestreams_watched",
        "Number of livestreams currently watched",
    )
    .unwrap()
});

/// Watched livestreams that went live.
pub static LIVESTREAMS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediaq_livestreams_started_total",
        "Total watched livestreams that went live",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_SUBMITTED.clone()),
        Box::new(JOBS_FINISHED.clone()),
        Box::new(KILLS.clone()),
        // Downloader
        Box::new(DOWNLOADS_ACTIVE.clone()),
        Box::new(METADATA_FAILURES.clone()),
        // Persistence
        Box::new(PERSISTS.clone()),
        // Livestreams
        Box::new(LIVESTREAMS_WATCHED.clone()),
        Box::new(LIVESTREAMS_STARTED.clone()),
    ]
}
