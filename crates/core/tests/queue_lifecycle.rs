//! Dispatch queue lifecycle integration tests.
//!
//! These tests drive the job service with a mock downloader:
//! - Download lane ceiling
//! - Pending jobs waiting for a slot
//! - Livestream jobs bypassing the ceiling
//! - Kill semantics, kill-all and clear
//! - Metadata lane independence

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use mediaq_core::{
    testing::{fixtures, MockDownloader},
    DownloaderError, JobService, JobSpec, JobStatus, ServiceError,
};

const WAIT: Duration = Duration::from_secs(5);

/// Test helper wiring a job service to a mock downloader.
struct TestHarness {
    service: JobService,
    downloader: MockDownloader,
    _temp_dir: TempDir,
}

impl TestHarness {
    async fn new(queue_size: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let downloader = MockDownloader::new();
        let config = fixtures::config(temp_dir.path(), queue_size);
        let service = JobService::new(&config, Arc::new(downloader.clone()));
        service.start().await;

        Self {
            service,
            downloader,
            _temp_dir: temp_dir,
        }
    }

    async fn submit(&self, url: &str) -> String {
        self.service
            .submit(fixtures::request(url))
            .await
            .expect("Failed to submit")
    }

    async fn status(&self, id: &str) -> JobStatus {
        self.service.progress(id).await.expect("Job missing").status
    }

    async fn wait_for(&self, id: &str, status: JobStatus) -> bool {
        fixtures::wait_for_status(self.service.registry(), id, status, WAIT).await
    }

    async fn wait_until_active(&self, count: usize) -> bool {
        let deadline = tokio::time::Instant::now() + WAIT;
        while tokio::time::Instant::now() < deadline {
            if self.downloader.active() == count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[tokio::test]
async fn test_download_lane_respects_ceiling() {
    let harness = TestHarness::new(3).await;
    harness
        .downloader
        .set_download_duration(Duration::from_millis(40))
        .await;

    let mut ids = Vec::new();
    for i in 0..12 {
        ids.push(harness.submit(&format!("https://example.com/v{}", i)).await);
    }

    for id in &ids {
        assert!(harness.wait_for(id, JobStatus::Completed).await, "job {} stuck", id);
    }

    assert_eq!(harness.downloader.downloaded_urls().await.len(), 12);
    assert!(harness.downloader.max_concurrent() <= 3);
    assert!(harness.downloader.max_concurrent() >= 2);

    let status = harness.service.queue_status();
    assert_eq!(status.download.max_concurrent, 3);
    assert_eq!(status.download.total_processed, 12);
    assert_eq!(status.download.queued, 0);
}

#[tokio::test]
async fn test_second_job_waits_for_first() {
    let harness = TestHarness::new(1).await;
    harness.downloader.hold_downloads().await;

    let first = harness.submit("https://example.com/v1").await;
    let second = harness.submit("https://example.com/v2").await;

    assert!(harness.wait_for(&first, JobStatus::Downloading).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.status(&second).await, JobStatus::Pending);
    assert_eq!(harness.service.pending().await, vec![second.clone()]);
    assert_eq!(harness.service.running().await, vec![first.clone()]);

    harness.downloader.release(&first).await;
    assert!(harness.wait_for(&first, JobStatus::Completed).await);
    assert!(harness.wait_for(&second, JobStatus::Downloading).await);

    harness.downloader.release(&second).await;
    assert!(harness.wait_for(&second, JobStatus::Completed).await);
    assert_eq!(harness.downloader.max_concurrent(), 1);
}

#[tokio::test]
async fn test_completed_jobs_follow_convention() {
    let harness = TestHarness::new(2).await;
    let id = harness.submit("https://example.com/v1").await;

    assert!(harness.wait_for(&id, JobStatus::Completed).await);
    let progress = harness.service.progress(&id).await.unwrap();
    assert_eq!(progress.percentage, "-1");
    assert_eq!(progress.speed, 0.0);
    assert_eq!(progress.eta, 0.0);

    // The saved path lands just after the status flips.
    let deadline = tokio::time::Instant::now() + WAIT;
    while harness
        .service
        .summary(&id)
        .await
        .unwrap()
        .output
        .saved_file_path
        .is_none()
    {
        assert!(tokio::time::Instant::now() < deadline, "saved path never set");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_livestream_job_skips_download_backlog() {
    let harness = TestHarness::new(1).await;
    harness.downloader.hold_downloads().await;

    let first = harness.submit("https://example.com/v1").await;
    let second = harness.submit("https://example.com/v2").await;
    assert!(harness.wait_for(&first, JobStatus::Downloading).await);

    let live = harness
        .service
        .registry()
        .put(JobSpec {
            livestream: true,
            ..JobSpec::from_request(&fixtures::request("https://example.com/live"), "downloads")
        })
        .await;
    harness
        .service
        .queue()
        .publish(Arc::clone(&live))
        .await
        .expect("publish failed");

    assert!(harness.wait_for(live.id(), JobStatus::Downloading).await);
    assert!(harness.wait_until_active(2).await);
    assert_eq!(harness.status(&second).await, JobStatus::Pending);

    harness.downloader.release(live.id()).await;
    assert!(harness.wait_for(live.id(), JobStatus::Completed).await);
    harness.service.kill_all().await.unwrap();
}

// =============================================================================
// Kill Tests
// =============================================================================

#[tokio::test]
async fn test_kill_twice_reports_no_live_process() {
    let harness = TestHarness::new(1).await;
    harness.downloader.hold_downloads().await;

    let id = harness.submit("https://example.com/v1").await;
    assert!(harness.wait_for(&id, JobStatus::Downloading).await);

    harness.service.kill(&id).await.expect("first kill succeeds");
    assert_eq!(harness.status(&id).await, JobStatus::Completed);

    let err = harness.service.kill(&id).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Downloader(DownloaderError::NoLiveProcess { .. })
    ));
    assert!(err.is_client_error());

    // Killed jobs stay listed.
    assert!(harness.service.list_ids().await.contains(&id));
}

#[tokio::test]
async fn test_kill_unknown_job_is_not_found() {
    let harness = TestHarness::new(1).await;
    let err = harness.service.kill("no-such-job").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_kill_pending_job_leaves_status() {
    let harness = TestHarness::new(1).await;
    harness.downloader.hold_downloads().await;

    let first = harness.submit("https://example.com/v1").await;
    let second = harness.submit("https://example.com/v2").await;
    assert!(harness.wait_for(&first, JobStatus::Downloading).await);

    assert!(harness.service.kill(&second).await.is_err());
    assert_eq!(harness.status(&second).await, JobStatus::Pending);
}

#[tokio::test]
async fn test_kill_all_stops_running_and_queued() {
    let harness = TestHarness::new(1).await;
    harness.downloader.hold_downloads().await;

    let first = harness.submit("https://example.com/v1").await;
    let second = harness.submit("https://example.com/v2").await;
    let third = harness.submit("https://example.com/v3").await;
    assert!(harness.wait_for(&first, JobStatus::Downloading).await);

    let stopped = harness.service.kill_all().await.unwrap();
    assert_eq!(stopped, 3);

    for id in [&first, &second, &third] {
        assert!(harness.wait_for(id, JobStatus::Completed).await);
    }

    // Drained entries never reach the downloader.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        harness.downloader.downloaded_urls().await,
        vec!["https://example.com/v1".to_string()]
    );
    assert!(harness.wait_until_active(0).await);
}

#[tokio::test]
async fn test_clear_removes_job() {
    let harness = TestHarness::new(1).await;
    let id = harness.submit("https://example.com/v1").await;
    assert!(harness.wait_for(&id, JobStatus::Completed).await);

    harness.service.clear(&id).await.unwrap();
    assert!(harness.service.progress(&id).await.unwrap_err().is_not_found());
    assert!(harness.service.clear(&id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_clear_pending_job_never_downloads() {
    let harness = TestHarness::new(1).await;
    harness.downloader.hold_downloads().await;

    let first = harness.submit("https://example.com/v1").await;
    let second = harness.submit("https://example.com/v2").await;
    assert!(harness.wait_for(&first, JobStatus::Downloading).await);

    harness.service.clear(&second).await.unwrap();
    harness.downloader.release(&first).await;
    assert!(harness.wait_for(&first, JobStatus::Completed).await);

    // Give the lane a chance to pick up the cleared entry.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        harness.downloader.downloaded_urls().await,
        vec!["https://example.com/v1".to_string()]
    );
    assert_eq!(harness.service.list_ids().await, vec![first]);
    assert_eq!(harness.service.queue_status().download.queued, 0);
}

// =============================================================================
// Metadata Lane Tests
// =============================================================================

#[tokio::test]
async fn test_metadata_populates_info() {
    let harness = TestHarness::new(1).await;
    harness
        .downloader
        .set_metadata(
            "https://example.com/v1",
            fixtures::info("https://cdn.example.com/raw", "A Title"),
        )
        .await;

    let id = harness.submit("https://example.com/v1").await;
    assert!(harness.wait_for(&id, JobStatus::Completed).await);

    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let summary = harness.service.summary(&id).await.unwrap();
        if summary.info.title == "A Title" {
            assert_eq!(summary.info.url, "https://example.com/v1");
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "metadata never applied");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_metadata_failure_does_not_block_download() {
    let harness = TestHarness::new(1).await;
    let id = harness.submit("https://example.com/no-metadata").await;

    assert!(harness.wait_for(&id, JobStatus::Completed).await);
    let summary = harness.service.summary(&id).await.unwrap();
    assert_eq!(summary.info.title, "https://example.com/no-metadata");
    assert!(summary.error.is_none());
}

#[tokio::test]
async fn test_metadata_runs_while_downloads_are_held() {
    let harness = TestHarness::new(1).await;
    harness.downloader.hold_downloads().await;

    let first = harness.submit("https://example.com/v1").await;
    harness.submit("https://example.com/v2").await;
    assert!(harness.wait_for(&first, JobStatus::Downloading).await);

    let deadline = tokio::time::Instant::now() + WAIT;
    while harness.downloader.metadata_requests().await.len() < 2 {
        assert!(tokio::time::Instant::now() < deadline, "metadata lane stalled");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(harness.service.queue_status().metadata.max_concurrent, 1);

    harness.service.kill_all().await.unwrap();
}

#[tokio::test]
async fn test_empty_url_is_rejected() {
    let harness = TestHarness::new(1).await;
    let err = harness
        .service
        .submit(fixtures::request("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidRequest(_)));
    assert!(harness.service.list_ids().await.is_empty());
}
