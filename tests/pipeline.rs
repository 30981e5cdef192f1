//! End-to-end pipeline scenarios against in-memory collaborators: queue,
//! job store, object store and notifier are all injected doubles, and the
//! transcoder runs in stub mode so no real encoder is needed.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use encoding_worker::infrastructure::queue::memory::MemoryWorkQueue;
use encoding_worker::infrastructure::queue::{QueuedJob, WorkQueue};
use encoding_worker::infrastructure::storage::memory::MemoryObjectStore;
use encoding_worker::modules::job::model::{EncodingJob, JobStatus, LogLevel};
use encoding_worker::modules::job::store::{JobStore, MemoryJobStore};
use encoding_worker::workers::notifier::{NotifyStatus, StatusNotifier};
use encoding_worker::workers::pipeline::{JobPipeline, PipelineSettings};
use encoding_worker::workers::transcode::Transcoder;

#[derive(Default)]
struct RecordingNotifier {
    calls: Mutex<Vec<(Uuid, NotifyStatus, Option<String>)>>,
}

impl RecordingNotifier {
    fn calls(&self) -> Vec<(Uuid, NotifyStatus, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusNotifier for RecordingNotifier {
    async fn notify(&self, video_id: Uuid, status: NotifyStatus, error_message: Option<&str>) {
        self.calls
            .lock()
            .unwrap()
            .push((video_id, status, error_message.map(String::from)));
    }
}

struct Harness {
    store: Arc<MemoryJobStore>,
    queue: Arc<MemoryWorkQueue>,
    storage: Arc<MemoryObjectStore>,
    notifier: Arc<RecordingNotifier>,
    descriptor: QueuedJob,
    settings: PipelineSettings,
    _scratch: tempfile::TempDir,
}

impl Harness {
    fn new() -> Self {
        let scratch = tempfile::tempdir().unwrap();
        let video_id = Uuid::new_v4();
        let descriptor = QueuedJob {
            job_id: Uuid::new_v4(),
            video_id,
            s3_original_key: format!("videos/{video_id}/original.mp4"),
            s3_hls_folder_key: format!("videos/{video_id}/hls"),
            quality_presets: Vec::new(),
        };

        let storage = Arc::new(MemoryObjectStore::new());
        storage.insert(&descriptor.s3_original_key, vec![7u8; 4096]);

        Self {
            store: Arc::new(MemoryJobStore::new()),
            queue: Arc::new(MemoryWorkQueue::new()),
            storage,
            notifier: Arc::new(RecordingNotifier::default()),
            descriptor,
            settings: PipelineSettings {
                temp_dir: scratch.path().to_path_buf(),
                download_attempts: 3,
                download_retry_delay: Duration::from_millis(5),
                retry_failed_jobs: false,
            },
            _scratch: scratch,
        }
    }

    fn pipeline(&self) -> JobPipeline {
        JobPipeline::new(
            self.descriptor.clone(),
            self.store.clone(),
            self.queue.clone(),
            self.storage.clone(),
            self.notifier.clone(),
            Transcoder::Stub,
            self.settings.clone(),
        )
    }

    async fn job(&self) -> EncodingJob {
        self.store
            .get_job(self.descriptor.job_id)
            .await
            .unwrap()
            .expect("job record exists")
    }

    async fn run(&self) -> (PathBuf, PathBuf) {
        let pipeline = self.pipeline();
        let scratch_input = pipeline.scratch_input().to_path_buf();
        let output_dir = pipeline.output_dir().to_path_buf();
        pipeline.process().await.unwrap();
        (scratch_input, output_dir)
    }
}

#[tokio::test]
async fn stub_mode_run_completes_with_default_tiers() {
    let harness = Harness::new();
    let (scratch_input, output_dir) = harness.run().await;

    let job = harness.job().await;
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_some());
    assert!(job.error_message.is_none());
    assert_eq!(job.input_file_size, 4096);
    assert!(job.output_file_size.unwrap() > 0);
    assert_eq!(job.progress_percentage, 100);

    // Default tier set: one sub-playlist + one segment per tier, plus the
    // master manifest.
    let uploaded = harness.storage.uploaded_keys();
    assert_eq!(uploaded.len(), 7);

    let master_key = format!("{}/master.m3u8", harness.descriptor.s3_hls_folder_key);
    let master = harness.storage.object(&master_key).expect("master uploaded");
    let master = String::from_utf8(master.body.to_vec()).unwrap();
    assert_eq!(master.matches("#EXT-X-STREAM-INF").count(), 3);
    assert!(master.contains("BANDWIDTH=2500000,RESOLUTION=1280x720"));
    assert!(master.contains("BANDWIDTH=1000000,RESOLUTION=854x480"));
    assert!(master.contains("BANDWIDTH=500000,RESOLUTION=640x360"));

    // Degraded mode is logged distinctly.
    let logs = harness.store.logs(harness.descriptor.job_id).await.unwrap();
    assert!(
        logs.iter()
            .any(|entry| entry.level == LogLevel::Warning
                && entry.message.contains("stub pipeline"))
    );

    let calls = harness.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, NotifyStatus::Ready);
    assert_eq!(calls[0].0, harness.descriptor.video_id);

    assert_eq!(harness.queue.completed().len(), 1);
    assert!(harness.queue.failed().is_empty());

    // Source removed, scratch cleaned up.
    assert_eq!(
        harness.storage.deleted_keys(),
        vec![harness.descriptor.s3_original_key.clone()]
    );
    assert!(!scratch_input.exists());
    assert!(!output_dir.exists());
}

#[tokio::test]
async fn requested_tiers_are_honored_and_unknown_names_dropped() {
    let mut harness = Harness::new();
    harness.descriptor.quality_presets =
        vec!["720p".into(), "999p".into(), "360p".into()];
    harness.run().await;

    let master_key = format!("{}/master.m3u8", harness.descriptor.s3_hls_folder_key);
    let master = harness.storage.object(&master_key).unwrap();
    let master = String::from_utf8(master.body.to_vec()).unwrap();

    assert_eq!(master.matches("#EXT-X-STREAM-INF").count(), 2);
    assert!(master.contains("720p/playlist.m3u8"));
    assert!(master.contains("360p/playlist.m3u8"));
    assert!(!master.contains("480p"));
}

#[tokio::test]
async fn download_exhaustion_fails_the_job_before_transcode() {
    let harness = Harness::new();
    harness.storage.fail_next_gets(u32::MAX);

    let (scratch_input, output_dir) = harness.run().await;

    let job = harness.job().await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.started_at.is_some());
    assert!(job.completed_at.is_none());
    let error = job.error_message.expect("error message set");
    assert!(error.contains("Download failed"), "got: {error}");

    // Upload never ran, and the unfetched source was not deleted.
    assert!(harness.storage.uploaded_keys().is_empty());
    assert!(harness.storage.deleted_keys().is_empty());

    let calls = harness.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, NotifyStatus::Failed);
    assert!(calls[0].2.as_ref().unwrap().contains("Download failed"));

    let failed = harness.queue.failed();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].job_id, harness.descriptor.job_id);

    assert!(!scratch_input.exists());
    assert!(!output_dir.exists());
}

#[tokio::test]
async fn mid_upload_failure_still_deletes_source_and_cleans_up() {
    let harness = Harness::new();
    harness.storage.fail_puts_from(2);

    let (scratch_input, output_dir) = harness.run().await;

    let job = harness.job().await;
    assert_eq!(job.status, JobStatus::Failed);
    let error = job.error_message.expect("error message set");
    assert!(error.contains("Upload failed"), "got: {error}");

    // Exactly one file made it out before the abort.
    assert_eq!(harness.storage.uploaded_keys().len(), 1);

    // Best-effort epilogue still ran: source deleted, failure notified,
    // scratch cleaned up.
    assert_eq!(
        harness.storage.deleted_keys(),
        vec![harness.descriptor.s3_original_key.clone()]
    );
    let calls = harness.notifier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, NotifyStatus::Failed);

    assert_eq!(harness.queue.failed().len(), 1);
    assert!(harness.queue.completed().is_empty());

    assert!(!scratch_input.exists());
    assert!(!output_dir.exists());
}

#[tokio::test]
async fn upsert_transitions_a_previously_submitted_job() {
    let harness = Harness::new();

    // Record created at submission time, before the descriptor is dequeued.
    let job = EncodingJob::new(
        harness.descriptor.job_id,
        harness.descriptor.video_id,
        &harness.descriptor.s3_original_key,
        &harness.descriptor.s3_hls_folder_key,
    );
    harness.store.create_job(&job).await.unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    let submitted_at = job.created_at;

    harness.run().await;

    let job = harness.job().await;
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.started_at.is_some());
    assert_eq!(job.created_at, submitted_at);
}

#[tokio::test]
async fn failed_jobs_are_not_requeued_by_default() {
    let harness = Harness::new();
    harness.storage.fail_next_gets(u32::MAX);
    harness.run().await;

    let job = harness.job().await;
    assert_eq!(job.retry_count, 0);
    assert_eq!(harness.queue.stats().await.unwrap().pending, 0);
}

#[tokio::test]
async fn opt_in_retry_requeues_and_increments_retry_count() {
    let mut harness = Harness::new();
    harness.settings.retry_failed_jobs = true;
    harness.storage.fail_next_gets(u32::MAX);
    harness.run().await;

    let job = harness.job().await;
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.retry_count, 1);

    let requeued = harness.queue.dequeue().await.unwrap().expect("requeued");
    assert_eq!(requeued, harness.descriptor);
}

#[tokio::test]
async fn opt_in_retry_stops_at_max_retries() {
    let mut harness = Harness::new();
    harness.settings.retry_failed_jobs = true;
    harness.storage.fail_next_gets(u32::MAX);

    let mut job = EncodingJob::new(
        harness.descriptor.job_id,
        harness.descriptor.video_id,
        &harness.descriptor.s3_original_key,
        &harness.descriptor.s3_hls_folder_key,
    );
    job.retry_count = job.max_retries - 1;
    harness.store.create_job(&job).await.unwrap();

    harness.run().await;

    let job = harness.job().await;
    assert_eq!(job.retry_count, job.max_retries);
    assert_eq!(harness.queue.stats().await.unwrap().pending, 0);
}
