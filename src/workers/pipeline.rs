use crate::config::settings::AppConfig;
use crate::infrastructure::queue::{QueuedJob, WorkQueue};
use crate::infrastructure::storage::{ObjectStore, transfer};
use crate::modules::job::model::{EncodingJob, LogLevel};
use crate::modules::job::store::JobStore;
use crate::workers::notifier::{NotifyStatus, StatusNotifier};
use crate::workers::presets::{self, QualityPreset};
use crate::workers::transcode::Transcoder;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Result of a single pipeline stage. The propagation policy lives in one
/// place: `Failure` aborts the remaining fatal stages and routes to the
/// terminal-failure path, `SoftFailure` is logged as a warning and the run
/// continues.
#[derive(Debug)]
pub enum StageOutcome {
    Success,
    SoftFailure(String),
    Failure(String),
}

/// Knobs the pipeline needs from configuration, separated so tests can build
/// a pipeline without a full `AppConfig`.
#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub temp_dir: PathBuf,
    pub download_attempts: u32,
    pub download_retry_delay: Duration,
    pub retry_failed_jobs: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            temp_dir: config.temp_dir.clone(),
            download_attempts: config.download_attempts,
            download_retry_delay: config.download_retry_delay,
            retry_failed_jobs: config.retry_failed_jobs,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from("/tmp/encoding_videos"),
            download_attempts: 3,
            download_retry_delay: Duration::from_secs(2),
            retry_failed_jobs: false,
        }
    }
}

/// Drives one dequeued job through the ordered stages:
/// Download -> Transcode -> Upload -> Delete-source -> Cleanup -> Notify.
/// The job record is updated throughout; Cleanup runs on every exit path.
pub struct JobPipeline {
    descriptor: QueuedJob,
    store: Arc<dyn JobStore>,
    queue: Arc<dyn WorkQueue>,
    storage: Arc<dyn ObjectStore>,
    notifier: Arc<dyn StatusNotifier>,
    transcoder: Transcoder,
    settings: PipelineSettings,
    temp_input: PathBuf,
    output_dir: PathBuf,
}

impl JobPipeline {
    pub fn new(
        descriptor: QueuedJob,
        store: Arc<dyn JobStore>,
        queue: Arc<dyn WorkQueue>,
        storage: Arc<dyn ObjectStore>,
        notifier: Arc<dyn StatusNotifier>,
        transcoder: Transcoder,
        settings: PipelineSettings,
    ) -> Self {
        // Scratch paths are derived from the video id so concurrent jobs for
        // different videos never collide.
        let temp_input = settings
            .temp_dir
            .join(format!("input_{}.mp4", descriptor.video_id));
        let output_dir = settings
            .temp_dir
            .join(format!("output_{}", descriptor.video_id));

        Self {
            descriptor,
            store,
            queue,
            storage,
            notifier,
            transcoder,
            settings,
            temp_input,
            output_dir,
        }
    }

    pub fn scratch_input(&self) -> &Path {
        &self.temp_input
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Execute the full pipeline for this descriptor. The job's terminal
    /// state, audit entries and notification are all handled here; an `Err`
    /// only means the job store itself was unreachable.
    pub async fn process(&self) -> Result<()> {
        self.begin().await?;

        let (result, downloaded) = self.run_stages().await;

        // Best-effort epilogue. The source is only removed once it has been
        // fetched successfully, and cleanup runs no matter what happened.
        if downloaded {
            self.tolerate(self.delete_original().await).await;
        }
        self.cleanup().await;

        match result {
            Ok(output_size) => self.finish_success(output_size).await,
            Err(reason) => self.finish_failure(&reason).await,
        }
    }

    /// Idempotent upsert: a record may already exist from submission, or the
    /// descriptor may be the first time this job is seen.
    async fn begin(&self) -> Result<()> {
        let job = match self.store.get_job(self.descriptor.job_id).await? {
            Some(mut job) => {
                job.mark_processing();
                self.store.update_job(&job).await?;
                job
            }
            None => {
                let mut job = EncodingJob::new(
                    self.descriptor.job_id,
                    self.descriptor.video_id,
                    &self.descriptor.s3_original_key,
                    &self.descriptor.s3_hls_folder_key,
                );
                job.mark_processing();
                self.store.create_job(&job).await?;
                job
            }
        };

        self.log(
            LogLevel::Info,
            &format!("Starting encoding for video {}", job.video_id),
        )
        .await;
        Ok(())
    }

    async fn run_stages(&self) -> (Result<i64, String>, bool) {
        if let Err(e) = self.require(self.download().await).await {
            return (Err(e), false);
        }
        if let Err(e) = self.require(self.transcode().await).await {
            return (Err(e), true);
        }
        if let Err(e) = self.require(self.upload().await).await {
            return (Err(e), true);
        }

        // Output is still on disk here; cleanup has not run yet.
        (Ok(dir_size(&self.output_dir) as i64), true)
    }

    async fn download(&self) -> StageOutcome {
        self.log(
            LogLevel::Info,
            &format!("Downloading video from S3: {}", self.descriptor.s3_original_key),
        )
        .await;

        match transfer::download_with_retries(
            self.storage.as_ref(),
            &self.descriptor.s3_original_key,
            &self.temp_input,
            self.settings.download_attempts,
            self.settings.download_retry_delay,
        )
        .await
        {
            Ok(size) => {
                self.log(
                    LogLevel::Info,
                    &format!("Downloaded {:.2} MB", size as f64 / 1024.0 / 1024.0),
                )
                .await;
                self.record_input_size(size as i64).await;
                self.set_progress(20, None).await;
                StageOutcome::Success
            }
            Err(e) => StageOutcome::Failure(format!("Download failed: {e:#}")),
        }
    }

    async fn transcode(&self) -> StageOutcome {
        let tiers = presets::filter_requested(&self.descriptor.quality_presets);

        if self.transcoder.is_stub() {
            self.log(
                LogLevel::Warning,
                "Encoding engine unavailable - using stub pipeline (degraded mode)",
            )
            .await;
        }

        let names: Vec<&str> = tiers.iter().map(|preset| preset.name).collect();
        self.log(
            LogLevel::Info,
            &format!("Encoding to HLS with presets: {}", names.join(", ")),
        )
        .await;

        for (index, preset) in tiers.iter().enumerate() {
            self.log(LogLevel::Info, &format!("Encoding {}...", preset.name))
                .await;

            let tier_dir = self.output_dir.join(preset.name);
            if let Err(e) = self
                .transcoder
                .encode_tier(&self.temp_input, &tier_dir, preset)
                .await
            {
                return StageOutcome::Failure(format!("Encoding {} failed: {e}", preset.name));
            }

            self.log(
                LogLevel::Info,
                &format!("{} encoding completed", preset.name),
            )
            .await;
            let progress = 20 + (((index + 1) * 50) / tiers.len()) as i32;
            self.set_progress(progress, Some(preset.bitrate)).await;
        }

        if let Err(e) = self.write_master_playlist(&tiers).await {
            return StageOutcome::Failure(format!("Failed to write master playlist: {e}"));
        }

        self.log(LogLevel::Info, "HLS encoding completed").await;
        StageOutcome::Success
    }

    async fn write_master_playlist(&self, tiers: &[&QualityPreset]) -> std::io::Result<()> {
        let playlist = presets::master_playlist(tiers);
        tokio::fs::write(self.output_dir.join("master.m3u8"), playlist).await
    }

    async fn upload(&self) -> StageOutcome {
        self.log(LogLevel::Info, "Uploading HLS files to S3...").await;

        match transfer::upload_tree(
            self.storage.as_ref(),
            &self.output_dir,
            &self.descriptor.s3_hls_folder_key,
        )
        .await
        {
            Ok(keys) => {
                self.log(
                    LogLevel::Info,
                    &format!("Uploaded {} files to S3", keys.len()),
                )
                .await;
                self.set_progress(90, None).await;
                StageOutcome::Success
            }
            Err(e) => StageOutcome::Failure(format!("Upload failed: {e:#}")),
        }
    }

    async fn delete_original(&self) -> StageOutcome {
        match self
            .storage
            .delete_object(&self.descriptor.s3_original_key)
            .await
        {
            Ok(()) => {
                self.log(LogLevel::Info, "Original video deleted from S3")
                    .await;
                StageOutcome::Success
            }
            Err(e) => StageOutcome::SoftFailure(format!("Failed to delete original: {e:#}")),
        }
    }

    /// Remove the scratch input file and the whole output tree. Runs exactly
    /// once per job, on every exit path; failures are warnings only.
    async fn cleanup(&self) {
        if let Err(e) = tokio::fs::remove_file(&self.temp_input).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                self.log(LogLevel::Warning, &format!("Cleanup error: {e}"))
                    .await;
            }
        }
        if let Err(e) = tokio::fs::remove_dir_all(&self.output_dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                self.log(LogLevel::Warning, &format!("Cleanup error: {e}"))
                    .await;
            }
        }
        self.log(LogLevel::Info, "Temporary files cleaned up").await;
    }

    async fn finish_success(&self, output_size: i64) -> Result<()> {
        if let Some(mut job) = self.store.get_job(self.descriptor.job_id).await? {
            job.mark_completed(output_size);
            self.store.update_job(&job).await?;
        }

        self.queue
            .record_completed(self.descriptor.job_id, self.descriptor.video_id)
            .await?;

        self.log(LogLevel::Info, "Encoding pipeline completed successfully")
            .await;
        self.notifier
            .notify(self.descriptor.video_id, NotifyStatus::Ready, None)
            .await;
        Ok(())
    }

    async fn finish_failure(&self, reason: &str) -> Result<()> {
        self.log(LogLevel::Error, &format!("Pipeline failed: {reason}"))
            .await;

        if let Some(mut job) = self.store.get_job(self.descriptor.job_id).await? {
            job.mark_failed(reason);

            // Opt-in automatic retry. Off by default: the failed descriptor
            // is then only visible in the failed audit list.
            if self.settings.retry_failed_jobs {
                job.retry_count += 1;
                if job.is_retryable() {
                    match self.queue.enqueue(&self.descriptor).await {
                        Ok(()) => {
                            self.log(
                                LogLevel::Info,
                                &format!(
                                    "Re-queued for retry ({}/{})",
                                    job.retry_count, job.max_retries
                                ),
                            )
                            .await;
                        }
                        Err(e) => {
                            self.log(
                                LogLevel::Warning,
                                &format!("Failed to re-queue job: {e:#}"),
                            )
                            .await;
                        }
                    }
                }
            }

            self.store.update_job(&job).await?;
        }

        self.queue
            .record_failed(self.descriptor.job_id, self.descriptor.video_id, reason)
            .await?;

        self.notifier
            .notify(self.descriptor.video_id, NotifyStatus::Failed, Some(reason))
            .await;
        Ok(())
    }

    /// Fatal-stage gate: soft failures are logged and tolerated, hard
    /// failures abort.
    async fn require(&self, outcome: StageOutcome) -> Result<(), String> {
        match outcome {
            StageOutcome::Success => Ok(()),
            StageOutcome::SoftFailure(warning) => {
                self.log(LogLevel::Warning, &warning).await;
                Ok(())
            }
            StageOutcome::Failure(reason) => Err(reason),
        }
    }

    /// Best-effort gate: nothing escalates, everything unusual is a warning.
    async fn tolerate(&self, outcome: StageOutcome) {
        match outcome {
            StageOutcome::Success => {}
            StageOutcome::SoftFailure(warning) | StageOutcome::Failure(warning) => {
                self.log(LogLevel::Warning, &warning).await;
            }
        }
    }

    async fn record_input_size(&self, size: i64) {
        if let Ok(Some(mut job)) = self.store.get_job(self.descriptor.job_id).await {
            if job.input_file_size == 0 {
                job.input_file_size = size;
                if let Err(e) = self.store.update_job(&job).await {
                    debug!("Failed to record input size: {e:#}");
                }
            }
        }
    }

    async fn set_progress(&self, percentage: i32, current_bitrate: Option<&str>) {
        match self.store.get_job(self.descriptor.job_id).await {
            Ok(Some(mut job)) => {
                job.set_progress(percentage, current_bitrate);
                if let Err(e) = self.store.update_job(&job).await {
                    debug!("Failed to update progress: {e:#}");
                }
            }
            Ok(None) => {}
            Err(e) => debug!("Failed to load job for progress update: {e:#}"),
        }
    }

    /// Mirror a message into tracing and the job's append-only log. Log
    /// persistence is itself best-effort.
    async fn log(&self, level: LogLevel, message: &str) {
        let job_id = self.descriptor.job_id;
        match level {
            LogLevel::Info => info!(%job_id, "{message}"),
            LogLevel::Warning => warn!(%job_id, "{message}"),
            LogLevel::Error => error!(%job_id, "{message}"),
            LogLevel::Debug => debug!(%job_id, "{message}"),
        }

        if let Err(e) = self.store.append_log(job_id, level, message).await {
            debug!("Failed to persist log entry: {e:#}");
        }
    }
}

fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}
