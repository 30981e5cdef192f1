use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle of an encoding job. Transitions only move forward:
/// pending -> processing -> completed | failed. The two last states are
/// terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Debug,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// Per-job state record. Mutated exclusively by the worker that dequeued the
/// job's descriptor; writes are unconditional (last-writer-wins), which is
/// safe under the single-owner invariant.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncodingJob {
    pub id: Uuid,
    pub video_id: Uuid,
    pub s3_original_key: String,
    pub s3_hls_folder_key: String,
    pub status: JobStatus,

    pub input_file_size: i64,
    pub output_file_size: Option<i64>,
    pub duration: f64,

    pub progress_percentage: i32,
    pub current_bitrate: Option<String>,

    pub error_message: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,

    pub created_at: OffsetDateTime,
    pub started_at: Option<OffsetDateTime>,
    pub completed_at: Option<OffsetDateTime>,
    pub updated_at: OffsetDateTime,
}

impl EncodingJob {
    pub fn new(
        id: Uuid,
        video_id: Uuid,
        s3_original_key: impl Into<String>,
        s3_hls_folder_key: impl Into<String>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id,
            video_id,
            s3_original_key: s3_original_key.into(),
            s3_hls_folder_key: s3_hls_folder_key.into(),
            status: JobStatus::Pending,
            input_file_size: 0,
            output_file_size: None,
            duration: 0.0,
            progress_percentage: 0,
            current_bitrate: None,
            error_message: None,
            retry_count: 0,
            max_retries: 3,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// pending -> processing. `started_at` is set exactly once, here.
    pub fn mark_processing(&mut self) {
        self.status = JobStatus::Processing;
        if self.started_at.is_none() {
            self.started_at = Some(OffsetDateTime::now_utc());
        }
        self.touch();
    }

    pub fn mark_completed(&mut self, output_file_size: i64) {
        self.status = JobStatus::Completed;
        self.output_file_size = Some(output_file_size);
        self.progress_percentage = 100;
        self.completed_at = Some(OffsetDateTime::now_utc());
        self.touch();
    }

    pub fn mark_failed(&mut self, error_message: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error_message = Some(error_message.into());
        self.touch();
    }

    pub fn set_progress(&mut self, percentage: i32, current_bitrate: Option<&str>) {
        self.progress_percentage = percentage.clamp(0, 100);
        if let Some(bitrate) = current_bitrate {
            self.current_bitrate = Some(bitrate.to_string());
        }
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }
}

/// Immutable audit-trail entry. Belongs to exactly one job, ordered by
/// timestamp, never mutated or removed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncodingLogEntry {
    pub job_id: Uuid,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: OffsetDateTime,
}

impl EncodingLogEntry {
    pub fn new(job_id: Uuid, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            job_id,
            level,
            message: message.into(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> EncodingJob {
        EncodingJob::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "videos/v/original.mp4",
            "videos/v/hls",
        )
    }

    #[test]
    fn new_job_is_pending_with_no_timestamps() {
        let job = job();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.started_at.is_none());
        assert!(job.completed_at.is_none());
        assert!(job.error_message.is_none());
    }

    #[test]
    fn started_at_is_set_once() {
        let mut job = job();
        job.mark_processing();
        let first = job.started_at.expect("started_at set on processing");

        job.mark_processing();
        assert_eq!(job.started_at, Some(first));
    }

    #[test]
    fn completed_sets_completed_at_and_output_size() {
        let mut job = job();
        job.mark_processing();
        job.mark_completed(1024);
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.output_file_size, Some(1024));
        assert!(job.completed_at.is_some());
        assert!(job.error_message.is_none());
        assert!(job.status.is_terminal());
    }

    #[test]
    fn failed_sets_error_message_only() {
        let mut job = job();
        job.mark_processing();
        job.mark_failed("Download failed");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("Download failed"));
        assert!(job.completed_at.is_none());
        assert!(job.status.is_terminal());
    }

    #[test]
    fn updated_at_advances_on_mutation() {
        let mut job = job();
        let created = job.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        job.set_progress(50, Some("2500k"));
        assert!(job.updated_at > created);
        assert_eq!(job.progress_percentage, 50);
        assert_eq!(job.current_bitrate.as_deref(), Some("2500k"));
    }

    #[test]
    fn retryable_until_max_retries() {
        let mut job = job();
        assert!(job.is_retryable());
        job.retry_count = job.max_retries;
        assert!(!job.is_retryable());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&JobStatus::Processing).unwrap(),
            "\"processing\""
        );
        assert_eq!(
            serde_json::to_string(&LogLevel::Warning).unwrap(),
            "\"WARNING\""
        );
    }
}
