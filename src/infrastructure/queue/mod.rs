pub mod memory;
pub mod redis_queue;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ephemeral queue payload identifying a job and its encoding parameters.
/// Carries no lease or ownership token: once popped it is the dequeuing
/// worker's sole responsibility.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub job_id: Uuid,
    pub video_id: Uuid,
    pub s3_original_key: String,
    pub s3_hls_folder_key: String,
    #[serde(default)]
    pub quality_presets: Vec<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: u64,
    pub processing: u64,
    pub completed: u64,
    pub failed: u64,
    pub total: u64,
}

/// Durable FIFO of job descriptors plus append-only audit lists.
///
/// There is deliberately no visibility timeout or redelivery: a worker that
/// crashes after `dequeue` leaves its descriptor in the processing list
/// forever. `record_completed` / `record_failed` are audit appends only and
/// remove nothing from the processing list.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn enqueue(&self, descriptor: &QueuedJob) -> Result<()>;

    /// Atomically pop the head of the pending list and append the same
    /// payload to the processing list. Two workers never receive the same
    /// descriptor. Returns `None` when the pending list is empty.
    async fn dequeue(&self) -> Result<Option<QueuedJob>>;

    async fn record_completed(&self, job_id: Uuid, video_id: Uuid) -> Result<()>;
    async fn record_failed(&self, job_id: Uuid, video_id: Uuid, error: &str) -> Result<()>;

    async fn stats(&self) -> Result<QueueStats>;
}
