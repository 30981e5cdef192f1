use crate::infrastructure::queue::{QueueStats, QueuedJob, WorkQueue};
use crate::infrastructure::redis::client::RedisService;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use redis::{AsyncCommands, Direction};
use serde_json::json;
use uuid::Uuid;

// List names are part of the wire contract with producers; do not rename.
const ENCODING_QUEUE: &str = "video_encoding_queue";
const ENCODING_PROCESSING: &str = "video_encoding_processing";
const ENCODING_COMPLETED: &str = "video_encoding_completed";
const ENCODING_FAILED: &str = "video_encoding_failed";

/// Work queue backed by Redis lists. The pending list is strict FIFO
/// (RPUSH at enqueue, pop from the head at dequeue); the other three lists
/// are append-only audit trails.
#[derive(Clone)]
pub struct RedisWorkQueue {
    redis: RedisService,
}

impl RedisWorkQueue {
    pub fn new(redis: RedisService) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl WorkQueue for RedisWorkQueue {
    async fn enqueue(&self, descriptor: &QueuedJob) -> Result<()> {
        let mut conn = self.redis.get_conn().await?;
        let payload = serde_json::to_string(descriptor)?;
        conn.rpush::<_, _, ()>(ENCODING_QUEUE, payload)
            .await
            .map_err(|e| anyhow!("Failed to enqueue job {}: {}", descriptor.job_id, e))?;
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<QueuedJob>> {
        let mut conn = self.redis.get_conn().await?;
        // LMOVE pops the head and appends it to the processing audit list in
        // one atomic step, so concurrent workers cannot observe the same
        // descriptor.
        let raw: Option<String> = conn
            .lmove(
                ENCODING_QUEUE,
                ENCODING_PROCESSING,
                Direction::Left,
                Direction::Right,
            )
            .await?;

        match raw {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn record_completed(&self, job_id: Uuid, video_id: Uuid) -> Result<()> {
        let mut conn = self.redis.get_conn().await?;
        let entry = json!({ "job_id": job_id, "video_id": video_id }).to_string();
        conn.rpush::<_, _, ()>(ENCODING_COMPLETED, entry).await?;
        Ok(())
    }

    async fn record_failed(&self, job_id: Uuid, video_id: Uuid, error: &str) -> Result<()> {
        let mut conn = self.redis.get_conn().await?;
        let entry = json!({ "job_id": job_id, "video_id": video_id, "error": error }).to_string();
        conn.rpush::<_, _, ()>(ENCODING_FAILED, entry).await?;
        Ok(())
    }

    async fn stats(&self) -> Result<QueueStats> {
        let mut conn = self.redis.get_conn().await?;
        let pending: u64 = conn.llen(ENCODING_QUEUE).await?;
        let processing: u64 = conn.llen(ENCODING_PROCESSING).await?;
        let completed: u64 = conn.llen(ENCODING_COMPLETED).await?;
        let failed: u64 = conn.llen(ENCODING_FAILED).await?;

        Ok(QueueStats {
            pending,
            processing,
            completed,
            failed,
            total: pending + processing + completed + failed,
        })
    }
}
