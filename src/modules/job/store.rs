use crate::infrastructure::redis::client::RedisService;
use crate::modules::job::model::{EncodingJob, EncodingLogEntry, LogLevel};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Persistence seam for job records and their append-only logs. The worker
/// owns every mutation for a dequeued job; reads by other parties (the API
/// collaborator) go through the same interface.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, job: &EncodingJob) -> Result<()>;
    async fn get_job(&self, id: Uuid) -> Result<Option<EncodingJob>>;
    async fn update_job(&self, job: &EncodingJob) -> Result<()>;
    async fn append_log(&self, job_id: Uuid, level: LogLevel, message: &str) -> Result<()>;
    async fn logs(&self, job_id: Uuid) -> Result<Vec<EncodingLogEntry>>;
}

fn job_key(id: Uuid) -> String {
    format!("encoding:job:{id}")
}

fn logs_key(id: Uuid) -> String {
    format!("encoding:job:{id}:logs")
}

/// Redis-backed job store: one JSON blob per job plus a list of log entries.
#[derive(Clone)]
pub struct RedisJobStore {
    redis: RedisService,
}

impl RedisJobStore {
    pub fn new(redis: RedisService) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn create_job(&self, job: &EncodingJob) -> Result<()> {
        self.update_job(job).await
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<EncodingJob>> {
        let mut conn = self.redis.get_conn().await?;
        let raw: Option<String> = conn.get(job_key(id)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn update_job(&self, job: &EncodingJob) -> Result<()> {
        let mut conn = self.redis.get_conn().await?;
        let json = serde_json::to_string(job)?;
        conn.set::<_, _, ()>(job_key(job.id), json)
            .await
            .map_err(|e| anyhow!("Failed to persist job {}: {}", job.id, e))?;
        Ok(())
    }

    async fn append_log(&self, job_id: Uuid, level: LogLevel, message: &str) -> Result<()> {
        let entry = EncodingLogEntry::new(job_id, level, message);
        let mut conn = self.redis.get_conn().await?;
        conn.rpush::<_, _, ()>(logs_key(job_id), serde_json::to_string(&entry)?)
            .await
            .map_err(|e| anyhow!("Failed to append log for job {job_id}: {e}"))?;
        Ok(())
    }

    async fn logs(&self, job_id: Uuid) -> Result<Vec<EncodingLogEntry>> {
        let mut conn = self.redis.get_conn().await?;
        let raw: Vec<String> = conn.lrange(logs_key(job_id), 0, -1).await?;
        raw.iter()
            .map(|json| serde_json::from_str(json).map_err(Into::into))
            .collect()
    }
}

/// In-memory job store used by tests and single-process setups.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, EncodingJob>>,
    logs: RwLock<HashMap<Uuid, Vec<EncodingLogEntry>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, job: &EncodingJob) -> Result<()> {
        let mut jobs = self.jobs.write().unwrap();
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<EncodingJob>> {
        let jobs = self.jobs.read().unwrap();
        Ok(jobs.get(&id).cloned())
    }

    async fn update_job(&self, job: &EncodingJob) -> Result<()> {
        let mut jobs = self.jobs.write().unwrap();
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn append_log(&self, job_id: Uuid, level: LogLevel, message: &str) -> Result<()> {
        let mut logs = self.logs.write().unwrap();
        logs.entry(job_id)
            .or_default()
            .push(EncodingLogEntry::new(job_id, level, message));
        Ok(())
    }

    async fn logs(&self, job_id: Uuid) -> Result<Vec<EncodingLogEntry>> {
        let logs = self.logs.read().unwrap();
        Ok(logs.get(&job_id).cloned().unwrap_or_default())
    }
}
