use crate::infrastructure::queue::{QueueStats, QueuedJob, WorkQueue};
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
pub struct CompletionRecord {
    pub job_id: Uuid,
    pub video_id: Uuid,
}

#[derive(Clone, Debug, Serialize)]
pub struct FailureRecord {
    pub job_id: Uuid,
    pub video_id: Uuid,
    pub error: String,
}

#[derive(Default)]
struct Lists {
    pending: VecDeque<QueuedJob>,
    processing: Vec<QueuedJob>,
    completed: Vec<CompletionRecord>,
    failed: Vec<FailureRecord>,
}

/// In-process work queue with the same pop/audit semantics as the Redis
/// implementation. Used by tests and single-process setups.
#[derive(Default)]
pub struct MemoryWorkQueue {
    lists: Mutex<Lists>,
}

impl MemoryWorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processing(&self) -> Vec<QueuedJob> {
        self.lists.lock().unwrap().processing.clone()
    }

    pub fn completed(&self) -> Vec<CompletionRecord> {
        self.lists.lock().unwrap().completed.clone()
    }

    pub fn failed(&self) -> Vec<FailureRecord> {
        self.lists.lock().unwrap().failed.clone()
    }
}

#[async_trait]
impl WorkQueue for MemoryWorkQueue {
    async fn enqueue(&self, descriptor: &QueuedJob) -> Result<()> {
        self.lists
            .lock()
            .unwrap()
            .pending
            .push_back(descriptor.clone());
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<QueuedJob>> {
        let mut lists = self.lists.lock().unwrap();
        match lists.pending.pop_front() {
            Some(descriptor) => {
                lists.processing.push(descriptor.clone());
                Ok(Some(descriptor))
            }
            None => Ok(None),
        }
    }

    async fn record_completed(&self, job_id: Uuid, video_id: Uuid) -> Result<()> {
        self.lists
            .lock()
            .unwrap()
            .completed
            .push(CompletionRecord { job_id, video_id });
        Ok(())
    }

    async fn record_failed(&self, job_id: Uuid, video_id: Uuid, error: &str) -> Result<()> {
        self.lists.lock().unwrap().failed.push(FailureRecord {
            job_id,
            video_id,
            error: error.to_string(),
        });
        Ok(())
    }

    async fn stats(&self) -> Result<QueueStats> {
        let lists = self.lists.lock().unwrap();
        let stats = QueueStats {
            pending: lists.pending.len() as u64,
            processing: lists.processing.len() as u64,
            completed: lists.completed.len() as u64,
            failed: lists.failed.len() as u64,
            total: (lists.pending.len()
                + lists.processing.len()
                + lists.completed.len()
                + lists.failed.len()) as u64,
        };
        Ok(stats)
    }
}
