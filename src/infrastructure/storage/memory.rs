use crate::infrastructure::storage::ObjectStore;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Clone, Debug)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// In-memory object store with failure injection, used to exercise the
/// transfer layer and the pipeline without a live bucket.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    uploaded: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    // Remaining number of get_object calls that fail (u32::MAX = always).
    failing_gets: AtomicU32,
    // 1-based put_object call index to start failing at (0 = never).
    fail_puts_from: AtomicU32,
    put_calls: AtomicU32,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, body: impl Into<Bytes>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body: body.into(),
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    /// Keys written through `put_object`, in call order.
    pub fn uploaded_keys(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn deleted_keys(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Fail the next `n` downloads with a transfer error.
    pub fn fail_next_gets(&self, n: u32) {
        self.failing_gets.store(n, Ordering::SeqCst);
    }

    /// Fail every `put_object` call from the `n`-th one on (1-based).
    pub fn fail_puts_from(&self, n: u32) {
        self.fail_puts_from.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, key: &str) -> Result<Bytes> {
        let remaining = self.failing_gets.load(Ordering::SeqCst);
        if remaining > 0 {
            if remaining != u32::MAX {
                self.failing_gets.store(remaining - 1, Ordering::SeqCst);
            }
            return Err(anyhow!("simulated transfer error for {key}"));
        }

        self.object(key)
            .map(|obj| obj.body)
            .ok_or_else(|| anyhow!("no such object: {key}"))
    }

    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        let call = self.put_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let fail_from = self.fail_puts_from.load(Ordering::SeqCst);
        if fail_from != 0 && call >= fail_from {
            return Err(anyhow!("simulated upload error for {key}"));
        }

        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        self.uploaded.lock().unwrap().push(key.to_string());
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.objects.lock().unwrap().remove(key);
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}
