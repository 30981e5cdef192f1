pub mod memory;
pub mod s3;
pub mod transfer;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Minimal object-store surface the pipeline needs. Implementations own
/// their bucket and any server-side-encryption policy; callers only deal in
/// keys and bytes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, key: &str) -> Result<Bytes>;
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<()>;
    async fn delete_object(&self, key: &str) -> Result<()>;
}
