use crate::config::settings::AppConfig;
use crate::infrastructure::storage::ObjectStore;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::config::Builder;
use aws_sdk_s3::types::ServerSideEncryption;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region},
};
use bytes::Bytes;
use tracing::info;

/// S3 (or MinIO) object store. Every write carries the configured
/// server-side-encryption header so bucket policies that require SSE are
/// satisfied, plus the KMS key id when the algorithm is `aws:kms`.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    sse_algorithm: ServerSideEncryption,
    kms_key_id: Option<String>,
}

impl S3ObjectStore {
    pub fn new(config: &AppConfig) -> Self {
        let credentials = Credentials::new(
            &config.aws_access_key,
            &config.aws_secret_key,
            None,
            None,
            "static",
        );

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.s3_endpoint {
            // Path-style addressing is required for MinIO
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = Client::from_conf(builder.build());

        info!("✅ S3 client ready (bucket: {})", config.s3_bucket);

        Self {
            client,
            bucket: config.s3_bucket.clone(),
            sse_algorithm: ServerSideEncryption::from(config.sse_algorithm.as_str()),
            kms_key_id: config.kms_key_id.clone(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, key: &str) -> Result<Bytes> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to get s3://{}/{}: {}", self.bucket, key, e))?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| anyhow!("Failed to read body of s3://{}/{}: {}", self.bucket, key, e))?;

        Ok(data.into_bytes())
    }

    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        let mut req = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .server_side_encryption(self.sse_algorithm.clone())
            .body(aws_sdk_s3::primitives::ByteStream::from(body));

        if self.sse_algorithm == ServerSideEncryption::AwsKms {
            if let Some(kms_key_id) = &self.kms_key_id {
                req = req.ssekms_key_id(kms_key_id);
            }
        }

        req.send()
            .await
            .map_err(|e| anyhow!("Failed to put s3://{}/{}: {}", self.bucket, key, e))?;

        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to delete s3://{}/{}: {}", self.bucket, key, e))?;

        Ok(())
    }
}
