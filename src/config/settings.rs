use crate::config::env::{self, EnvKey};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub redis_url: String,
    pub aws_access_key: String,
    pub aws_secret_key: String,
    pub aws_region: String,
    pub s3_bucket: String,
    pub s3_endpoint: Option<String>,
    pub sse_algorithm: String,
    pub kms_key_id: Option<String>,
    pub ffmpeg_path: Option<PathBuf>,
    pub temp_dir: PathBuf,
    pub poll_interval: Duration,
    pub main_backend_url: String,
    pub worker_id: String,
    pub download_attempts: u32,
    pub download_retry_delay: Duration,
    pub retry_failed_jobs: bool,
}

impl AppConfig {
    pub fn new() -> Result<Self, std::env::VarError> {
        Ok(Self {
            redis_url: redis_url_from_env(),
            aws_access_key: env::get(EnvKey::AwsAccessKeyId)?,
            aws_secret_key: env::get(EnvKey::AwsSecretAccessKey)?,
            aws_region: env::get_or(EnvKey::AwsRegion, "us-east-1"),
            s3_bucket: env::get(EnvKey::S3Bucket)?,
            s3_endpoint: env::get_opt(EnvKey::S3Endpoint),
            sse_algorithm: env::get_or(EnvKey::SseAlgorithm, "AES256"),
            kms_key_id: env::get_opt(EnvKey::KmsKeyId),
            ffmpeg_path: env::get_opt(EnvKey::FfmpegPath).map(PathBuf::from),
            temp_dir: PathBuf::from(env::get_or(EnvKey::TempDir, "/tmp/encoding_videos")),
            poll_interval: Duration::from_secs(env::get_parsed(EnvKey::PollInterval, 5)),
            main_backend_url: env::get_or(EnvKey::MainBackendUrl, "http://localhost:8000/api"),
            worker_id: env::get_or(EnvKey::WorkerId, "worker-1"),
            download_attempts: env::get_parsed(EnvKey::DownloadAttempts, 3),
            download_retry_delay: Duration::from_secs(env::get_parsed(EnvKey::DownloadRetryDelay, 2)),
            retry_failed_jobs: env::get_parsed(EnvKey::RetryFailedJobs, false),
        })
    }
}

/// Prefer a full `REDIS_URL`; otherwise assemble one from host/port/password
/// parts so deployments can configure either form.
fn redis_url_from_env() -> String {
    if let Some(url) = env::get_opt(EnvKey::RedisUrl) {
        return url;
    }

    let host = env::get_or(EnvKey::RedisHost, "localhost");
    let port = env::get_parsed(EnvKey::RedisPort, 6379u16);
    let db = env::get_parsed(EnvKey::RedisDb, 1i64);

    match env::get_opt(EnvKey::RedisPassword) {
        Some(password) => format!("redis://:{password}@{host}:{port}/{db}"),
        None => format!("redis://{host}:{port}/{db}"),
    }
}
