use std::env;
use std::str::FromStr;

pub enum EnvKey {
    RedisUrl,
    RedisHost,
    RedisPort,
    RedisPassword,
    RedisDb,
    AwsAccessKeyId,
    AwsSecretAccessKey,
    AwsRegion,
    S3Bucket,
    S3Endpoint,
    SseAlgorithm,
    KmsKeyId,
    FfmpegPath,
    TempDir,
    PollInterval,
    MainBackendUrl,
    WorkerId,
    DownloadAttempts,
    DownloadRetryDelay,
    RetryFailedJobs,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::RedisUrl => "REDIS_URL",
            EnvKey::RedisHost => "REDIS_HOST",
            EnvKey::RedisPort => "REDIS_PORT",
            EnvKey::RedisPassword => "REDIS_PASSWORD",
            EnvKey::RedisDb => "REDIS_DB",
            EnvKey::AwsAccessKeyId => "AWS_ACCESS_KEY_ID",
            EnvKey::AwsSecretAccessKey => "AWS_SECRET_ACCESS_KEY",
            EnvKey::AwsRegion => "AWS_S3_REGION_NAME",
            EnvKey::S3Bucket => "AWS_STORAGE_BUCKET_NAME",
            EnvKey::S3Endpoint => "AWS_S3_ENDPOINT",
            EnvKey::SseAlgorithm => "AWS_S3_DEFAULT_SSE",
            EnvKey::KmsKeyId => "AWS_S3_KMS_KEY_ID",
            EnvKey::FfmpegPath => "FFMPEG_PATH",
            EnvKey::TempDir => "TEMP_VIDEOS_DIR",
            EnvKey::PollInterval => "POLL_INTERVAL",
            EnvKey::MainBackendUrl => "MAIN_BACKEND_URL",
            EnvKey::WorkerId => "WORKER_ID",
            EnvKey::DownloadAttempts => "DOWNLOAD_ATTEMPTS",
            EnvKey::DownloadRetryDelay => "DOWNLOAD_RETRY_DELAY",
            EnvKey::RetryFailedJobs => "RETRY_FAILED_JOBS",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_opt(key: EnvKey) -> Option<String> {
    env::var(key.as_str()).ok().filter(|v| !v.is_empty())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
