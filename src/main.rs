use dotenvy::dotenv;
use std::sync::Arc;
use tracing::info;

use encoding_worker::config::settings::AppConfig;
use encoding_worker::infrastructure::queue::redis_queue::RedisWorkQueue;
use encoding_worker::infrastructure::redis::client::RedisService;
use encoding_worker::infrastructure::storage::s3::S3ObjectStore;
use encoding_worker::modules::job::store::RedisJobStore;
use encoding_worker::state::AppState;
use encoding_worker::workers;
use encoding_worker::workers::notifier::HttpNotifier;
use encoding_worker::workers::transcode::Transcoder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    info!("Starting encoding worker...");

    let config = AppConfig::new()?;
    tokio::fs::create_dir_all(&config.temp_dir).await?;

    let redis = RedisService::new(&config.redis_url).await?;
    let queue = Arc::new(RedisWorkQueue::new(redis.clone()));
    let store = Arc::new(RedisJobStore::new(redis));
    let storage = Arc::new(S3ObjectStore::new(&config));
    let notifier = Arc::new(HttpNotifier::new(&config.main_backend_url));
    let transcoder = Transcoder::resolve(config.ffmpeg_path.as_deref()).await;

    let state = AppState::new(config, store, queue, storage, notifier, transcoder);

    tokio::select! {
        _ = workers::run_worker(state) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("✓ Worker stopped");
        }
    }

    Ok(())
}
