pub mod notifier;
pub mod pipeline;
pub mod presets;
pub mod transcode;

use crate::state::AppState;
use crate::workers::pipeline::{JobPipeline, PipelineSettings};
use tracing::{error, info};

/// Main worker loop: poll the queue, run each dequeued job through the full
/// pipeline synchronously, sleep when the queue is empty. Scale-out is
/// purely horizontal; the queue's atomic pop is the only coordination point
/// between worker processes.
pub async fn run_worker(state: AppState) {
    info!("🎥 Video encoding worker '{}' started", state.config.worker_id);

    match state.queue.stats().await {
        Ok(stats) => info!(
            "Queue status: {} pending, {} processing, {} completed, {} failed",
            stats.pending, stats.processing, stats.completed, stats.failed
        ),
        Err(e) => error!("Failed to read queue stats: {e:#}"),
    }

    let settings = PipelineSettings::from_config(&state.config);

    loop {
        match state.queue.dequeue().await {
            Ok(Some(descriptor)) => {
                info!(
                    "📦 Processing job {} for video {}",
                    descriptor.job_id, descriptor.video_id
                );

                let pipeline = JobPipeline::new(
                    descriptor,
                    state.store.clone(),
                    state.queue.clone(),
                    state.storage.clone(),
                    state.notifier.clone(),
                    state.transcoder.clone(),
                    settings.clone(),
                );

                if let Err(e) = pipeline.process().await {
                    error!("Worker error: {e:#}");
                }
            }
            Ok(None) => {
                tokio::time::sleep(state.config.poll_interval).await;
            }
            Err(e) => {
                error!("Failed to poll queue: {e:#}");
                tokio::time::sleep(state.config.poll_interval).await;
            }
        }
    }
}
