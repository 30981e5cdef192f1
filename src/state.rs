use crate::config::settings::AppConfig;
use crate::infrastructure::queue::WorkQueue;
use crate::infrastructure::storage::ObjectStore;
use crate::modules::job::store::JobStore;
use crate::workers::notifier::StatusNotifier;
use crate::workers::transcode::Transcoder;
use std::sync::Arc;

/// Explicitly constructed client handles, created once at startup and passed
/// into the pipeline. No global state; tests inject doubles here.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn JobStore>,
    pub queue: Arc<dyn WorkQueue>,
    pub storage: Arc<dyn ObjectStore>,
    pub notifier: Arc<dyn StatusNotifier>,
    pub transcoder: Transcoder,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn JobStore>,
        queue: Arc<dyn WorkQueue>,
        storage: Arc<dyn ObjectStore>,
        notifier: Arc<dyn StatusNotifier>,
        transcoder: Transcoder,
    ) -> Self {
        Self {
            config,
            store,
            queue,
            storage,
            notifier,
            transcoder,
        }
    }
}
