use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyStatus {
    Ready,
    Failed,
}

impl NotifyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyStatus::Ready => "ready",
            NotifyStatus::Failed => "failed",
        }
    }
}

/// Best-effort terminal-status callback to the origin backend. Transport
/// errors and non-success responses are logged as warnings and swallowed;
/// they never affect the job's recorded status.
#[async_trait]
pub trait StatusNotifier: Send + Sync {
    async fn notify(&self, video_id: Uuid, status: NotifyStatus, error_message: Option<&str>);
}

pub struct HttpNotifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNotifier {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl StatusNotifier for HttpNotifier {
    async fn notify(&self, video_id: Uuid, status: NotifyStatus, error_message: Option<&str>) {
        let endpoint = format!("{}/videos/{}/update-encoding-status/", self.base_url, video_id);

        let mut payload = json!({
            "status": status.as_str(),
            "video_id": video_id,
        });
        if let Some(message) = error_message {
            payload["error_message"] = json!(message);
        }

        match self.client.post(&endpoint).json(&payload).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("Main backend notified: {}", status.as_str());
            }
            Ok(resp) => {
                warn!("Backend notification failed: {}", resp.status());
            }
            Err(e) => {
                warn!("Failed to notify backend: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_status_payload_to_video_endpoint() {
        let server = MockServer::start().await;
        let video_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path(format!("/videos/{video_id}/update-encoding-status/")))
            .and(body_partial_json(json!({ "status": "ready" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = HttpNotifier::new(&server.uri());
        notifier.notify(video_id, NotifyStatus::Ready, None).await;
    }

    #[tokio::test]
    async fn failure_payload_carries_error_message() {
        let server = MockServer::start().await;
        let video_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path(format!("/videos/{video_id}/update-encoding-status/")))
            .and(body_partial_json(json!({
                "status": "failed",
                "error_message": "Upload failed",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = HttpNotifier::new(&server.uri());
        notifier
            .notify(video_id, NotifyStatus::Failed, Some("Upload failed"))
            .await;
    }

    #[tokio::test]
    async fn non_success_response_is_swallowed() {
        let server = MockServer::start().await;
        let video_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        // Must not panic or error; the callback is best-effort.
        let notifier = HttpNotifier::new(&server.uri());
        notifier.notify(video_id, NotifyStatus::Ready, None).await;
    }
}
