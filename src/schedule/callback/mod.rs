use async_trait::async_trait;
use tracing::{info, error};

use crate::error::DeliveryError;
use crate::schedule::types::SubtitleResult;

/// Header carrying the shared secret on inbound and outbound calls.
pub const AUTH_HEADER: &str = "auth";

/// Downstream consumer of finished subtitles.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Deliver one result. A failure is final for that result.
    async fn deliver(&self, result: &SubtitleResult) -> Result<(), DeliveryError>;
}

/// HTTP client for the subtitle receiver. Keeps no idle connections, so
/// every delivery opens its own.
pub struct ReceiverClient {
    client: reqwest::Client,
    receive_url: String,
    auth_token: Option<String>,
}

impl ReceiverClient {
    pub fn new(receiver: &str, auth_token: Option<String>) -> Result<Self, reqwest::Error> {
        let base = if receiver.starts_with("http://") || receiver.starts_with("https://") {
            receiver.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", receiver.trim_end_matches('/'))
        };

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self {
            client,
            receive_url: format!("{}/receive", base),
            auth_token,
        })
    }

    pub fn receive_url(&self) -> &str {
        &self.receive_url
    }
}

#[async_trait]
impl ResultSink for ReceiverClient {
    async fn deliver(&self, result: &SubtitleResult) -> Result<(), DeliveryError> {
        info!("Sending subtitles of stream {} to receiver @ {}", result.stream_id, self.receive_url);

        let mut request = self.client.post(&self.receive_url).json(result);
        if let Some(token) = &self.auth_token {
            request = request.header(AUTH_HEADER, token);
        }

        let response = request.send().await.map_err(|e| {
            error!("Receiver unreachable @ {}: {}", self.receive_url, e);
            DeliveryError::Unreachable { url: self.receive_url.clone(), source: e }
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("Receiver rejected stream {} with status {}", result.stream_id, status);
            return Err(DeliveryError::Rejected {
                url: self.receive_url.clone(),
                status: status.as_u16(),
            });
        }

        info!("Subtitles of stream {} delivered", result.stream_id);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Keeps every result; fails deliveries for stream ids listed in `failing`.
    #[derive(Default)]
    pub struct RecordingSink {
        pub delivered: Mutex<Vec<SubtitleResult>>,
        pub failing: Vec<String>,
    }

    impl RecordingSink {
        pub fn failing_for(stream_ids: &[&str]) -> Self {
            Self {
                delivered: Mutex::new(Vec::new()),
                failing: stream_ids.iter().map(|s| s.to_string()).collect(),
            }
        }

        pub fn delivered(&self) -> Vec<SubtitleResult> {
            self.delivered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ResultSink for RecordingSink {
        async fn deliver(&self, result: &SubtitleResult) -> Result<(), DeliveryError> {
            if self.failing.contains(&result.stream_id) {
                return Err(DeliveryError::Rejected { url: "memory://".to_string(), status: 503 });
            }
            self.delivered.lock().unwrap().push(result.clone());
            Ok(())
        }
    }
}
