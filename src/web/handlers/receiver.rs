//! Stand-in for the downstream subtitle receiver, used by `mock-receiver`.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, error};

use crate::schedule::SubtitleResult;

#[derive(Debug, Clone, Default)]
pub struct ReceiverOptions {
    /// Overwritten with the subtitles of every received result.
    pub save_to: Option<PathBuf>,
}

pub fn receiver_router(options: ReceiverOptions) -> Router {
    Router::new()
        .route("/receive", post(receive))
        .with_state(Arc::new(options))
}

async fn receive(
    State(options): State<Arc<ReceiverOptions>>,
    Json(result): Json<SubtitleResult>,
) -> StatusCode {
    info!(
        "Received subtitles for stream {} ({}, {} bytes)",
        result.stream_id,
        result.language,
        result.subtitles.len()
    );

    if let Some(path) = &options.save_to {
        if let Err(e) = tokio::fs::write(path, &result.subtitles).await {
            error!("Failed to save subtitles to {}: {}", path.display(), e);
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    }
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::callback::{ReceiverClient, ResultSink};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_receiver_saves_subtitles() {
        let dir = tempfile::tempdir().unwrap();
        let save_to = dir.path().join("test.vtt");

        let app = receiver_router(ReceiverOptions { save_to: Some(save_to.clone()) });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = ReceiverClient::new(&addr.to_string(), None).unwrap();
        client
            .deliver(&SubtitleResult {
                stream_id: "1".to_string(),
                subtitles: "WEBVTT\n\n".to_string(),
                language: "en".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&save_to).unwrap(), "WEBVTT\n\n");
    }
}
