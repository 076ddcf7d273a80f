use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::shutdown::ShutdownState;
use crate::utils::http::HttpResponse;
use crate::{AppContext, GIT_HASH};

pub mod audio;
pub mod receiver;
pub mod subtitles;

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .nest("/subtitles", subtitles::subtitles_router())
        .nest("/audio", audio::audio_router())
        .route("/health", get(health))
        .with_state(ctx)
}

/// Empty acknowledgment for an accepted task.
pub(crate) fn accepted(message: &str) -> Json<HttpResponse<String>> {
    Json(HttpResponse::new(0, message.to_string(), String::new()))
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub state: ShutdownState,
    pub queued: usize,
    pub version: &'static str,
}

pub async fn health(State(ctx): State<Arc<AppContext>>) -> Json<HttpResponse<Health>> {
    let health = Health {
        state: ctx.coordinator.state(),
        queued: ctx.queue.len(),
        version: GIT_HASH,
    };
    Json(HttpResponse::new(0, "ok".to_string(), health))
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_health() {
        let ctx = testing::context(None);
        let Json(response) = health(State(ctx.clone())).await;
        assert_eq!(response.body.state, ShutdownState::Running);
        assert_eq!(response.body.queued, 0);

        ctx.coordinator.begin();
        let Json(response) = health(State(ctx)).await;
        assert_eq!(response.body.state, ShutdownState::Draining);
    }

    #[tokio::test]
    async fn test_router_serves_generate() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lecture.mp4");
        std::fs::write(&file, b"media").unwrap();

        let ctx = testing::context(None);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(ctx.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let response = reqwest::Client::new()
            .post(format!("http://{}/subtitles/generate", addr))
            .json(&serde_json::json!({
                "source": file.to_string_lossy(),
                "language": "de",
                "stream_id": "42",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: HttpResponse<String> = response.json().await.unwrap();
        assert_eq!(body.code, 0);
        assert_eq!(body.body, "");
        assert_eq!(ctx.queue.len(), 1);

        let response = reqwest::get(format!("http://{}/health", addr)).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["body"]["queued"], 1);
        assert_eq!(body["body"]["state"], "running");
    }

    #[tokio::test]
    async fn test_validation_error_body() {
        let response = crate::error::ValidationError::not_found("can't find source file: /x").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: HttpResponse<String> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.code, 404);
        assert_eq!(body.message, "NOT_FOUND");
        assert_eq!(body.body, "can't find source file: /x");
    }
}
