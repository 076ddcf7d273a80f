use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::ValidationError;
use crate::schedule::{GenerationTask, Task};
use crate::utils::http::HttpResponse;
use crate::web::validate;
use crate::AppContext;

pub fn subtitles_router() -> Router<Arc<AppContext>> {
    Router::new().route("/generate", post(generate))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct GenerateRequest {
    pub source: String,
    #[serde(default)]
    pub language: Option<String>,
    pub stream_id: String,
}

/// Queue a subtitle generation. The result is delivered to the receiver later.
pub async fn generate(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<HttpResponse<String>>, ValidationError> {
    validate::admit(&ctx, &headers)?;
    validate::source(&ctx.http, &req.source).await?;

    info!("Subtitle generation requested for stream {}: {}", req.stream_id, req.source);
    ctx.queue.put(Task::Generation(GenerationTask {
        source: req.source,
        language: req.language.filter(|l| !l.trim().is_empty()),
        stream_id: req.stream_id,
    }));

    Ok(super::accepted("Task added successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::handlers::testing::context;
    use axum::http::{HeaderValue, StatusCode};
    use tokio::net::TcpListener;

    fn request(source: &str, language: Option<&str>) -> Json<GenerateRequest> {
        Json(GenerateRequest {
            source: source.to_string(),
            language: language.map(str::to_string),
            stream_id: "1337".to_string(),
        })
    }

    #[tokio::test]
    async fn test_generate_enqueues_task() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lecture.mp4");
        std::fs::write(&file, b"media").unwrap();
        let source = file.to_string_lossy().into_owned();

        let ctx = context(None);
        generate(State(ctx.clone()), HeaderMap::new(), request(&source, Some(""))).await.unwrap();

        assert_eq!(ctx.queue.len(), 1);
        assert_eq!(
            ctx.queue.take().await,
            Task::Generation(GenerationTask {
                source,
                language: None,
                stream_id: "1337".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_missing_source_not_enqueued() {
        let ctx = context(None);
        let err = generate(State(ctx.clone()), HeaderMap::new(), request("/nonexistent/lecture.mp4", Some("de")))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(ctx.queue.is_empty());
    }

    #[tokio::test]
    async fn test_remote_404_not_enqueued() {
        let app = Router::new().route("/missing.mp4", axum::routing::get(|| async { StatusCode::NOT_FOUND }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let ctx = context(None);
        let err = generate(
            State(ctx.clone()),
            HeaderMap::new(),
            request(&format!("http://{}/missing.mp4", addr), None),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ValidationError::NotFound(_)));
        assert!(ctx.queue.is_empty());
    }

    #[tokio::test]
    async fn test_auth_token_required() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lecture.mp4");
        std::fs::write(&file, b"media").unwrap();
        let source = file.to_string_lossy().into_owned();

        let ctx = context(Some("s3cret"));
        let err = generate(State(ctx.clone()), HeaderMap::new(), request(&source, None)).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert!(ctx.queue.is_empty());

        let mut headers = HeaderMap::new();
        headers.insert("auth", HeaderValue::from_static("s3cret"));
        generate(State(ctx.clone()), headers, request(&source, None)).await.unwrap();
        assert_eq!(ctx.queue.len(), 1);
    }

    #[tokio::test]
    async fn test_refused_while_shutting_down() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("lecture.mp4");
        std::fs::write(&file, b"media").unwrap();

        let ctx = context(None);
        ctx.coordinator.begin();
        let err = generate(State(ctx.clone()), HeaderMap::new(), request(&file.to_string_lossy(), None))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(ctx.queue.is_empty());
    }
}
