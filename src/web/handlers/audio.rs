use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json,
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::error::ValidationError;
use crate::schedule::{ExtractionTask, Task};
use crate::utils::http::HttpResponse;
use crate::web::validate;
use crate::AppContext;

pub fn audio_router() -> Router<Arc<AppContext>> {
    Router::new().route("/extract", post(extract))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ExtractRequest {
    pub source: String,
    pub destination: PathBuf,
    pub stream_id: String,
}

/// Queue an audio extraction into an existing directory. Nothing is delivered.
pub async fn extract(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<HttpResponse<String>>, ValidationError> {
    validate::admit(&ctx, &headers)?;
    validate::source(&ctx.http, &req.source).await?;
    validate::destination(&req.destination).await?;

    info!("Audio extraction requested for stream {}: {} -> {}", req.stream_id, req.source, req.destination.display());
    ctx.queue.put(Task::Extraction(ExtractionTask {
        source: req.source,
        destination: req.destination,
        stream_id: req.stream_id,
    }));

    Ok(super::accepted("Task added successfully"))
}
