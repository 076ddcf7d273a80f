use std::path::Path;
use axum::http::HeaderMap;

use crate::error::ValidationError;
use crate::schedule::callback::AUTH_HEADER;
use crate::utils::http::{check_reachable, is_remote};
use crate::AppContext;

/// Reject the request unless the gateway accepts tasks and the caller
/// presents the configured token.
pub fn admit(ctx: &AppContext, headers: &HeaderMap) -> Result<(), ValidationError> {
    if !ctx.coordinator.is_accepting() {
        return Err(ValidationError::Unavailable("service is shutting down".to_string()));
    }

    if let Some(expected) = &ctx.auth_token {
        let presented = headers.get(AUTH_HEADER).and_then(|v| v.to_str().ok());
        if presented != Some(expected.as_str()) {
            return Err(ValidationError::Unauthenticated("missing or invalid auth token".to_string()));
        }
    }
    Ok(())
}

/// A source is either a reachable http(s) URL or an existing file.
pub async fn source(client: &reqwest::Client, source: &str) -> Result<(), ValidationError> {
    if source.trim().is_empty() {
        return Err(ValidationError::invalid_argument("source must not be empty"));
    }

    if is_remote(source) {
        return check_reachable(client, source).await;
    }

    match tokio::fs::metadata(source).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(ValidationError::not_found(format!("can't find source file: {}", source))),
    }
}

pub async fn destination(destination: &Path) -> Result<(), ValidationError> {
    match tokio::fs::metadata(destination).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ValidationError::invalid_argument(format!(
            "destination is not a directory: {}",
            destination.display()
        ))),
        Err(_) => Err(ValidationError::not_found(format!(
            "can't find destination directory: {}",
            destination.display()
        ))),
    }
}
