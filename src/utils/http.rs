use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ValidationError;

#[derive(Debug, Deserialize, Serialize)]
pub struct HttpResponse<T> {
    pub code: u16,
    pub message: String,
    pub body: T,
}

impl<T> HttpResponse<T> {
    pub fn new(code: u16, message: String, body: T) -> Self {
        Self { code, message, body }
    }
}

pub fn is_remote(source: &str) -> bool {
    source.starts_with("https://") || source.starts_with("http://")
}

/// Check that a remote source answers a GET with a success status.
///
/// Only the status line is inspected; the body is never read.
pub async fn check_reachable(client: &reqwest::Client, url: &str) -> Result<(), ValidationError> {
    debug!("checking reachability of {}", url);

    let response = client.get(url).send().await.map_err(|e| {
        info!("source url unavailable: {} ({})", url, e);
        ValidationError::not_found(format!("source url unavailable: {}", url))
    })?;

    if !response.status().is_success() {
        return Err(ValidationError::not_found(format!(
            "source url replies with status {}: {}",
            response.status().as_u16(),
            url
        )));
    }

    Ok(())
}
