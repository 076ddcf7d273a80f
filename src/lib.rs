pub mod asr;
pub mod audio;
pub mod config;
pub mod error;
pub mod schedule;
pub mod shutdown;
pub mod subtitles;
pub mod utils;
pub mod web;

use std::sync::Arc;
use schedule::TaskQueue;
use shutdown::ShutdownCoordinator;

pub const GIT_HASH: &str = env!("GIT_HASH");

/// State shared by every request handler.
pub struct AppContext {
    pub queue: Arc<TaskQueue>,
    pub coordinator: Arc<ShutdownCoordinator>,
    /// Used for source reachability checks.
    pub http: reqwest::Client,
    pub auth_token: Option<String>,
}
