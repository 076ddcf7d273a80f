#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use tracing::{info, error};
use std::sync::Arc;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use subtitle_rs::{
    asr, audio::HlsAudioExtractor, config::Settings, schedule::{ReceiverClient, TaskQueue, WorkerContext, WorkerPool},
    shutdown::{self, ShutdownCoordinator}, utils::logger, AppContext, GIT_HASH,
};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env()?;

    // 初始化日志系统
    let _guard = logger::init(settings.log_dir.clone())?;
    info!("Starting subtitle service ({})...", GIT_HASH);

    info!("Loading {:?} transcription backends...", settings.backend);
    let backends = asr::build_backends(&settings).context("failed to load transcription backends")?;

    let sink = ReceiverClient::new(&settings.receiver_address(), settings.auth_token.clone())?;
    info!("Subtitles will be delivered to {}", sink.receive_url());

    let queue = Arc::new(TaskQueue::new());
    let coordinator = Arc::new(ShutdownCoordinator::new(settings.drain_timeout, settings.join_timeout));

    info!("Starting {} workers...", settings.workers);
    let pool = WorkerPool::start(settings.workers, WorkerContext {
        queue: queue.clone(),
        backends: Arc::new(backends),
        extractor: Arc::new(HlsAudioExtractor::new()),
        sink: Arc::new(sink),
    });

    let ctx = Arc::new(AppContext {
        queue,
        coordinator: coordinator.clone(),
        http: reqwest::Client::new(),
        auth_token: settings.auth_token.clone(),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.api_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Starting HTTP server at http://{}", addr);

    let mut server = tokio::spawn(subtitle_rs::web::start_server(ctx, listener, coordinator.draining()));

    // a gateway that dies on its own still shuts the workers down
    let server_stopped = tokio::select! {
        signal = shutdown::wait_for_signal() => {
            signal?;
            false
        }
        served = &mut server => {
            error!("Server stopped unexpectedly: {:?}", served);
            true
        }
    };

    let server = if server_stopped { None } else { Some(server) };
    let report = coordinator.run(server, &pool).await;
    info!("Shutdown complete: {:?}", report);

    Ok(())
}
