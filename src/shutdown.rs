use std::future::Future;
use std::time::Duration;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn, error};

use crate::schedule::{JoinReport, WorkerPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownState {
    Running,
    Draining,
    StoppingWorkers,
    Joining,
    Terminated,
}

/// Drives the service from serving to terminated.
///
/// States only move forward. Draining closes the gateway and waits for
/// in-flight requests, then every worker gets a stop task behind the work
/// already queued, then the workers are joined. Both waits are bounded and
/// shutdown proceeds when they elapse.
pub struct ShutdownCoordinator {
    state: watch::Sender<ShutdownState>,
    drain_timeout: Duration,
    join_timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(drain_timeout: Duration, join_timeout: Duration) -> Self {
        let (state, _) = watch::channel(ShutdownState::Running);
        Self { state, drain_timeout, join_timeout }
    }

    pub fn state(&self) -> ShutdownState {
        *self.state.borrow()
    }

    /// Whether the gateway may still enqueue tasks.
    pub fn is_accepting(&self) -> bool {
        self.state() == ShutdownState::Running
    }

    pub fn subscribe(&self) -> watch::Receiver<ShutdownState> {
        self.state.subscribe()
    }

    /// Resolves once shutdown has begun. Meant for axum's graceful shutdown.
    pub fn draining(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            let _ = rx.wait_for(|state| *state != ShutdownState::Running).await;
        }
    }

    /// Leave `Running`. Returns false if shutdown had already begun.
    pub fn begin(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == ShutdownState::Running {
                *state = ShutdownState::Draining;
                true
            } else {
                false
            }
        })
    }

    fn advance(&self, next: ShutdownState) {
        info!("Shutdown state: {:?}", next);
        self.state.send_replace(next);
    }

    /// Run the whole shutdown sequence. `server` is the gateway task, if it
    /// is still running.
    pub async fn run(&self, server: Option<JoinHandle<anyhow::Result<()>>>, pool: &WorkerPool) -> JoinReport {
        if self.begin() {
            info!("Shutdown state: {:?}", ShutdownState::Draining);
        }

        if let Some(server) = server {
            let abort = server.abort_handle();
            match tokio::time::timeout(self.drain_timeout, server).await {
                Ok(Ok(Ok(()))) => info!("Gateway drained"),
                Ok(Ok(Err(e))) => error!("Gateway stopped with error: {}", e),
                Ok(Err(e)) => error!("Gateway task failed: {}", e),
                Err(_) => {
                    warn!("Gateway did not drain within {:?}, closing it", self.drain_timeout);
                    abort.abort();
                }
            }
        }

        self.advance(ShutdownState::StoppingWorkers);
        info!("Stopping {} workers, {} tasks still queued", pool.size(), pool.queue().len());
        pool.stop();

        self.advance(ShutdownState::Joining);
        let report = pool.join(self.join_timeout).await;

        self.advance(ShutdownState::Terminated);
        report
    }
}

/// Wait for SIGINT, SIGTERM or SIGQUIT.
#[cfg(unix)]
pub async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    let name = tokio::select! {
        _ = interrupt.recv() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
    };
    info!("Received {}, shutting down...", name);
    Ok(())
}

#[cfg(not(unix))]
pub async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl-C, shutting down...");
    Ok(())
}
