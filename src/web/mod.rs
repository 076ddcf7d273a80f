use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub mod handlers;
mod validate;

use crate::AppContext;

/// Serve the gateway on `listener` until `shutdown` resolves, then wait for
/// in-flight requests to complete.
pub async fn start_server<F>(ctx: Arc<AppContext>, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = handlers::router(ctx);

    info!("Starting server on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server stopped accepting requests");
    Ok(())
}
