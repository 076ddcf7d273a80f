//! Logs every delivered result. Listens on `REC_PORT` and, when `REC_SAVE_TO`
//! is set, writes the latest subtitles to that file.

use anyhow::Result;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;

use subtitle_rs::utils::logger;
use subtitle_rs::web::handlers::receiver::{receiver_router, ReceiverOptions};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let log_dir = dotenv::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
    let _guard = logger::init(log_dir)?;

    let port: u16 = match dotenv::var("REC_PORT") {
        Ok(port) => port.parse()?,
        Err(_) => 50053,
    };
    let options = ReceiverOptions {
        save_to: dotenv::var("REC_SAVE_TO").ok().map(PathBuf::from),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("receiver running @ {}", addr);

    axum::serve(listener, receiver_router(options))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
