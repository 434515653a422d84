//! HTTP surface: `POST /extract` and `GET /health`.
//!
//! The server is a thin shell around [`TimetableExtractor`]. Handlers read
//! the multipart upload, call [`TimetableExtractor::extract`] and map the
//! outcome onto the JSON envelopes in [`response`].

mod handlers;
pub mod response;
mod routes;

use crate::config::ServerConfig;
use crate::extract::TimetableExtractor;
use std::sync::Arc;
use tracing::info;

pub use routes::create_router;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub extractor: Arc<TimetableExtractor>,
}

impl AppState {
    pub fn new(extractor: TimetableExtractor) -> Self {
        Self {
            extractor: Arc::new(extractor),
        }
    }
}

/// Bind and serve until Ctrl-C.
pub async fn serve(extractor: TimetableExtractor, server: ServerConfig) -> std::io::Result<()> {
    let addr = server.socket_addr();
    let app = create_router(AppState::new(extractor));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Timetable extraction service listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
