//! Health Endpoint
//!
//! Catch-all HTTP route for platform liveness checks. Any method on any
//! path gets `200 OK` and a fixed body; no state is consulted.

use axum::{http::StatusCode, Router};
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Body returned for every request
pub const HEALTH_BODY: &str = "Hello from resumebot\n";

/// Health check handler
pub async fn greeting() -> (StatusCode, &'static str) {
    (StatusCode::OK, HEALTH_BODY)
}

/// Create health check router
pub fn health_router() -> Router {
    Router::new()
        .fallback(greeting)
        .layer(TraceLayer::new_for_http())
}

/// Serve the health router on `0.0.0.0:{port}` until `shutdown` resolves
pub async fn serve<F>(port: u16, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Listening on port {}", port);

    axum::serve(listener, health_router())
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Health server shut down gracefully");
    Ok(())
}

/// Resolves on Ctrl-C (or SIGTERM on unix)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
