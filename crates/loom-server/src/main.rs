//! HTTP server entry point and Axum router setup.
//!
//! Exposes a liveness endpoint plus database and cache health checks on
//! `PORT` (default 8000). Store connections are opened on first use and
//! closed on shutdown.

mod config;
mod dto;
mod error;
mod handlers;
mod stores;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::stores::{AssignmentStore, CacheStore, PgAssignmentStore, RedisCacheStore};

/// Shared server state accessible from all handlers.
pub struct ServerState {
    pub assignments: Arc<dyn AssignmentStore>,
    pub cache: Arc<dyn CacheStore>,
}

impl ServerState {
    /// Builds the Postgres and Redis stores. Nothing connects until first use.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            assignments: Arc::new(PgAssignmentStore::new(&config.database)),
            cache: Arc::new(RedisCacheStore::new(config.redis_url.clone())),
        }
    }

    /// Closes whichever store connections were opened.
    pub async fn close(&self) {
        tokio::join!(self.assignments.close(), self.cache.close());
    }
}

fn router(state: Arc<ServerState>) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                version = ?req.version(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency = %format!("{} ms", latency.as_millis()),
                status = %res.status().as_u16(),
                "finished processing request"
            );
        });

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/db", get(handlers::health::database))
        .route("/health/redis", get(handlers::health::redis))
        .layer(trace_layer)
        .with_state(state)
}

/// Serves until `shutdown` resolves, then closes the stores.
async fn serve(
    listener: TcpListener,
    state: Arc<ServerState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = router(Arc::clone(&state));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Closing store connections");
    state.close().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .compact()
        .init();

    let config = ServerConfig::from_env();
    let state = Arc::new(ServerState::from_config(&config));

    let addr = config.bind_addr();
    let listener = TcpListener::bind(addr).await?;
    info!("Starting server on {}", addr);

    serve(listener, state, shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
