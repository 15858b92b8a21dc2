mod handlers;

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::contracts::{Clock, StateStore};

pub use handlers::{AppState, ErrorResponse, IssueTicketResponse, Metrics, PeekResponse};

/// Creates the API router.
pub fn create_router<S: StateStore + 'static, K: Clock + 'static>(
    state: Arc<AppState<S, K>>,
) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats::<S, K>))
        .route("/metrics", get(handlers::metrics::<S, K>))
        .route("/tickets", post(handlers::issue_ticket::<S, K>))
        .route("/tickets/current", get(handlers::current_ticket::<S, K>))
        .with_state(state)
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// Starts the HTTP server.
pub async fn start_server<S, K, F>(
    config: ServerConfig,
    state: Arc<AppState<S, K>>,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: StateStore + 'static,
    K: Clock + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let router = create_router(state);
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
