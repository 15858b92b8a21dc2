use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use ticketd::api::{start_server, AppState, Metrics, ServerConfig};
use ticketd::contracts::SystemClock;
use ticketd::counter::TicketCounter;
use ticketd::storage::FileStateStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ticketd=info".parse()?))
        .init();

    tracing::info!("Ticketd starting...");

    let state_file =
        std::env::var("TICKETD_STATE_FILE").unwrap_or_else(|_| "./data/ticket_state.txt".into());
    let store = FileStateStore::open(&state_file)?;
    tracing::info!("Opened ticket state at {}", state_file);

    let counter = Arc::new(TicketCounter::new(store));

    let state = Arc::new(AppState::new(
        counter,
        SystemClock,
        Arc::new(Metrics::new()),
    ));

    let config = ServerConfig {
        host: std::env::var("TICKETD_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        port: std::env::var("TICKETD_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080),
    };

    start_server(config, state, shutdown_signal()).await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
