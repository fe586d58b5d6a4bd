//! Broadcaster - control API serving campaign runs over the Telegram Bot API.
//!
//! Operators submit a payload, the engine fans it out to every recipient and
//! keeps the failures so they can be retried or cancelled later.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use broadcaster::web::router;
use broadcaster::{
    AppState, BroadcastEngine, Config, FileStateStore, JsonRecipientStore, TelegramTransport,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("broadcaster_starting");

    // Load configuration from environment
    let config = Config::from_env();
    let settings = config.dispatch_settings();
    info!(
        port = config.port,
        concurrency_limit = settings.concurrency_limit,
        batch_size = settings.batch_size,
        batch_pause_ms = config.batch_pause_ms,
        max_attempts = settings.max_attempts,
        state_dir = %config.state_dir.display(),
        recipients_file = %config.recipients_file.display(),
        operator_auth_configured = config.operator_token.is_some(),
        "config_loaded"
    );

    let token = config
        .telegram_bot_token
        .clone()
        .context("TELEGRAM_BOT_TOKEN environment variable not set")?;

    // Shared HTTP client for all sends
    let client = Client::builder()
        .pool_max_idle_per_host(settings.concurrency_limit.max(1))
        .build()
        .context("Failed to create HTTP client")?;

    let transport = TelegramTransport::new(
        client,
        &config.telegram_api_url,
        &token,
        config.request_timeout(),
    );
    let engine = BroadcastEngine::new(
        Arc::new(transport),
        Arc::new(JsonRecipientStore::new(&config.recipients_file)),
        Arc::new(FileStateStore::new(&config.state_dir)),
        settings,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::new(config, engine));

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "control_api_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("broadcaster_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("broadcaster_shutting_down");
}
