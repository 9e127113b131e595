//! Laser Tag Server - live scoring backend
//!
//! This is the main entry point. It runs:
//! - The UDP listener that scores tagger hit reports
//! - The broadcast socket that echoes codes back to the hardware
//! - HTTP endpoints for roster entry, match control and the scoreboard

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use laser_tag_server::app::AppState;
use laser_tag_server::config::Config;
use laser_tag_server::http::build_router;
use laser_tag_server::udp::{BroadcastDispatcher, UdpListener};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting Laser Tag Server");
    info!("Server address: {}", config.server_addr);

    // Broadcast socket is shared by the listener and the HTTP handlers
    let dispatcher = BroadcastDispatcher::bind(&config.udp).await?;
    let state = AppState::new(config.clone(), dispatcher);
    match state.roster.ping().await {
        Ok(()) => info!(backend = state.roster.backend(), "Roster store ready"),
        Err(e) => warn!(
            backend = state.roster.backend(),
            error = %e,
            "Roster store unreachable; lookups will fail until it recovers"
        ),
    }

    // Spawn UDP listener
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let listener = UdpListener::bind(&state).await?;
    let listener_task = tokio::spawn(listener.run(shutdown_rx));

    // Build router
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let tcp = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!(
        "UDP receive: {}, broadcast: {}:{}",
        config.udp.receive_addr, config.udp.broadcast_address, config.udp.broadcast_port
    );

    axum::serve(tcp, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the listener once HTTP has drained
    let _ = shutdown_tx.send(true);
    if let Err(e) = listener_task.await {
        warn!(error = %e, "UDP listener task ended abnormally");
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
