use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use rapido_api::{app, AppState};
use rapido_store::app_config::Config;
use rapido_store::{DbClient, MemoryStore};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "rapido_api=debug,rapido_store=debug,rapido_pricing=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load configuration")?;
    info!("Starting Rapido Seguro API...");

    let state = if config.database.is_memory() {
        warn!("Using the in-memory store; data is lost on shutdown");
        AppState::in_memory(Arc::new(MemoryStore::new()), config.pricing.clone())
    } else {
        let db = DbClient::new(&config.database)
            .await
            .context("Failed to connect to Postgres")?;
        db.ping().await.context("Postgres did not answer")?;
        if config.database.run_migrations {
            db.migrate().await.context("Failed to run migrations")?;
        }
        AppState::postgres(&db, config.pricing.clone())
    };

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down");
}
