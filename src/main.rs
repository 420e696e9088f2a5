mod auth;
mod config;
mod eligibility;
mod entities;
mod http;
mod mint;
mod models;
mod ratelimit;
mod reconciler;
mod registrar;
mod rpc;
mod state;
mod wallet;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{MemoryChallengeStore, NonceAuthenticator};
use crate::config::ApiConfig;
use crate::ratelimit::{MemoryRateLimitStore, RateLimiter};
use crate::reconciler::{CacheReconciler, CacheWriter, REFRESH_QUEUE_CAPACITY};
use crate::rpc::RpcClient;
use crate::state::AppState;
use anyhow::{Context, Result};
use axum::Router;
use migration::MigratorTrait;
use sea_orm::ConnectOptions;
use sea_orm::Database;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = ApiConfig::load().context("Failed to load configuration")?;
    let database = connect_database(&config).await?;
    run_migrations(&database).await?;

    let rpc_client = RpcClient::new(&config.chain.rpc_url, config.chain.request_timeout())
        .context("Failed to initialize RPC client")?;

    let authenticator = Arc::new(NonceAuthenticator::new(
        Arc::new(MemoryChallengeStore::default()),
        config.auth.challenge_ttl(),
    ));
    let rate_limiter = Arc::new(RateLimiter::new(
        Arc::new(MemoryRateLimitStore::new(
            config.rate_limiting.max_keys,
            config.rate_limiting.window(),
        )),
        config.rate_limiting.window(),
    ));

    let (refresh_tx, refresh_rx) = mpsc::channel(REFRESH_QUEUE_CAPACITY);
    let reconciler = CacheReconciler::new(rpc_client.clone(), refresh_tx);
    let cache_writer = CacheWriter::new(database.clone(), refresh_rx);

    let app_state = AppState::new(
        database.clone(),
        rpc_client,
        authenticator,
        rate_limiter,
        reconciler,
        config.rate_limiting.mint_per_window,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let writer_handle = tokio::spawn(cache_writer.run(shutdown_rx));

    let listener = TcpListener::bind(config.server.address())
        .await
        .context("Failed to bind HTTP listener")?;
    let local_addr = listener
        .local_addr()
        .context("Failed to obtain listener address")?;
    info!("ArcMint API listening on {local_addr}");

    let router: Router = http::router(app_state);
    let server = axum::serve(listener, router.into_make_service());
    server
        .with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()))
        .await
        .context("HTTP server exited with error")?;

    shutdown_tx.send(true).ok();
    if let Err(join_err) = writer_handle.await {
        error!("Cache writer task join error: {join_err}");
    }

    Ok(())
}

fn init_tracing() {
    let default_filter = "info";
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    assert!(!filter.is_empty(), "Tracing filter must not be empty");
    assert!(filter.len() < 256, "Tracing filter length exceeds bounds");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .compact()
        .init();
}

async fn connect_database(config: &ApiConfig) -> Result<sea_orm::DatabaseConnection> {
    let mut options = ConnectOptions::new(config.database.url.clone());
    options
        .max_connections(config.database.max_connections)
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug)
        .acquire_timeout(Duration::from_secs(10));

    if let Some(min) = config.database.min_connections {
        options.min_connections(min);
    }

    assert!(
        config.database.max_connections >= config.database.min_connections.unwrap_or(1),
        "Max connections must be >= min connections"
    );
    assert!(
        config.database.max_connections <= 128,
        "Connection pool oversized"
    );

    Database::connect(options)
        .await
        .context("Failed to connect to PostgreSQL")
}

async fn run_migrations(database: &sea_orm::DatabaseConnection) -> Result<()> {
    migration::Migrator::up(database, None)
        .await
        .context("Database migrations failed")
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        return;
    }
    shutdown_tx.send(true).ok();
    info!("Shutdown signal dispatched");
}
