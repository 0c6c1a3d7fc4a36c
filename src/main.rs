use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::{net::TcpListener, signal};
use tower::make::Shared;
use tracing_subscriber::EnvFilter;

use collaboration::{config::AppConfig, db, routes, state::AppState, ExpirySweeper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "server",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        server_host = %config.server_host,
        server_port = config.server_port,
        invitation_expiry_days = config.invitation_expiry_days,
        expiry_sweep_enabled = config.expiry_sweep_enabled,
        "loaded collaboration configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    {
        let mut conn = pool
            .get()
            .context("failed to get database connection for migrations")?;
        db::run_migrations(&mut conn)?;
    }

    let state = AppState::new(pool, config);
    let listen_addr: SocketAddr = {
        let config = state.config.clone();
        format!("{}:{}", config.server_host, config.server_port)
            .parse()
            .context("SERVER_HOST and SERVER_PORT must form a socket address")?
    };

    if state.config.expiry_sweep_enabled {
        let sweeper = ExpirySweeper::from_config(Arc::new(state.clone()));
        tokio::spawn(async move { sweeper.run().await });
    }

    let router = routes::create_router(state);
    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!("listening on {}", listen_addr);

    axum::serve(listener, Shared::new(router))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("server received shutdown signal");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
