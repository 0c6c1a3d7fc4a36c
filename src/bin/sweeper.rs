use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use collaboration::{config::AppConfig, db, state::AppState, ExpirySweeper};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "sweeper",
        database_url = %config.redacted_database_url(),
        pool_size = 1,
        invitation_expiry_days = config.invitation_expiry_days,
        interval_secs = config.expiry_sweep_interval_secs,
        "loaded collaboration configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, 1)?;

    let state = Arc::new(AppState::new(pool, config));
    let sweeper = ExpirySweeper::from_config(state);

    tokio::select! {
        _ = sweeper.run() => {}
        _ = signal::ctrl_c() => {
            tracing::info!("sweeper received shutdown signal");
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
