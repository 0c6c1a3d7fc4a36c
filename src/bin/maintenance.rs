use std::env;

use anyhow::{Context, Result};

use collaboration::{config::AppConfig, db, sweeper};

const USAGE: &str = "Usage: maintenance expire-invitations [days]";

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).compact().init();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("expire-invitations") => expire_invitations(args.next())?,
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn expire_invitations(days: Option<String>) -> Result<()> {
    let config = AppConfig::from_env()?;
    let window = match days {
        Some(raw) => {
            let days: i64 = raw.parse().context("days must be an integer")?;
            sweeper::expiry_window(days).context("invalid expiry window")?
        }
        None => config.expiry_window(),
    };
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        window_days = window.num_days(),
        "loaded collaboration configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let report = sweeper::run_expiry_sweep(&mut conn, window)
        .context("failed to expire pending invitations")?;

    println!(
        "Expired {} invitations ({} already resolved, {} failed).",
        report.expired.len(),
        report.skipped.len(),
        report.failed.len()
    );
    for failure in &report.failed {
        eprintln!("Failed to expire {}: {}", failure.invitation_id, failure.error);
    }
    Ok(())
}
