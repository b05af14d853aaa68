//! Scoreboard Service - HTTP trigger for scheduled runs
//!
//! Every `POST /` executes one full scoreboard run and answers with
//! "Service executed with no errors" or HTTP 500.
//!
//! Usage:
//!   cargo run --release --bin scoreboard_service
//!
//! Environment variables: see `ScoreboardConfig::from_env`

use dotenv::dotenv;
use log::info;
use rusqlite::Connection;
use seatflow::{config::ScoreboardConfig, service, store::run_schema_migrations};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize environment and logging
    dotenv().ok();
    env_logger::init();

    let config = ScoreboardConfig::from_env()?;
    config.validate()?;

    info!("🚀 Seatflow Scoreboard Service");
    info!("   ├─ Database: {}", config.db_path);
    info!("   ├─ Watchlist user: {}", config.watchlist_username);
    info!("   ├─ Price field: {}", config.price_field);
    match config.lookback_days {
        Some(days) => info!("   ├─ Lookback: {} days", days),
        None => info!("   ├─ Lookback: unbounded"),
    }
    info!("   ├─ NaN policy: {}", config.nan_policy.as_str());
    info!("   ├─ Metadata batch size: {}", config.batch_size);
    info!("   └─ Export backend: {}", config.export_backend.as_str());

    // Run schema migrations (idempotent)
    info!("🔧 Initializing database...");
    let mut conn = Connection::open(&config.db_path)?;
    run_schema_migrations(&mut conn, &config.schema_dir)?;
    drop(conn); // Runs open their own connection
    info!("✅ Database initialized");

    service::serve(config).await?;

    Ok(())
}
