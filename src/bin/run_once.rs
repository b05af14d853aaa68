//! Run Once - execute a single scoreboard run and exit
//!
//! Same pipeline as the trigger service, without the HTTP layer.
//!
//! Usage:
//!   cargo run --release --bin run_once

use chrono::Utc;
use dotenv::dotenv;
use log::{error, info};
use seatflow::{config::ScoreboardConfig, pipeline::run_from_config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let config = ScoreboardConfig::from_env()?;
    config.validate()?;

    info!("🚀 Seatflow single run ({})", config.watchlist_username);

    match run_from_config(&config, Utc::now()).await {
        Ok(summary) => {
            info!("✅ Run complete");
            info!("   ├─ Venues: {}", summary.venues);
            info!("   ├─ Observations: {}", summary.observations);
            info!("   ├─ Events scored: {}", summary.events_scored);
            info!("   ├─ Metadata records: {}", summary.metadata_records);
            info!("   ├─ Rows exported: {}", summary.rows_exported);
            info!(
                "   └─ Destination: {}",
                summary.destination.as_deref().unwrap_or("(skipped)")
            );
            Ok(())
        }
        Err(e) => {
            error!("❌ Run failed: {}", e);
            Err(e.into())
        }
    }
}
