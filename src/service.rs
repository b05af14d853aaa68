//! HTTP trigger service
//!
//! `POST /` runs the pipeline once with freshly built collaborators and
//! answers with a plain-text status. A failed run answers 500 with the
//! error message; nothing is retried.

use crate::config::ScoreboardConfig;
use crate::pipeline::engine::run_from_config;
use axum::{extract::State, http::StatusCode, routing::post, Router};
use chrono::Utc;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const SUCCESS_MESSAGE: &str = "Service executed with no errors";

/// Shared state for the trigger handler
pub struct ServiceState {
    pub config: ScoreboardConfig,
}

pub fn router(state: Arc<ServiceState>) -> Router {
    Router::new().route("/", post(handle_run)).with_state(state)
}

async fn handle_run(
    State(state): State<Arc<ServiceState>>,
) -> Result<&'static str, (StatusCode, String)> {
    log::info!("📨 Run triggered");

    match run_from_config(&state.config, Utc::now()).await {
        Ok(summary) => {
            log::info!(
                "✅ Run complete: {} events scored, {} rows exported",
                summary.events_scored,
                summary.rows_exported
            );
            Ok(SUCCESS_MESSAGE)
        }
        Err(e) => {
            log::error!("❌ Run failed: {}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Bind `config.bind_addr` and serve until the process exits
pub async fn serve(config: ScoreboardConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(&config.bind_addr).await?;
    log::info!("🌐 Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(Arc::new(ServiceState { config }))).await
}
