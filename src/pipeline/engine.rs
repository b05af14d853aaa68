//! Pipeline Engine - one scoreboard run from watchlist to export
//!
//! ```text
//! WatchlistSource::latest_venue_ids()
//!     ↓
//! ObservationStore::fetch_observations()
//!     ↓
//! group_by_event → normalize_series → compute_momentum (per event)
//!     ↓
//! reduce_scoreboard (latest record per event)
//!     ↓
//! fetch_in_batches(EventMetadataSource::fetch_events)
//!     ↓
//! merge_and_flatten
//!     ↓
//! ExportSink::export (once, only after every stage succeeded)
//! ```
//!
//! Every collaborator is passed in through `PipelineContext`; the engine
//! holds no state between runs.

use super::batch::fetch_in_batches;
use super::merge::merge_and_flatten;
use super::momentum::{compute_momentum, NanPolicy};
use super::normalizer::{group_by_event, normalize_series};
use super::scoreboard::reduce_scoreboard;
use super::types::{Observation, ScoreboardRow};
use crate::config::ScoreboardConfig;
use crate::error::PipelineError;
use crate::export::{build_sink, ExportSink};
use crate::seatgeek::SeatGeekClient;
use crate::sources::{EventMetadataSource, ObservationQuery, ObservationStore, WatchlistSource};
use crate::store::SqliteStore;
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Collaborators for one run
pub struct PipelineContext<'a> {
    pub config: &'a ScoreboardConfig,
    pub watchlist: &'a dyn WatchlistSource,
    pub observations: &'a dyn ObservationStore,
    pub metadata: &'a dyn EventMetadataSource,
    pub sink: &'a dyn ExportSink,
}

/// What a finished run did
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub venues: usize,
    pub observations: usize,
    pub events_scored: usize,
    pub metadata_records: usize,
    pub rows_exported: usize,
    /// None when there was nothing to export
    pub destination: Option<String>,
}

/// Export destination name for a run on `date`
pub fn destination_name(date: NaiveDate) -> String {
    format!("SEATGEEK_EVENT_METRICS_{}.csv", date.format("%Y_%m_%d"))
}

/// `now - days`, or a Config error when that instant is not representable
pub fn lookback_start(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>, PipelineError> {
    Duration::try_days(days)
        .and_then(|d| now.checked_sub_signed(d))
        .ok_or_else(|| PipelineError::Config(format!("LOOKBACK_DAYS out of range: {}", days)))
}

/// Observations → one scored row per event
///
/// Groups by event, normalizes each series independently and keeps the
/// latest momentum record per event. Any shape error aborts the whole
/// computation.
pub fn compute_scoreboard(
    observations: Vec<Observation>,
    from_date: Option<DateTime<Utc>>,
    price_field: &str,
    policy: NanPolicy,
) -> Result<Vec<ScoreboardRow>, PipelineError> {
    let mut records = Vec::with_capacity(observations.len());

    for (_, series) in group_by_event(observations) {
        let series = normalize_series(series, from_date);
        records.extend(compute_momentum(series, price_field, policy)?);
    }

    Ok(reduce_scoreboard(&records))
}

/// Execute one full run at wall-clock time `now`
pub async fn run_pipeline(
    ctx: &PipelineContext<'_>,
    now: DateTime<Utc>,
) -> Result<RunSummary, PipelineError> {
    let config = ctx.config;
    let read_from = match config.lookback_days {
        Some(days) => Some(lookback_start(now, days)?),
        None => None,
    };

    let venue_ids = ctx
        .watchlist
        .latest_venue_ids(&config.watchlist_username)
        .await?;
    let venues = venue_ids.len();

    let query = ObservationQuery {
        venue_ids,
        events_from: now.date_naive(),
        read_from,
    };

    log::info!("🔍 Querying observations");
    log::info!("   ├─ Venues: {}", venues);
    log::info!("   ├─ Events from: {}", query.events_from);
    match read_from {
        Some(ts) => log::info!("   └─ Read from: {}", ts),
        None => log::info!("   └─ Read from: (all history)"),
    }

    let observations = ctx.observations.fetch_observations(&query).await?;
    let observation_count = observations.len();

    let scoreboard = compute_scoreboard(
        observations,
        read_from,
        &config.price_field,
        config.nan_policy,
    )?;
    log::info!("📊 Scored {} events from {} observations", scoreboard.len(), observation_count);

    let ids: Vec<String> = scoreboard.iter().map(|row| row.event_id.clone()).collect();
    let metadata = fetch_in_batches(&ids, config.batch_size, |batch| async move {
        ctx.metadata.fetch_events(&batch).await
    })
    .await?;
    log::info!("📥 Fetched metadata for {} of {} events", metadata.len(), ids.len());

    let table = merge_and_flatten(&scoreboard, &metadata, &config.score_column());

    let mut summary = RunSummary {
        venues,
        observations: observation_count,
        events_scored: scoreboard.len(),
        metadata_records: metadata.len(),
        rows_exported: 0,
        destination: None,
    };

    if table.is_empty() {
        log::warn!("⚠️  Nothing to export, skipping {} sink", ctx.sink.backend_type());
        return Ok(summary);
    }

    let destination = destination_name(now.date_naive());
    ctx.sink.export(&table, &destination).await?;
    log::info!(
        "✅ Exported {} rows via {} to {}",
        table.len(),
        ctx.sink.backend_type(),
        destination
    );

    summary.rows_exported = table.len();
    summary.destination = Some(destination);
    Ok(summary)
}

/// Build fresh collaborators from `config` and execute one run
///
/// Handles live only for the duration of the run.
pub async fn run_from_config(
    config: &ScoreboardConfig,
    now: DateTime<Utc>,
) -> Result<RunSummary, PipelineError> {
    let store = SqliteStore::open(&config.db_path)?;
    let catalog = SeatGeekClient::from_config(config)?;
    let sink = build_sink(config)?;

    let ctx = PipelineContext {
        config,
        watchlist: &store,
        observations: &store,
        metadata: &catalog,
        sink: sink.as_ref(),
    };

    run_pipeline(&ctx, now).await
}
