//! Collaborator traits consumed by the pipeline
//!
//! The pipeline only sees these narrow contracts. Concrete handles are
//! created per run and passed in explicitly (see `pipeline::engine`).

use crate::error::PipelineError;
use crate::pipeline::types::{EventMetadata, Observation};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// Source of the tracked-venue watchlist
#[async_trait]
pub trait WatchlistSource: Send + Sync {
    /// Venue ids from the most recently stored watchlist entry of `username`
    ///
    /// # Returns
    /// * `Ok(ids)` - Venue ids (possibly empty)
    /// * `Err(UpstreamFetch)` - Store unreachable or no entry for the user
    async fn latest_venue_ids(&self, username: &str) -> Result<Vec<i64>, PipelineError>;
}

/// Parameters for one observation query
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationQuery {
    /// Tracked venues
    pub venue_ids: Vec<i64>,
    /// Only events starting on or after this date
    pub events_from: NaiveDate,
    /// Only observations read at or after this instant (None = all)
    pub read_from: Option<DateTime<Utc>>,
}

/// Store of raw price observations
#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// All observation rows for upcoming events at the queried venues
    async fn fetch_observations(
        &self,
        query: &ObservationQuery,
    ) -> Result<Vec<Observation>, PipelineError>;
}

/// Ticket-catalog event lookup
#[async_trait]
pub trait EventMetadataSource: Send + Sync {
    /// Records for one batch of event ids (string form)
    ///
    /// Ids unknown to the catalog are simply absent from the result.
    async fn fetch_events(&self, ids: &[String]) -> Result<Vec<EventMetadata>, PipelineError>;
}
