//! Pipeline error kinds
//!
//! Every failure is fatal for the run it occurs in. Nothing in the pipeline
//! retries; the caller of the trigger sees the error instead of the success
//! string and no rows reach the sink.

use thiserror::Error;

/// Errors that abort a scoreboard run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Watchlist, observation store or metadata fetch failed.
    #[error("Upstream fetch error ({source_name}): {message}")]
    UpstreamFetch {
        /// Which collaborator failed (e.g. "observation_store", "seatgeek").
        source_name: String,
        message: String,
    },

    /// The export sink was unreachable or rejected the rows.
    #[error("Sink write error ({sink}): {message}")]
    SinkWrite { sink: String, message: String },

    /// A row did not have the shape the pipeline needs.
    #[error("Data shape error: {0}")]
    DataShape(String),

    /// Configuration rejected at startup.
    #[error("Config error: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn upstream(source_name: &str, message: impl ToString) -> Self {
        PipelineError::UpstreamFetch {
            source_name: source_name.to_string(),
            message: message.to_string(),
        }
    }

    pub fn sink(sink: &str, message: impl ToString) -> Self {
        PipelineError::SinkWrite {
            sink: sink.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<rusqlite::Error> for PipelineError {
    fn from(err: rusqlite::Error) -> Self {
        PipelineError::upstream("sqlite", err)
    }
}
