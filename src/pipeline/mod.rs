//! # Momentum Scoreboard Pipeline
//!
//! Turns raw ticket-price observations for tracked venues into one
//! momentum score per upcoming event, joins catalog metadata and hands a
//! flat table to an export sink.
//!
//! ## Stages
//!
//! 1. `normalizer` - group by event, filter by lookback, order by read time
//! 2. `momentum` - per-step pct change / log return and their running sums
//! 3. `scoreboard` - latest cumulative pct change per event
//! 4. `batch` - catalog lookups in bounded id batches
//! 5. `merge` - inner join + flatten into the export table
//! 6. `engine` - one run end to end
//!
//! Everything except `batch` and `engine` is pure and synchronous.

pub mod batch;
pub mod engine;
pub mod merge;
pub mod momentum;
pub mod normalizer;
pub mod scoreboard;
pub mod types;

pub use engine::{run_from_config, run_pipeline, PipelineContext, RunSummary};
pub use momentum::NanPolicy;
pub use types::{EventMetadata, ExportTable, ExportValue, MomentumRecord, Observation, ScoreboardRow};
