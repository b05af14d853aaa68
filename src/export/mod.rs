//! Export sinks for the finished scoreboard table
//!
//! The export is the only externally visible side effect of a run and
//! happens once, after every other stage succeeded.

pub mod jsonl;
pub mod sheets;

pub use jsonl::JsonlExportSink;
pub use sheets::GoogleSheetsSink;

use crate::config::{ExportBackend, ScoreboardConfig};
use crate::error::PipelineError;
use crate::pipeline::types::ExportTable;
use async_trait::async_trait;

/// Backend trait for writing the export table
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Write all rows of `table` to the destination named `destination`
    async fn export(&self, table: &ExportTable, destination: &str) -> Result<(), PipelineError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}

/// Build the sink selected by the configuration
pub fn build_sink(config: &ScoreboardConfig) -> Result<Box<dyn ExportSink>, PipelineError> {
    match config.export_backend {
        ExportBackend::Jsonl => Ok(Box::new(JsonlExportSink::new(&config.export_dir))),
        ExportBackend::Sheets => Ok(Box::new(GoogleSheetsSink::from_config(config)?)),
    }
}
