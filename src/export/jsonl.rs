//! JSONL sink - one JSON object per export row

use super::ExportSink;
use crate::error::PipelineError;
use crate::pipeline::types::ExportTable;
use async_trait::async_trait;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes `{dir}/{destination}.jsonl`, appending if the file exists
pub struct JsonlExportSink {
    dir: PathBuf,
}

impl JsonlExportSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, destination: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", destination))
    }

    fn write_table(&self, table: &ExportTable, destination: &str) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(destination);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = BufWriter::new(file);

        for row in table.row_objects() {
            let json = serde_json::to_string(&row)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;

        Ok(path)
    }
}

#[async_trait]
impl ExportSink for JsonlExportSink {
    async fn export(&self, table: &ExportTable, destination: &str) -> Result<(), PipelineError> {
        let path = self
            .write_table(table, destination)
            .map_err(|e| PipelineError::sink(self.backend_type(), e))?;

        log::info!("📝 Wrote {} rows to: {}", table.len(), path.display());
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "jsonl"
    }
}
