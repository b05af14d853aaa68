//! Google Sheets sink
//!
//! Creates a new spreadsheet inside a Drive folder, writes the table (header
//! on row 1, data from row 2), then shares it read-only with the configured
//! addresses. If the write or a share fails the spreadsheet is deleted again,
//! so a failed run leaves no dated file behind.
//!
//! ## API Reference
//!
//! - `POST {drive}/files` - create the spreadsheet
//! - `PUT {sheets}/spreadsheets/{id}/values/A1` - write values
//! - `POST {drive}/files/{id}/permissions` - share
//! - `DELETE {drive}/files/{id}` - cleanup after a failed write/share
//!
//! Authentication is a pre-issued OAuth bearer token; obtaining and
//! refreshing it is handled outside this crate.

use super::ExportSink;
use crate::config::ScoreboardConfig;
use crate::error::PipelineError;
use crate::pipeline::types::ExportTable;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";
const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

pub struct GoogleSheetsSink {
    http: reqwest::Client,
    drive_base_url: String,
    sheets_base_url: String,
    access_token: String,
    folder_id: String,
    share_emails: Vec<String>,
}

impl GoogleSheetsSink {
    pub fn new(
        access_token: String,
        folder_id: String,
        share_emails: Vec<String>,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            drive_base_url: DRIVE_BASE_URL.to_string(),
            sheets_base_url: SHEETS_BASE_URL.to_string(),
            access_token,
            folder_id,
            share_emails,
        })
    }

    pub fn from_config(config: &ScoreboardConfig) -> Result<Self, PipelineError> {
        let access_token = config
            .gdrive_access_token
            .clone()
            .ok_or_else(|| PipelineError::Config("GDRIVE_ACCESS_TOKEN is not set".to_string()))?;
        let folder_id = config
            .gdrive_folder_id
            .clone()
            .ok_or_else(|| PipelineError::Config("GDRIVE_FOLDER_ID is not set".to_string()))?;

        Self::new(
            access_token,
            folder_id,
            config.share_emails.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    /// Point the sink at different Drive / Sheets API roots
    pub fn with_base_urls(mut self, drive: &str, sheets: &str) -> Self {
        self.drive_base_url = drive.trim_end_matches('/').to_string();
        self.sheets_base_url = sheets.trim_end_matches('/').to_string();
        self
    }

    async fn create_spreadsheet(&self, name: &str) -> Result<String, PipelineError> {
        let body = json!({
            "name": name,
            "mimeType": SPREADSHEET_MIME_TYPE,
            "parents": [self.folder_id],
        });

        let response = self
            .http
            .post(format!("{}/files", self.drive_base_url))
            .query(&[("supportsAllDrives", "true")])
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.error(e))?;

        if !response.status().is_success() {
            return Err(self.error(format!("create spreadsheet: HTTP {}", response.status())));
        }

        let created: CreatedFile = response.json().await.map_err(|e| self.error(e))?;
        Ok(created.id)
    }

    async fn share(&self, spreadsheet_id: &str, email: &str) -> Result<(), PipelineError> {
        let response = self
            .http
            .post(format!("{}/files/{}/permissions", self.drive_base_url, spreadsheet_id))
            .bearer_auth(&self.access_token)
            .json(&json!({"type": "user", "role": "reader", "emailAddress": email}))
            .send()
            .await
            .map_err(|e| self.error(e))?;

        if !response.status().is_success() {
            return Err(self.error(format!("share with {}: HTTP {}", email, response.status())));
        }
        Ok(())
    }

    async fn write_values(&self, spreadsheet_id: &str, values: Vec<Vec<Value>>) -> Result<(), PipelineError> {
        let response = self
            .http
            .put(format!(
                "{}/spreadsheets/{}/values/A1",
                self.sheets_base_url, spreadsheet_id
            ))
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&self.access_token)
            .json(&json!({"range": "A1", "majorDimension": "ROWS", "values": values}))
            .send()
            .await
            .map_err(|e| self.error(e))?;

        if !response.status().is_success() {
            return Err(self.error(format!("write values: HTTP {}", response.status())));
        }
        Ok(())
    }

    async fn delete_spreadsheet(&self, spreadsheet_id: &str) -> Result<(), PipelineError> {
        let response = self
            .http
            .delete(format!("{}/files/{}", self.drive_base_url, spreadsheet_id))
            .query(&[("supportsAllDrives", "true")])
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| self.error(e))?;

        if !response.status().is_success() {
            return Err(self.error(format!("delete spreadsheet: HTTP {}", response.status())));
        }
        Ok(())
    }

    /// Values first, then sharing
    async fn fill_and_share(&self, spreadsheet_id: &str, table: &ExportTable) -> Result<(), PipelineError> {
        self.write_values(spreadsheet_id, sheet_values(table)).await?;
        log::info!("📝 Wrote {} rows to spreadsheet {}", table.len(), spreadsheet_id);

        for email in &self.share_emails {
            self.share(spreadsheet_id, email).await?;
            log::debug!("   ├─ Shared with {}", email);
        }
        Ok(())
    }

    fn error(&self, message: impl ToString) -> PipelineError {
        PipelineError::sink(self.backend_type(), message)
    }
}

/// Header row followed by one row per table row
pub fn sheet_values(table: &ExportTable) -> Vec<Vec<Value>> {
    let header: Vec<Value> = table.columns.iter().map(|c| Value::String(c.clone())).collect();

    std::iter::once(header)
        .chain(
            table
                .rows
                .iter()
                .map(|row| row.iter().map(|v| v.to_json()).collect()),
        )
        .collect()
}

#[async_trait]
impl ExportSink for GoogleSheetsSink {
    async fn export(&self, table: &ExportTable, destination: &str) -> Result<(), PipelineError> {
        let spreadsheet_id = self.create_spreadsheet(destination).await?;
        log::info!("📄 Created spreadsheet {} ({})", destination, spreadsheet_id);

        if let Err(e) = self.fill_and_share(&spreadsheet_id, table).await {
            match self.delete_spreadsheet(&spreadsheet_id).await {
                Ok(()) => log::warn!("🗑️  Removed incomplete spreadsheet {}", spreadsheet_id),
                Err(cleanup) => log::error!(
                    "❌ Could not remove incomplete spreadsheet {}: {}",
                    spreadsheet_id,
                    cleanup
                ),
            }
            return Err(e);
        }

        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "sheets"
    }
}
