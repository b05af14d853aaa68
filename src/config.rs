//! Scoreboard configuration from environment variables
//!
//! Built once at startup, validated, then handed to the pipeline by
//! reference. The pipeline never mutates it.

use crate::error::PipelineError;
use crate::pipeline::batch::DEFAULT_BATCH_SIZE;
use crate::pipeline::momentum::NanPolicy;
use std::env;

/// Upper bound accepted for `LOOKBACK_DAYS` (about a century)
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

/// Where export rows are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportBackend {
    /// One JSON object per row under `export_dir`
    Jsonl,
    /// Google Sheets spreadsheet inside a Drive folder
    Sheets,
}

impl ExportBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonl" => Some(ExportBackend::Jsonl),
            "sheets" | "gsheets" => Some(ExportBackend::Sheets),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportBackend::Jsonl => "jsonl",
            ExportBackend::Sheets => "sheets",
        }
    }
}

/// Configuration for one scoreboard deployment
#[derive(Debug, Clone)]
pub struct ScoreboardConfig {
    /// Path to SQLite database holding watchlist and observations
    pub db_path: String,

    /// Directory with `*.sql` schema files
    pub schema_dir: String,

    /// Watchlist owner whose latest entry selects the tracked venues
    pub watchlist_username: String,

    /// Observation lookback in days (None = no lower bound)
    pub lookback_days: Option<i64>,

    /// Observation column used as the price series
    pub price_field: String,

    /// Event ids per metadata request
    pub batch_size: usize,

    /// Leading-NaN treatment in cumulative sums
    pub nan_policy: NanPolicy,

    pub seatgeek_client_id: String,
    pub seatgeek_client_secret: Option<String>,
    pub seatgeek_base_url: String,

    /// Timeout applied by the HTTP transport (seconds)
    pub http_timeout_secs: u64,

    pub export_backend: ExportBackend,
    pub export_dir: String,
    pub gdrive_folder_id: Option<String>,
    pub gdrive_access_token: Option<String>,
    pub share_emails: Vec<String>,

    /// Listen address for the trigger service
    pub bind_addr: String,
}

impl Default for ScoreboardConfig {
    fn default() -> Self {
        Self {
            db_path: "/var/lib/seatflow/seatflow.db".to_string(),
            schema_dir: "sql".to_string(),
            watchlist_username: String::new(),
            lookback_days: None,
            price_field: "lowest_price".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            nan_policy: NanPolicy::default(),
            seatgeek_client_id: String::new(),
            seatgeek_client_secret: None,
            seatgeek_base_url: "https://api.seatgeek.com/2".to_string(),
            http_timeout_secs: 30,
            export_backend: ExportBackend::Jsonl,
            export_dir: "exports".to_string(),
            gdrive_folder_id: None,
            gdrive_access_token: None,
            share_emails: Vec::new(),
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl ScoreboardConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `SEATFLOW_DB_PATH` (default: /var/lib/seatflow/seatflow.db)
    /// - `SEATFLOW_SCHEMA_DIR` (default: sql)
    /// - `WATCHLIST_USERNAME` (default: empty, rejected by `validate`)
    /// - `LOOKBACK_DAYS` (default: unset = full history, 0 also disables the bound)
    /// - `PRICE_FIELD` (default: lowest_price)
    /// - `METADATA_BATCH_SIZE` (default: 300)
    /// - `NAN_POLICY` (default: skip-leading)
    /// - `SEATGEEK_CLIENT_ID`, `SEATGEEK_API_SECRET`
    /// - `SEATGEEK_BASE_URL` (default: https://api.seatgeek.com/2)
    /// - `HTTP_TIMEOUT_SECS` (default: 30)
    /// - `EXPORT_BACKEND` (default: jsonl)
    /// - `EXPORT_DIR` (default: exports)
    /// - `GDRIVE_FOLDER_ID`, `GDRIVE_ACCESS_TOKEN`
    /// - `GDRIVE_SHARE_EMAILS` (comma-separated)
    /// - `SEATFLOW_BIND_ADDR` (default: 0.0.0.0:8080)
    ///
    /// Unknown `NAN_POLICY` / `EXPORT_BACKEND` values are errors rather
    /// than a silent fallback to the default.
    pub fn from_env() -> Result<Self, PipelineError> {
        let defaults = Self::default();

        let lookback_days = match env::var("LOOKBACK_DAYS").ok().and_then(|s| s.parse::<i64>().ok()) {
            Some(days) if days > 0 => Some(days),
            Some(_) => None,
            None => defaults.lookback_days,
        };

        let nan_policy = match env::var("NAN_POLICY") {
            Ok(s) => NanPolicy::parse(&s)
                .ok_or_else(|| PipelineError::Config(format!("unknown NAN_POLICY: {}", s)))?,
            Err(_) => NanPolicy::default(),
        };

        let export_backend = match env::var("EXPORT_BACKEND") {
            Ok(s) => ExportBackend::parse(&s)
                .ok_or_else(|| PipelineError::Config(format!("unknown EXPORT_BACKEND: {}", s)))?,
            Err(_) => ExportBackend::Jsonl,
        };

        let share_emails = env::var("GDRIVE_SHARE_EMAILS")
            .map(|s| {
                s.split(',')
                    .map(|e| e.trim().to_string())
                    .filter(|e| !e.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            db_path: env::var("SEATFLOW_DB_PATH").unwrap_or(defaults.db_path),

            schema_dir: env::var("SEATFLOW_SCHEMA_DIR").unwrap_or(defaults.schema_dir),

            watchlist_username: env::var("WATCHLIST_USERNAME").unwrap_or(defaults.watchlist_username),

            lookback_days,

            price_field: env::var("PRICE_FIELD").unwrap_or(defaults.price_field),

            batch_size: env::var("METADATA_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.batch_size),

            nan_policy,

            seatgeek_client_id: env::var("SEATGEEK_CLIENT_ID").unwrap_or(defaults.seatgeek_client_id),
            seatgeek_client_secret: env::var("SEATGEEK_API_SECRET").ok().filter(|s| !s.is_empty()),
            seatgeek_base_url: env::var("SEATGEEK_BASE_URL").unwrap_or(defaults.seatgeek_base_url),

            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.http_timeout_secs),

            export_backend,
            export_dir: env::var("EXPORT_DIR").unwrap_or(defaults.export_dir),
            gdrive_folder_id: env::var("GDRIVE_FOLDER_ID").ok().filter(|s| !s.is_empty()),
            gdrive_access_token: env::var("GDRIVE_ACCESS_TOKEN").ok().filter(|s| !s.is_empty()),
            share_emails,

            bind_addr: env::var("SEATFLOW_BIND_ADDR").unwrap_or(defaults.bind_addr),
        })
    }

    /// Reject configurations a run could never succeed with
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.watchlist_username.trim().is_empty() {
            return Err(PipelineError::Config("WATCHLIST_USERNAME must be set".to_string()));
        }
        if let Some(days) = self.lookback_days {
            if days > MAX_LOOKBACK_DAYS {
                return Err(PipelineError::Config(format!(
                    "LOOKBACK_DAYS must be <= {}, got {}",
                    MAX_LOOKBACK_DAYS, days
                )));
            }
        }
        if self.batch_size == 0 {
            return Err(PipelineError::Config("METADATA_BATCH_SIZE must be > 0".to_string()));
        }
        if self.price_field.trim().is_empty() {
            return Err(PipelineError::Config("PRICE_FIELD must not be empty".to_string()));
        }
        if self.seatgeek_client_id.trim().is_empty() {
            return Err(PipelineError::Config("SEATGEEK_CLIENT_ID must be set".to_string()));
        }
        if self.export_backend == ExportBackend::Sheets {
            if self.gdrive_folder_id.is_none() {
                return Err(PipelineError::Config(
                    "GDRIVE_FOLDER_ID is required for the sheets backend".to_string(),
                ));
            }
            if self.gdrive_access_token.is_none() {
                return Err(PipelineError::Config(
                    "GDRIVE_ACCESS_TOKEN is required for the sheets backend".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Name of the exported score column
    pub fn score_column(&self) -> String {
        format!("{}_pct_change", self.price_field)
    }
}
