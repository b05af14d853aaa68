//! SQLite-backed watchlist and observation store
//!
//! Tables read (see `/sql/` directory):
//! - `watchlist` - tracked venue ids per user, newest row wins
//! - `performer_event_venue` - event -> venue mapping with start time
//! - `stat` - periodic price observations per event

use crate::error::PipelineError;
use crate::pipeline::types::Observation;
use crate::sources::{ObservationQuery, ObservationStore, WatchlistSource};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Text format of `stat.utc_read_time` and `performer_event_venue.datetime_utc`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Run schema migrations from SQL files
///
/// Reads all .sql files from `schema_dir`, sorted by name (00_, 01_, ...),
/// and executes them. Every file must use "IF NOT EXISTS" clauses so the
/// loader can run on every startup.
pub fn run_schema_migrations(conn: &mut Connection, schema_dir: &str) -> Result<(), PipelineError> {
    let schema_path = Path::new(schema_dir);

    if !schema_path.exists() {
        return Err(PipelineError::Config(format!(
            "Schema directory not found: {}",
            schema_dir
        )));
    }

    conn.pragma_update(None, "journal_mode", "WAL")?;
    log::info!("📊 Enabled WAL mode for SQLite database");

    let mut sql_files: Vec<_> = fs::read_dir(schema_path)
        .map_err(|e| PipelineError::Config(format!("read {}: {}", schema_dir, e)))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("sql"))
        .collect();

    sql_files.sort_by_key(|entry| entry.file_name());

    log::info!("🔧 Running schema migrations from: {}", schema_dir);

    for entry in sql_files {
        let path = entry.path();
        let filename = entry.file_name().to_string_lossy().into_owned();

        log::info!("   ├─ Executing: {}", filename);

        let sql_content = fs::read_to_string(&path)
            .map_err(|e| PipelineError::Config(format!("read {}: {}", filename, e)))?;
        conn.execute_batch(&sql_content)?;
    }

    log::info!("✅ All schema migrations completed successfully");

    Ok(())
}

/// Parse a stored UTC timestamp
///
/// Accepts RFC 3339 and the naive `YYYY-MM-DD HH:MM:SS[.f]` / `T`-separated
/// forms (naive values are UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, PipelineError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(PipelineError::DataShape(format!("unparseable timestamp: {}", raw)))
}

/// SQLite implementation of the watchlist and observation sources
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open an existing database
    ///
    /// Does NOT create the schema; run `run_schema_migrations` first.
    pub fn open(db_path: &str) -> Result<Self, PipelineError> {
        let conn = Connection::open(db_path)?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, PipelineError> {
        self.conn
            .lock()
            .map_err(|_| PipelineError::upstream("sqlite", "connection lock poisoned"))
    }

    /// Store a new watchlist entry for `username`
    pub fn record_watchlist(
        &self,
        username: &str,
        venue_ids: &[i64],
        created_at: i64,
    ) -> Result<(), PipelineError> {
        let venue_json = serde_json::to_string(venue_ids)
            .map_err(|e| PipelineError::DataShape(e.to_string()))?;

        self.conn()?.execute(
            "INSERT INTO watchlist (username, venue_ids, created_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![username, venue_json, created_at],
        )?;
        Ok(())
    }
}

/// Venue ids may be stored as numbers or numeric strings
fn parse_venue_ids(raw: &str) -> Result<Vec<i64>, PipelineError> {
    let values: Vec<Value> = serde_json::from_str(raw)
        .map_err(|e| PipelineError::DataShape(format!("watchlist venue_ids: {}", e)))?;

    values
        .iter()
        .map(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| PipelineError::DataShape(format!("watchlist venue id is not an integer: {}", v))))
        .collect()
}

fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}

/// Turn one `stat` row into an Observation
fn row_to_observation(columns: &[String], values: Vec<Value>) -> Result<Observation, PipelineError> {
    let mut event_id = None;
    let mut read_time = None;
    let mut fields = Map::new();

    for (column, value) in columns.iter().zip(values) {
        match column.as_str() {
            "event_id" => {
                event_id = Some(match value {
                    Value::Number(n) => n.to_string(),
                    Value::String(s) => s,
                    other => {
                        return Err(PipelineError::DataShape(format!(
                            "stat.event_id is not an identifier: {}",
                            other
                        )))
                    }
                })
            }
            "utc_read_time" => {
                let raw = value.as_str().ok_or_else(|| {
                    PipelineError::DataShape(format!("stat.utc_read_time is not text: {}", value))
                })?;
                read_time = Some(parse_timestamp(raw)?);
            }
            _ => {
                fields.insert(column.clone(), value);
            }
        }
    }

    let event_id = event_id.ok_or_else(|| PipelineError::DataShape("stat row without event_id".to_string()))?;
    let utc_read_time =
        read_time.ok_or_else(|| PipelineError::DataShape("stat row without utc_read_time".to_string()))?;

    Ok(Observation {
        event_id,
        utc_read_time,
        fields,
    })
}

#[async_trait]
impl WatchlistSource for SqliteStore {
    async fn latest_venue_ids(&self, username: &str) -> Result<Vec<i64>, PipelineError> {
        let raw: Option<String> = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(
                "SELECT venue_ids FROM watchlist WHERE username = ?1 ORDER BY id DESC LIMIT 1",
            )?;
            let mut rows = stmt.query([username])?;
            let raw = match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            };
            raw
        };

        let raw = raw.ok_or_else(|| {
            PipelineError::upstream("watchlist", format!("no watchlist entry for user {}", username))
        })?;

        parse_venue_ids(&raw)
    }
}

#[async_trait]
impl ObservationStore for SqliteStore {
    async fn fetch_observations(
        &self,
        query: &ObservationQuery,
    ) -> Result<Vec<Observation>, PipelineError> {
        let venue_json = serde_json::to_string(&query.venue_ids)
            .map_err(|e| PipelineError::DataShape(e.to_string()))?;
        let events_from = query.events_from.format("%Y-%m-%d").to_string();
        let read_from = query
            .read_from
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string());

        let (columns, raw_rows) = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(
                r#"
                SELECT * FROM stat
                WHERE stat.event_id IN (
                    SELECT pev.event_id FROM performer_event_venue pev
                    WHERE pev.datetime_utc >= ?1
                      AND pev.venue_id IN (SELECT value FROM json_each(?2))
                )
                AND (?3 IS NULL OR stat.utc_read_time >= ?3)
                ORDER BY stat.utc_read_time ASC
                "#,
            )?;

            let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            let column_count = columns.len();

            let raw_rows = stmt
                .query_map(rusqlite::params![events_from, venue_json, read_from], |row| {
                    (0..column_count)
                        .map(|i| row.get_ref(i).map(sql_to_json))
                        .collect::<rusqlite::Result<Vec<Value>>>()
                })?
                .collect::<rusqlite::Result<Vec<Vec<Value>>>>()?;

            (columns, raw_rows)
        };

        let observations = raw_rows
            .into_iter()
            .map(|values| row_to_observation(&columns, values))
            .collect::<Result<Vec<Observation>, PipelineError>>()?;

        log::info!(
            "📥 Loaded {} observations for {} tracked venues",
            observations.len(),
            query.venue_ids.len()
        );

        Ok(observations)
    }
}
