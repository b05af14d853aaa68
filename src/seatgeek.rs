//! SeatGeek API Integration
//!
//! Looks up event records (title, venue, stats, ...) for the scoreboard.
//!
//! ## API Reference
//!
//! Endpoint: `{base}/events?id=1,2,3&per_page=N&client_id=...`
//! Returns: `{"events": [...], "meta": {...}}`; unknown ids are simply
//! missing from `events`.

use crate::config::ScoreboardConfig;
use crate::error::PipelineError;
use crate::pipeline::types::EventMetadata;
use crate::sources::EventMetadataSource;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

const SOURCE_NAME: &str = "seatgeek";

pub struct SeatGeekClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: Option<String>,
}

impl SeatGeekClient {
    pub fn new(
        base_url: &str,
        client_id: String,
        client_secret: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id,
            client_secret,
        })
    }

    pub fn from_config(config: &ScoreboardConfig) -> Result<Self, PipelineError> {
        Self::new(
            &config.seatgeek_base_url,
            config.seatgeek_client_id.clone(),
            config.seatgeek_client_secret.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    /// Query parameters for one lookup
    ///
    /// `per_page` is set to the batch length so a single page holds every
    /// requested event.
    fn query_params(&self, ids: &[String]) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("id", ids.join(",")),
            ("per_page", ids.len().to_string()),
            ("client_id", self.client_id.clone()),
        ];
        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.clone()));
        }
        params
    }
}

/// Extract event records from an `/events` response body
pub fn parse_events_response(body: Value) -> Result<Vec<EventMetadata>, PipelineError> {
    let events = match body {
        Value::Object(mut map) => map.remove("events"),
        _ => None,
    };

    match events {
        Some(Value::Array(records)) => records.into_iter().map(EventMetadata::from_value).collect(),
        Some(Value::Null) | None => Err(PipelineError::upstream(
            SOURCE_NAME,
            "response has no events array",
        )),
        Some(other) => Err(PipelineError::DataShape(format!(
            "events is not an array: {}",
            other
        ))),
    }
}

#[async_trait]
impl EventMetadataSource for SeatGeekClient {
    async fn fetch_events(&self, ids: &[String]) -> Result<Vec<EventMetadata>, PipelineError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/events", self.base_url);

        let response = self
            .http
            .get(&url)
            .query(&self.query_params(ids))
            .send()
            .await
            .map_err(|e| PipelineError::upstream(SOURCE_NAME, e))?;

        if !response.status().is_success() {
            return Err(PipelineError::upstream(
                SOURCE_NAME,
                format!("API error: {}", response.status()),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| PipelineError::upstream(SOURCE_NAME, e))?;

        let events = parse_events_response(body)?;
        log::debug!("   ├─ {} of {} ids known to catalog", events.len(), ids.len());
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(secret: Option<&str>) -> SeatGeekClient {
        SeatGeekClient::new(
            "https://api.seatgeek.com/2/",
            "client".to_string(),
            secret.map(String::from),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_events_response() {
        let body = json!({
            "events": [
                {"id": 5001, "title": "Show A", "venue": {"name": "Hall"}, "stats": {"listing_count": 3}},
                {"id": "5002", "title": "Show B"}
            ],
            "meta": {"total": 2}
        });

        let events = parse_events_response(body).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "5001");
        assert_eq!(events[0].fields["venue"]["name"], "Hall");
        assert_eq!(events[1].id, "5002");
    }

    #[test]
    fn test_parse_empty_events() {
        let events = parse_events_response(json!({"events": [], "meta": {}})).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_parse_missing_events_is_upstream_error() {
        let result = parse_events_response(json!({"status": "error"}));
        assert!(matches!(result, Err(PipelineError::UpstreamFetch { .. })));
    }

    #[test]
    fn test_parse_record_without_id() {
        let result = parse_events_response(json!({"events": [{"title": "no id"}]}));
        assert!(matches!(result, Err(PipelineError::DataShape(_))));
    }

    #[test]
    fn test_query_params() {
        let ids = vec!["1".to_string(), "2".to_string(), "3".to_string()];

        let params = client(None).query_params(&ids);
        assert_eq!(params[0], ("id", "1,2,3".to_string()));
        assert_eq!(params[1], ("per_page", "3".to_string()));
        assert!(params.iter().all(|(k, _)| *k != "client_secret"));

        let params = client(Some("s3cret")).query_params(&ids);
        assert!(params.contains(&("client_secret", "s3cret".to_string())));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        assert_eq!(client(None).base_url, "https://api.seatgeek.com/2");
    }

    #[tokio::test]
    async fn test_empty_ids_make_no_request() {
        // Unroutable base URL: any request would fail
        let client = SeatGeekClient::new("http://127.0.0.1:9", "x".to_string(), None, Duration::from_secs(1)).unwrap();
        assert!(client.fetch_events(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore] // Run only when testing with live API
    async fn test_fetch_events_live() {
        let client_id = std::env::var("SEATGEEK_CLIENT_ID").unwrap();
        let client = SeatGeekClient::new("https://api.seatgeek.com/2", client_id, None, Duration::from_secs(10)).unwrap();

        let result = client.fetch_events(&["5000000".to_string()]).await;
        assert!(result.is_ok());
    }
}
