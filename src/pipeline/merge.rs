//! Metadata merge & flatten
//!
//! Joins catalog records to the scoreboard and flattens them into a wide
//! table:
//!
//! 1. inner join on the string event id (scoreboard rows without a catalog
//!    record are dropped; this is the export policy, not an error)
//! 2. `venue` replaced by `venue.name`
//! 3. non-exportable top-level fields removed
//! 4. `stats` expanded into top-level columns, minus the stats denylist
//! 5. every hole in the resulting table filled with 0

use super::types::{EventMetadata, ExportTable, ExportValue, ScoreboardRow};
use serde_json::Value;
use std::collections::HashMap;

/// Top-level catalog fields that never reach the export
pub const DROPPED_FIELDS: [&str; 3] = ["access_method", "performers", "type"];

/// `stats` sub-fields that never reach the export
pub const DROPPED_STATS: [&str; 8] = [
    "visible_listing_count",
    "dq_bucket_counts",
    "average_price",
    "median_price",
    "lowest_sg_base_price_good_deals",
    "lowest_sg_base_price",
    "lowest_price_good_deals",
    "highest_price",
];

/// Prefix for a stats column whose name is already taken at top level
const STATS_COLLISION_PREFIX: &str = "stats_";

/// Merge scoreboard scores into catalog records and flatten to a table
///
/// Row order follows `metadata`; columns appear in first-seen order
/// (catalog fields, then `event_id` and `score_column`, then stats fields).
pub fn merge_and_flatten(
    scoreboard: &[ScoreboardRow],
    metadata: &[EventMetadata],
    score_column: &str,
) -> ExportTable {
    let scores: HashMap<&str, f64> = scoreboard
        .iter()
        .map(|row| (row.event_id.as_str(), row.score))
        .collect();

    let flat_rows: Vec<Vec<(String, ExportValue)>> = metadata
        .iter()
        .filter_map(|event| {
            let score = scores.get(event.id.as_str())?;
            Some(flatten_event(event, *score, score_column))
        })
        .collect();

    let dropped = metadata.len() - flat_rows.len();
    let unmatched = scoreboard.len().saturating_sub(flat_rows.len());
    if dropped > 0 || unmatched > 0 {
        log::info!(
            "   ├─ Inner join: {} catalog records without score, {} scored events without metadata",
            dropped,
            unmatched
        );
    }

    into_table(flat_rows)
}

fn flatten_event(event: &EventMetadata, score: f64, score_column: &str) -> Vec<(String, ExportValue)> {
    let mut cells: Vec<(String, ExportValue)> = Vec::with_capacity(event.fields.len() + 8);

    for (key, value) in &event.fields {
        match key.as_str() {
            "id" | "stats" => continue,
            k if DROPPED_FIELDS.contains(&k) => continue,
            "venue" => {
                let name = value.get("name").unwrap_or(&Value::Null);
                cells.push(("venue".to_string(), ExportValue::from_json(name)));
            }
            _ => cells.push((key.clone(), ExportValue::from_json(value))),
        }
    }

    cells.push(("event_id".to_string(), ExportValue::Text(event.id.clone())));
    cells.push((score_column.to_string(), ExportValue::number(score)));

    if let Some(Value::Object(stats)) = event.fields.get("stats") {
        for (key, value) in stats {
            if DROPPED_STATS.contains(&key.as_str()) {
                continue;
            }
            let column = if cells.iter().any(|(c, _)| c == key) {
                format!("{}{}", STATS_COLLISION_PREFIX, key)
            } else {
                key.clone()
            };
            cells.push((column, ExportValue::from_json(value)));
        }
    }

    cells
}

/// Union the columns of all rows and fill the holes
fn into_table(flat_rows: Vec<Vec<(String, ExportValue)>>) -> ExportTable {
    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for row in &flat_rows {
        for (column, _) in row {
            if !positions.contains_key(column) {
                positions.insert(column.clone(), columns.len());
                columns.push(column.clone());
            }
        }
    }

    let rows = flat_rows
        .into_iter()
        .map(|cells| {
            let mut row = vec![ExportValue::MISSING; columns.len()];
            for (column, value) in cells {
                if let Some(&idx) = positions.get(&column) {
                    row[idx] = value;
                }
            }
            row
        })
        .collect();

    ExportTable { columns, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(id: u64, title: &str, venue: &str) -> EventMetadata {
        EventMetadata::from_value(json!({
            "id": id,
            "title": title,
            "type": "concert",
            "access_method": null,
            "performers": [{"id": 1, "name": "Band"}],
            "venue": {"id": 77, "name": venue, "city": "Austin"},
            "datetime_utc": "2026-11-01T02:00:00",
            "stats": {
                "listing_count": 120,
                "visible_listing_count": 110,
                "dq_bucket_counts": [1, 2, 3],
                "average_price": 150,
                "median_price": 140,
                "lowest_price": 80,
                "highest_price": 900,
                "lowest_sg_base_price": 70,
                "lowest_sg_base_price_good_deals": 75,
                "lowest_price_good_deals": 85
            }
        }))
        .unwrap()
    }

    fn score(id: &str, score: f64) -> ScoreboardRow {
        ScoreboardRow { event_id: id.to_string(), score }
    }

    #[test]
    fn test_flattened_columns() {
        let table = merge_and_flatten(
            &[score("1", 0.2)],
            &[event(1, "Show", "Moody Center")],
            "lowest_price_pct_change",
        );

        assert_eq!(
            table.columns,
            vec![
                "title",
                "venue",
                "datetime_utc",
                "event_id",
                "lowest_price_pct_change",
                "listing_count",
                "lowest_price",
            ]
        );
        assert_eq!(table.value(0, "venue"), Some(&ExportValue::Text("Moody Center".to_string())));
        assert_eq!(table.value(0, "event_id"), Some(&ExportValue::Text("1".to_string())));
        assert_eq!(table.value(0, "lowest_price_pct_change"), Some(&ExportValue::Number(0.2)));
        assert_eq!(table.value(0, "listing_count"), Some(&ExportValue::Number(120.0)));
    }

    #[test]
    fn test_denylisted_fields_removed() {
        let table = merge_and_flatten(&[score("1", 0.1)], &[event(1, "Show", "Arena")], "score");

        for dropped in DROPPED_FIELDS.iter().chain(DROPPED_STATS.iter()) {
            assert!(table.column_index(dropped).is_none(), "{} should be dropped", dropped);
        }
        assert!(table.column_index("id").is_none());
        assert!(table.column_index("stats").is_none());
    }

    #[test]
    fn test_inner_join() {
        let scoreboard = vec![score("1", 0.1), score("2", 0.5), score("3", -0.1)];
        let metadata = vec![event(3, "C", "Arena"), event(1, "A", "Arena"), event(9, "Z", "Arena")];

        let table = merge_and_flatten(&scoreboard, &metadata, "score");

        assert_eq!(table.len(), 2);
        // Catalog order drives row order
        assert_eq!(table.value(0, "event_id"), Some(&ExportValue::Text("3".to_string())));
        assert_eq!(table.value(1, "event_id"), Some(&ExportValue::Text("1".to_string())));
    }

    #[test]
    fn test_missing_values_filled_with_zero() {
        let sparse = EventMetadata::from_value(json!({
            "id": 2,
            "title": null,
            "venue": {"id": 5},
            "stats": {"listing_count": null}
        }))
        .unwrap();

        let table = merge_and_flatten(
            &[score("1", 0.3), score("2", f64::NAN)],
            &[event(1, "Show", "Arena"), sparse],
            "score",
        );

        assert_eq!(table.len(), 2);
        assert_eq!(table.value(1, "title"), Some(&ExportValue::Number(0.0)));
        assert_eq!(table.value(1, "venue"), Some(&ExportValue::Number(0.0)));
        assert_eq!(table.value(1, "score"), Some(&ExportValue::Number(0.0)));
        assert_eq!(table.value(1, "listing_count"), Some(&ExportValue::Number(0.0)));
        // Column absent from the sparse record entirely
        assert_eq!(table.value(1, "datetime_utc"), Some(&ExportValue::Number(0.0)));
        assert!(table.rows.iter().all(|r| r.len() == table.columns.len()));
    }

    #[test]
    fn test_stats_name_collision_prefixed() {
        let record = EventMetadata::from_value(json!({
            "id": 4,
            "listing_count": "top-level",
            "stats": {"listing_count": 12}
        }))
        .unwrap();

        let table = merge_and_flatten(&[score("4", 0.0)], &[record], "score");

        assert_eq!(table.value(0, "listing_count"), Some(&ExportValue::Text("top-level".to_string())));
        assert_eq!(table.value(0, "stats_listing_count"), Some(&ExportValue::Number(12.0)));
    }

    #[test]
    fn test_no_matches_yields_empty_table() {
        let table = merge_and_flatten(&[score("1", 0.1)], &[event(2, "B", "Arena")], "score");
        assert!(table.is_empty());
        assert!(table.columns.is_empty());
    }
}
