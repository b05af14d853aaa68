//! Scoreboard reduction: one latest-momentum score per event

use super::types::{MomentumRecord, ScoreboardRow};
use std::collections::BTreeMap;

/// Collapse momentum records to one row per event
///
/// The score is `pct_change_cumsum` of the record with the latest
/// `utc_read_time`. On equal timestamps the record later in the input wins,
/// matching the stable ordering produced by the normalizer.
///
/// Rows are emitted in ascending event id order so repeated runs over the
/// same input produce identical output. Callers must not rely on any
/// particular order beyond that.
pub fn reduce_scoreboard(records: &[MomentumRecord]) -> Vec<ScoreboardRow> {
    let mut latest: BTreeMap<&str, &MomentumRecord> = BTreeMap::new();

    for record in records {
        latest
            .entry(record.event_id())
            .and_modify(|current| {
                if record.utc_read_time() >= current.utc_read_time() {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    latest
        .into_iter()
        .map(|(event_id, record)| ScoreboardRow {
            event_id: event_id.to_string(),
            score: record.pct_change_cumsum,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::Observation;
    use chrono::{TimeZone, Utc};

    fn record(event: &str, secs: i64, cumsum: f64) -> MomentumRecord {
        MomentumRecord {
            observation: Observation::new(event, Utc.timestamp_opt(secs, 0).unwrap()),
            pct_change: 0.0,
            log_return: 0.0,
            log_return_cumsum: 0.0,
            pct_change_cumsum: cumsum,
        }
    }

    #[test]
    fn test_latest_record_wins() {
        let records = vec![
            record("e1", 100, 0.1),
            record("e1", 300, 0.3),
            record("e1", 200, 0.2),
        ];

        let rows = reduce_scoreboard(&records);

        assert_eq!(rows, vec![ScoreboardRow { event_id: "e1".to_string(), score: 0.3 }]);
    }

    #[test]
    fn test_tie_last_in_sequence_wins() {
        let records = vec![record("e1", 100, 0.1), record("e1", 100, 0.5)];

        let rows = reduce_scoreboard(&records);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].score, 0.5);
    }

    #[test]
    fn test_one_row_per_event() {
        let records = vec![
            record("e2", 100, 0.1),
            record("e1", 100, -0.2),
            record("e2", 200, 0.4),
            record("e3", 50, f64::NAN),
        ];

        let rows = reduce_scoreboard(&records);

        let ids: Vec<&str> = rows.iter().map(|r| r.event_id.as_str()).collect();
        assert_eq!(ids, vec!["e1", "e2", "e3"]);
        assert_eq!(rows[0].score, -0.2);
        assert_eq!(rows[1].score, 0.4);
        // Single-observation event still gets a row
        assert!(rows[2].score.is_nan());
    }

    #[test]
    fn test_empty_input() {
        assert!(reduce_scoreboard(&[]).is_empty());
    }
}
