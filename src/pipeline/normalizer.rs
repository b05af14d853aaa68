//! Series normalization: per-event grouping, lookback cutoff and time ordering

use super::types::Observation;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Split observations into per-event series
///
/// Events come out in order of first appearance; each series keeps the
/// input order of its observations.
pub fn group_by_event(observations: Vec<Observation>) -> Vec<(String, Vec<Observation>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<Observation>)> = Vec::new();

    for obs in observations {
        match index.get(&obs.event_id) {
            Some(&i) => groups[i].1.push(obs),
            None => {
                index.insert(obs.event_id.clone(), groups.len());
                groups.push((obs.event_id.clone(), vec![obs]));
            }
        }
    }

    groups
}

/// Order one event's observations by read time
///
/// Drops observations older than `from_date` when given. The sort is stable:
/// equal timestamps keep their input order so every row has exactly one
/// predecessor downstream.
pub fn normalize_series(
    mut series: Vec<Observation>,
    from_date: Option<DateTime<Utc>>,
) -> Vec<Observation> {
    if let Some(cutoff) = from_date {
        series.retain(|o| o.utc_read_time >= cutoff);
    }
    series.sort_by_key(|o| o.utc_read_time);
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn obs(event: &str, secs: i64, price: f64) -> Observation {
        Observation::new(event, Utc.timestamp_opt(secs, 0).unwrap()).with_field("lowest_price", price)
    }

    fn prices(series: &[Observation]) -> Vec<f64> {
        series.iter().map(|o| o.price("lowest_price").unwrap()).collect()
    }

    #[test]
    fn test_sorts_by_read_time() {
        let series = vec![obs("e1", 300, 3.0), obs("e1", 100, 1.0), obs("e1", 200, 2.0)];

        let sorted = normalize_series(series, None);

        assert_eq!(prices(&sorted), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let series = vec![
            obs("e1", 200, 20.0),
            obs("e1", 100, 10.0),
            obs("e1", 200, 21.0),
            obs("e1", 200, 22.0),
        ];

        let sorted = normalize_series(series, None);

        assert_eq!(prices(&sorted), vec![10.0, 20.0, 21.0, 22.0]);
    }

    #[test]
    fn test_from_date_is_inclusive() {
        let series = vec![obs("e1", 100, 1.0), obs("e1", 200, 2.0), obs("e1", 300, 3.0)];
        let cutoff = Utc.timestamp_opt(200, 0).unwrap();

        let sorted = normalize_series(series, Some(cutoff));

        assert_eq!(prices(&sorted), vec![2.0, 3.0]);
    }

    #[test]
    fn test_empty_series() {
        assert!(normalize_series(Vec::new(), None).is_empty());
        let cutoff = Utc.timestamp_opt(1_000, 0).unwrap();
        assert!(normalize_series(vec![obs("e1", 1, 1.0)], Some(cutoff)).is_empty());
    }

    #[test]
    fn test_group_by_event_first_appearance() {
        let observations = vec![
            obs("e2", 1, 1.0),
            obs("e1", 2, 2.0),
            obs("e2", 3, 3.0),
            obs("e3", 4, 4.0),
            obs("e1", 5, 5.0),
        ];

        let groups = group_by_event(observations);

        let ids: Vec<&str> = groups.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e1", "e3"]);
        assert_eq!(prices(&groups[0].1), vec![1.0, 3.0]);
        assert_eq!(prices(&groups[1].1), vec![2.0, 5.0]);
        assert_eq!(groups.iter().map(|(_, s)| s.len()).sum::<usize>(), 5);
    }
}
