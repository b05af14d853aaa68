//! Momentum calculation over one event's ordered price series
//!
//! For i > 0:
//! - `pct_change[i] = price[i] / price[i-1] - 1`
//! - `log_return[i] = ln(price[i]) - ln(price[i-1])`
//!
//! Index 0 has no predecessor, so both are NaN there. How that leading NaN
//! enters the cumulative sums is a [`NanPolicy`] decision.

use super::types::{MomentumRecord, Observation};
use crate::error::PipelineError;

/// Treatment of the leading NaN in cumulative sums
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NanPolicy {
    /// NaN positions stay NaN, later sums ignore them.
    /// cumsum = [NaN, r1, r1+r2, ...]
    #[default]
    SkipLeading,
    /// The leading NaN counts as zero.
    /// cumsum = [0, r1, r1+r2, ...]
    TreatFirstAsZero,
    /// Plain IEEE addition: every cumulative value is NaN.
    PropagateNan,
}

impl NanPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "skip-leading" | "skip" => Some(NanPolicy::SkipLeading),
            "treat-first-as-zero" | "zero" => Some(NanPolicy::TreatFirstAsZero),
            "propagate-nan" | "propagate" => Some(NanPolicy::PropagateNan),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NanPolicy::SkipLeading => "skip-leading",
            NanPolicy::TreatFirstAsZero => "treat-first-as-zero",
            NanPolicy::PropagateNan => "propagate-nan",
        }
    }

    /// Running sum of `values` under this policy
    fn cumulative(&self, values: &[f64]) -> Vec<f64> {
        let mut acc = 0.0;
        values
            .iter()
            .map(|&v| match self {
                NanPolicy::SkipLeading => {
                    if v.is_nan() {
                        f64::NAN
                    } else {
                        acc += v;
                        acc
                    }
                }
                NanPolicy::TreatFirstAsZero => {
                    if !v.is_nan() {
                        acc += v;
                    }
                    acc
                }
                NanPolicy::PropagateNan => {
                    acc += v;
                    acc
                }
            })
            .collect()
    }
}

/// Compute momentum fields for one event's time-ordered series
///
/// Returns exactly one record per observation, in input order. The series
/// must already be normalized (see `normalizer::normalize_series`).
///
/// Prices must be finite and strictly positive: a zero or negative price
/// would divide by zero or take the log of a non-positive number, so it
/// aborts the run as a shape error.
pub fn compute_momentum(
    series: Vec<Observation>,
    price_field: &str,
    policy: NanPolicy,
) -> Result<Vec<MomentumRecord>, PipelineError> {
    let prices = series
        .iter()
        .map(|obs| {
            let price = obs.price(price_field)?;
            if !price.is_finite() || price <= 0.0 {
                return Err(PipelineError::DataShape(format!(
                    "event {} at {}: {} must be positive, got {}",
                    obs.event_id, obs.utc_read_time, price_field, price
                )));
            }
            Ok(price)
        })
        .collect::<Result<Vec<f64>, PipelineError>>()?;

    let mut pct_change = Vec::with_capacity(prices.len());
    let mut log_return = Vec::with_capacity(prices.len());
    for (i, price) in prices.iter().enumerate() {
        if i == 0 {
            pct_change.push(f64::NAN);
            log_return.push(f64::NAN);
        } else {
            let prev = prices[i - 1];
            pct_change.push(price / prev - 1.0);
            log_return.push(price.ln() - prev.ln());
        }
    }

    let pct_change_cumsum = policy.cumulative(&pct_change);
    let log_return_cumsum = policy.cumulative(&log_return);

    Ok(series
        .into_iter()
        .enumerate()
        .map(|(i, observation)| MomentumRecord {
            observation,
            pct_change: pct_change[i],
            log_return: log_return[i],
            log_return_cumsum: log_return_cumsum[i],
            pct_change_cumsum: pct_change_cumsum[i],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const EPS: f64 = 1e-9;

    fn series(prices: &[f64]) -> Vec<Observation> {
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| {
                Observation::new("e1", Utc.timestamp_opt(1_700_000_000 + i as i64 * 60, 0).unwrap())
                    .with_field("lowest_price", *p)
                    .with_field("listing_count", 10 + i as i64)
            })
            .collect()
    }

    #[test]
    fn test_ten_percent_steps() {
        let records =
            compute_momentum(series(&[100.0, 110.0, 121.0]), "lowest_price", NanPolicy::SkipLeading)
                .unwrap();

        assert_eq!(records.len(), 3);
        assert!(records[0].pct_change.is_nan());
        assert!(records[0].log_return.is_nan());
        assert!((records[1].pct_change - 0.1).abs() < EPS);
        assert!((records[2].pct_change - 0.1).abs() < EPS);
        assert!((records[2].pct_change_cumsum - 0.2).abs() < EPS);
        assert!((records[2].log_return_cumsum - (121.0f64 / 100.0).ln()).abs() < EPS);
    }

    #[test]
    fn test_skip_leading_policy() {
        let records =
            compute_momentum(series(&[100.0, 110.0, 121.0]), "lowest_price", NanPolicy::SkipLeading)
                .unwrap();

        assert!(records[0].pct_change_cumsum.is_nan());
        assert!(records[0].log_return_cumsum.is_nan());
        assert!((records[1].pct_change_cumsum - 0.1).abs() < EPS);
    }

    #[test]
    fn test_treat_first_as_zero_policy() {
        let records = compute_momentum(
            series(&[100.0, 110.0, 121.0]),
            "lowest_price",
            NanPolicy::TreatFirstAsZero,
        )
        .unwrap();

        assert_eq!(records[0].pct_change_cumsum, 0.0);
        assert_eq!(records[0].log_return_cumsum, 0.0);
        assert!(records[0].pct_change.is_nan());
        assert!((records[2].pct_change_cumsum - 0.2).abs() < EPS);
    }

    #[test]
    fn test_propagate_nan_policy() {
        let records = compute_momentum(
            series(&[100.0, 110.0, 121.0]),
            "lowest_price",
            NanPolicy::PropagateNan,
        )
        .unwrap();

        assert!(records.iter().all(|r| r.pct_change_cumsum.is_nan()));
        assert!(records.iter().all(|r| r.log_return_cumsum.is_nan()));
        // Per-step values are unaffected by the policy
        assert!((records[1].pct_change - 0.1).abs() < EPS);
    }

    #[test]
    fn test_no_look_ahead() {
        let short =
            compute_momentum(series(&[100.0, 90.0]), "lowest_price", NanPolicy::SkipLeading).unwrap();
        let long = compute_momentum(
            series(&[100.0, 90.0, 500.0, 1.0]),
            "lowest_price",
            NanPolicy::SkipLeading,
        )
        .unwrap();

        assert_eq!(short[1].pct_change_cumsum, long[1].pct_change_cumsum);
        assert_eq!(short[1].log_return_cumsum, long[1].log_return_cumsum);
    }

    #[test]
    fn test_single_observation() {
        let records =
            compute_momentum(series(&[250.0]), "lowest_price", NanPolicy::SkipLeading).unwrap();

        assert_eq!(records.len(), 1);
        assert!(records[0].pct_change.is_nan());
        assert!(records[0].log_return.is_nan());
        assert!(records[0].pct_change_cumsum.is_nan());
        assert!(records[0].log_return_cumsum.is_nan());
    }

    #[test]
    fn test_other_fields_carried_through() {
        let records =
            compute_momentum(series(&[100.0, 120.0]), "lowest_price", NanPolicy::SkipLeading).unwrap();

        assert_eq!(records[1].observation.fields["listing_count"], 11);
        assert_eq!(records[1].event_id(), "e1");
    }

    #[test]
    fn test_empty_series() {
        let records = compute_momentum(Vec::new(), "lowest_price", NanPolicy::SkipLeading).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let zero = compute_momentum(series(&[100.0, 0.0, 50.0]), "lowest_price", NanPolicy::SkipLeading);
        assert!(matches!(zero, Err(PipelineError::DataShape(_))));

        let negative = compute_momentum(series(&[-5.0]), "lowest_price", NanPolicy::SkipLeading);
        assert!(matches!(negative, Err(PipelineError::DataShape(_))));
    }

    #[test]
    fn test_missing_price_field_rejected() {
        let result = compute_momentum(series(&[100.0]), "median_price", NanPolicy::SkipLeading);
        assert!(result.unwrap_err().to_string().contains("missing price field median_price"));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(NanPolicy::parse("treat_first_as_zero"), Some(NanPolicy::TreatFirstAsZero));
        assert_eq!(NanPolicy::parse("Propagate-NaN"), Some(NanPolicy::PropagateNan));
        assert_eq!(NanPolicy::parse(NanPolicy::SkipLeading.as_str()), Some(NanPolicy::SkipLeading));
        assert_eq!(NanPolicy::parse("nope"), None);
    }
}
