//! # Run Reports
//!
//! Latency percentiles, throughput, error rate, cost and quality aggregated
//! over the metrics of a run, plus the raw CSV export.

use crate::models::Metric;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use utoipa::ToSchema;
use uuid::Uuid;

pub const CSV_HEADER: &str =
    "ts,latency_ms,http_status,prompt_tokens,completion_tokens,cost_usd,quality,error";

/// Aggregated view of one run. Every field is `None` when there is no input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RunSummary {
    pub task_id: Uuid,
    pub p50_ms: Option<i64>,
    pub p90_ms: Option<i64>,
    pub p99_ms: Option<i64>,
    pub rps: Option<f64>,
    pub error_rate: Option<f64>,
    pub cost_usd: Option<f64>,
    pub quality: Option<f64>,
}

/// Linear-interpolated percentile over an ascending slice.
///
/// Uses rank `k = (n - 1) * p` and blends the two neighbouring values.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let last = sorted.len() - 1;
    let k = last as f64 * p;
    let lower = k.floor() as usize;
    let upper = (lower + 1).min(last);
    if lower == upper {
        return Some(sorted[lower]);
    }
    Some(sorted[lower] * (upper as f64 - k) + sorted[upper] * (k - lower as f64))
}

fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Summarize metrics that are already ordered by `ts`
pub fn summarize(task_id: Uuid, rows: &[Metric]) -> RunSummary {
    let mut latencies: Vec<f64> = rows
        .iter()
        .filter_map(|m| m.latency_ms.map(f64::from))
        .collect();
    latencies.sort_by(|a, b| a.total_cmp(b));

    let costs: Vec<f64> = rows.iter().filter_map(|m| m.cost_usd).collect();
    let qualities: Vec<f64> = rows.iter().filter_map(|m| m.quality).collect();
    let errors = rows
        .iter()
        .filter(|m| m.error.as_deref().is_some_and(|e| !e.is_empty()))
        .count();

    let pct = |p: f64| percentile(&latencies, p).map(|v| v.trunc() as i64);

    let (rps, error_rate) = match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => {
            let elapsed = last.ts - first.ts;
            let span = elapsed
                .num_microseconds()
                .map_or(elapsed.num_seconds() as f64, |us| us as f64 / 1_000_000.0);
            let span = if span == 0.0 { 1.0 } else { span };
            let n = rows.len() as f64;
            (
                Some(round_to(n / span, 3)),
                Some(round_to(errors as f64 / n, 4)),
            )
        }
        _ => (None, None),
    };

    RunSummary {
        task_id,
        p50_ms: pct(0.50),
        p90_ms: pct(0.90),
        p99_ms: pct(0.99),
        rps,
        error_rate,
        cost_usd: (!costs.is_empty()).then(|| round_to(costs.iter().sum(), 6)),
        quality: (!qualities.is_empty())
            .then(|| round_to(qualities.iter().sum::<f64>() / qualities.len() as f64, 6)),
    }
}

/// Render metrics as CSV. Empty values stand for missing numbers; the error
/// column is always quoted with embedded quotes doubled.
pub fn metrics_csv(rows: &[Metric]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + 1 + rows.len() * 64);
    out.push_str(CSV_HEADER);
    out.push('\n');

    for m in rows {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},\"{}\"",
            m.ts.to_rfc3339(),
            opt(m.latency_ms),
            opt(m.http_status),
            opt(m.prompt_tokens),
            opt(m.completion_tokens),
            opt(m.cost_usd),
            opt(m.quality),
            m.error.as_deref().unwrap_or("").replace('"', "\"\""),
        );
    }
    out
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn metric(offset_ms: i64, latency: Option<i32>) -> Metric {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        Metric {
            id: Uuid::new_v4(),
            task_id: Uuid::nil(),
            ts: base + Duration::milliseconds(offset_ms),
            latency_ms: latency,
            http_status: Some(200),
            prompt_tokens: None,
            completion_tokens: None,
            cost_usd: None,
            quality: None,
            error: None,
        }
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile(&values, 0.0), Some(10.0));
        assert_eq!(percentile(&values, 1.0), Some(40.0));
        // k = 1.5 → halfway between 20 and 30
        assert_eq!(percentile(&values, 0.5), Some(25.0));
        assert_eq!(percentile(&[], 0.5), None);
        assert_eq!(percentile(&[7.0], 0.99), Some(7.0));
    }

    #[test]
    fn test_summary_of_empty_run_is_all_none() {
        let summary = summarize(Uuid::nil(), &[]);
        assert_eq!(summary.p50_ms, None);
        assert_eq!(summary.rps, None);
        assert_eq!(summary.error_rate, None);
        assert_eq!(summary.cost_usd, None);
        assert_eq!(summary.quality, None);
    }

    #[test]
    fn test_summary_math() {
        let mut rows: Vec<Metric> = (0..5)
            .map(|i| metric(i * 500, Some(((i + 1) * 100) as i32)))
            .collect();
        rows[1].error = Some("boom".into());
        rows[2].error = Some(String::new());
        rows[0].cost_usd = Some(0.1);
        rows[1].cost_usd = Some(0.2);
        rows[3].quality = Some(0.5);
        rows[4].quality = Some(1.0);

        let summary = summarize(Uuid::nil(), &rows);
        assert_eq!(summary.p50_ms, Some(300));
        // k = 3.6 → 400 * 0.4 + 500 * 0.6 = 460
        assert_eq!(summary.p90_ms, Some(460));
        // span is 2s for 5 rows
        assert_eq!(summary.rps, Some(2.5));
        assert_eq!(summary.error_rate, Some(0.2));
        assert_eq!(summary.cost_usd, Some(0.3));
        assert_eq!(summary.quality, Some(0.75));
    }

    #[test]
    fn test_zero_span_counts_as_one_second() {
        let rows = vec![metric(0, Some(1)), metric(0, Some(2)), metric(0, None)];
        let summary = summarize(Uuid::nil(), &rows);
        assert_eq!(summary.rps, Some(3.0));
        assert_eq!(summary.p50_ms, Some(1));
    }

    #[test]
    fn test_sub_millisecond_span_keeps_precision() {
        let mut rows = vec![metric(0, Some(1)), metric(0, Some(2))];
        rows[1].ts += Duration::microseconds(500);
        let summary = summarize(Uuid::nil(), &rows);
        assert_eq!(summary.rps, Some(4000.0));
    }

    #[test]
    fn test_csv_escapes_quotes_and_blanks_missing_values() {
        let mut row = metric(0, Some(120));
        row.http_status = None;
        row.cost_usd = Some(0.25);
        row.error = Some(r#"said "no""#.to_string());

        let csv = metrics_csv(&[row]);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        assert_eq!(
            lines.next(),
            Some(r#"2025-01-01T00:00:00+00:00,120,,,,0.25,,"said ""no""""#)
        );
        assert_eq!(lines.next(), None);
    }

    proptest! {
        #[test]
        fn percentile_stays_within_bounds(
            mut values in proptest::collection::vec(0.0f64..10_000.0, 1..50),
            p in 0.0f64..=1.0,
        ) {
            values.sort_by(|a, b| a.total_cmp(b));
            let result = percentile(&values, p).unwrap();
            prop_assert!(result >= values[0] - 1e-9);
            prop_assert!(result <= values[values.len() - 1] + 1e-9);
        }

        #[test]
        fn percentile_is_monotonic_in_p(
            mut values in proptest::collection::vec(0.0f64..10_000.0, 1..50),
            a in 0.0f64..=1.0,
            b in 0.0f64..=1.0,
        ) {
            values.sort_by(|x, y| x.total_cmp(y));
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(percentile(&values, lo).unwrap() <= percentile(&values, hi).unwrap() + 1e-9);
        }
    }
}
