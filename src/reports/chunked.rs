//! Stitching week-sized report chunks into one result.
//!
//! Rows are concatenated in chunk order. `summary` and `totals` arrays are
//! merged element-wise with [`merge_totals`], each only from chunks that
//! actually carry that key.

use chrono::NaiveDateTime;
use serde_json::{json, Number, Value};

use crate::reports::olap::OlapReport;

/// Adds two totals arrays element-wise.
///
/// - a position missing from one array (shorter array or `null`) takes the
///   other array's value
/// - two numbers are summed, staying integral when both are integers
/// - otherwise the value from `a` is kept
///
/// # Example
///
/// ```rust
/// use iiko_api::reports::merge_totals;
/// use serde_json::json;
///
/// let merged = merge_totals(
///     json!([10, null, "x"]).as_array().unwrap(),
///     json!([5, 3, "y"]).as_array().unwrap(),
/// );
/// assert_eq!(merged, vec![json!(15), json!(3), json!("x")]);
/// ```
#[must_use]
pub fn merge_totals(a: &[Value], b: &[Value]) -> Vec<Value> {
    (0..a.len().max(b.len()))
        .map(|i| {
            let left = a.get(i).unwrap_or(&Value::Null);
            let right = b.get(i).unwrap_or(&Value::Null);
            match (left, right) {
                (Value::Null, other) | (other, Value::Null) => other.clone(),
                (Value::Number(x), Value::Number(y)) => {
                    add_numbers(x, y).map_or_else(|| left.clone(), Value::Number)
                }
                _ => left.clone(),
            }
        })
        .collect()
}

fn add_numbers(x: &Number, y: &Number) -> Option<Number> {
    if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
        if let Some(sum) = x.checked_add(y) {
            return Some(sum.into());
        }
    }
    if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
        if let Some(sum) = x.checked_add(y) {
            return Some(sum.into());
        }
    }
    Number::from_f64(x.as_f64()? + y.as_f64()?)
}

/// One request of a chunked report run.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkRecord {
    /// Start of the window (inclusive).
    pub window_start: NaiveDateTime,
    /// End of the window (exclusive).
    pub window_end: NaiveDateTime,
    /// Number of rows the chunk contributed.
    pub row_count: usize,
    /// The chunk's response as received.
    pub raw: Value,
}

/// The merged result of a chunked report run.
#[derive(Clone, Debug)]
pub struct ChunkedReport {
    /// The merged report. Its `raw` holds the merged `data`, `summary`
    /// and `totals`.
    pub report: OlapReport,
    /// Per-chunk log, in request order.
    pub chunks: Vec<ChunkRecord>,
}

impl ChunkedReport {
    /// Total number of merged rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.report.rows.len()
    }
}

/// Accumulates chunk responses until the date range is exhausted.
#[derive(Clone, Debug, Default)]
pub struct ChunkAccumulator {
    rows: Vec<Value>,
    summary: Option<Vec<Value>>,
    totals: Option<Vec<Value>>,
    chunks: Vec<ChunkRecord>,
}

impl ChunkAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one chunk response and returns the number of rows it held.
    pub fn push(
        &mut self,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
        raw: Value,
    ) -> usize {
        let rows = raw
            .get("data")
            .and_then(Value::as_array)
            .map_or(&[][..], Vec::as_slice);
        let row_count = rows.len();
        self.rows.extend_from_slice(rows);

        merge_into(&mut self.summary, raw.get("summary"));
        merge_into(&mut self.totals, raw.get("totals"));

        self.chunks.push(ChunkRecord {
            window_start,
            window_end,
            row_count,
            raw,
        });
        row_count
    }

    /// Number of chunks added so far.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of rows added so far.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Finalizes the run into a report over `group_by` and `aggregate_fields`.
    #[must_use]
    pub fn finish(self, group_by: &[String], aggregate_fields: &[String]) -> ChunkedReport {
        let raw = json!({
            "data": self.rows,
            "summary": self.summary,
            "totals": self.totals,
        });
        ChunkedReport {
            report: OlapReport::from_raw(group_by, aggregate_fields, raw),
            chunks: self.chunks,
        }
    }
}

fn merge_into(merged: &mut Option<Vec<Value>>, incoming: Option<&Value>) {
    let Some(incoming) = incoming.and_then(Value::as_array) else {
        return;
    };
    *merged = Some(match merged.take() {
        Some(current) => merge_totals(&current, incoming),
        None => incoming.clone(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn values(value: &Value) -> &[Value] {
        value.as_array().unwrap()
    }

    #[test]
    fn test_merge_sums_numbers_fills_gaps_and_keeps_first_non_number() {
        let merged = merge_totals(values(&json!([10, null, "x"])), values(&json!([5, 3, "y"])));
        assert_eq!(merged, vec![json!(15), json!(3), json!("x")]);
    }

    #[test]
    fn test_merge_arrays_of_different_lengths() {
        let merged = merge_totals(values(&json!([1.5])), values(&json!([2, 7, null])));
        assert_eq!(merged, vec![json!(3.5), json!(7), Value::Null]);
    }

    #[test]
    fn test_merge_keeps_integers_integral() {
        let merged = merge_totals(values(&json!([2, -3])), values(&json!([40, 1])));
        assert_eq!(merged, vec![json!(42), json!(-2)]);
        assert!(merged[0].is_i64());
    }

    #[test]
    fn test_merge_integer_overflow_falls_back_to_float() {
        let merged = merge_totals(values(&json!([u64::MAX])), values(&json!([1])));
        assert!(merged[0].is_f64());
    }

    #[test]
    fn test_accumulator_concatenates_rows_in_order() {
        let mut acc = ChunkAccumulator::new();
        assert_eq!(acc.push(day(1), day(5), json!({"data": [{"n": 1}, {"n": 2}]})), 2);
        assert_eq!(acc.push(day(5), day(12), json!({"data": []})), 0);
        assert_eq!(acc.push(day(12), day(19), json!({"data": [{"n": 3}]})), 1);

        assert_eq!(acc.chunk_count(), 3);
        let result = acc.finish(&[], &[]);
        assert_eq!(result.row_count(), 3);
        assert_eq!(result.report.rows, vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})]);
        assert_eq!(
            result.chunks.iter().map(|c| c.row_count).sum::<usize>(),
            result.row_count()
        );
    }

    #[test]
    fn test_accumulator_merges_summary_and_totals_independently() {
        let mut acc = ChunkAccumulator::new();
        acc.push(day(1), day(5), json!({"data": [], "summary": ["All", 100, 4]}));
        acc.push(day(5), day(12), json!({"data": [], "totals": ["All", 7]}));
        acc.push(day(12), day(19), json!({"data": [], "summary": ["All", 50, 1]}));

        let result = acc.finish(&["Dept".to_string()], &["Sum".to_string(), "Count".to_string()]);

        assert_eq!(result.report.raw["summary"], json!(["All", 150, 5]));
        assert_eq!(result.report.raw["totals"], json!(["All", 7]));
        let summary = result.report.summary.unwrap();
        assert_eq!(summary["Sum"], json!(150));
        assert_eq!(summary["Count"], json!(5));
    }

    #[test]
    fn test_accumulator_without_summaries_has_none() {
        let mut acc = ChunkAccumulator::new();
        acc.push(day(1), day(5), json!({"data": [[1, 2]]}));

        let result = acc.finish(&["A".to_string()], &["B".to_string()]);
        assert!(result.report.raw["summary"].is_null());
        assert!(result.report.summary.is_none());
        assert_eq!(result.chunks[0].raw, json!({"data": [[1, 2]]}));
    }
}
