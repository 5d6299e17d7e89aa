use log::debug;
use serde::Serialize;

use super::model::{Dataset, Field, Record};
use super::schema::{Variant, FEED_SOURCE, TREATMENT_KEY, WEEK};

// ---------------------------------------------------------------------------
// Summary – per-group means
// ---------------------------------------------------------------------------

/// One row per group, one column per metric, means rounded to 2 decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    /// Header of the grouping column; `None` for the overall summary.
    pub key_column: Option<String>,
    pub metric_columns: Vec<String>,
    pub rows: Vec<SummaryRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub key: Option<String>,
    /// `None` when the group has no value for that metric.
    pub values: Vec<Option<f64>>,
}

impl Summary {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Mean of `metric_column` for the group `key`.
    pub fn value(&self, key: &str, metric_column: &str) -> Option<f64> {
        let col = self.metric_columns.iter().position(|c| c == metric_column)?;
        self.rows
            .iter()
            .find(|r| r.key.as_deref() == Some(key))
            .and_then(|r| r.values[col])
    }
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Grouped summaries
// ---------------------------------------------------------------------------

/// Summary by the variant's primary key: treatment code or week.
pub fn by_primary(dataset: &Dataset) -> Summary {
    match dataset.variant {
        Variant::Treatment => by_treatment(dataset),
        Variant::Weekly => by_week(dataset),
    }
}

/// Means per treatment code, groups in first-appearance order.
pub fn by_treatment(dataset: &Dataset) -> Summary {
    let groups = partition(&dataset.records, |r| r.group.clone());
    summarize(dataset, Some(TREATMENT_KEY), groups)
}

/// Means per week, ascending by week index.
pub fn by_week(dataset: &Dataset) -> Summary {
    let mut groups = partition(&dataset.records, |r| r.week);
    groups.sort_by_key(|(week, _)| *week);
    let groups = groups
        .into_iter()
        .map(|(week, rows)| (week.to_string(), rows))
        .collect();
    summarize(dataset, Some(WEEK), groups)
}

/// Means per feed source, or `None` when the input has no feed-source column.
pub fn by_feed_source(dataset: &Dataset) -> Option<Summary> {
    if !dataset.layout.is_present(Field::FeedSource) {
        return None;
    }
    let groups = partition(&dataset.records, |r| r.feed_source.clone());
    Some(summarize(dataset, Some(FEED_SOURCE), groups))
}

/// One row of means over the whole dataset.
pub fn overall(dataset: &Dataset) -> Summary {
    let all: Vec<&Record> = dataset.records.iter().collect();
    let mut summary = summarize(dataset, None, vec![(String::new(), all)]);
    for row in &mut summary.rows {
        row.key = None;
    }
    summary
}

/// Split records by key, keeping first-appearance order. Records without a
/// key are left out.
fn partition<K, F>(records: &[Record], key: F) -> Vec<(K, Vec<&Record>)>
where
    K: PartialEq,
    F: Fn(&Record) -> Option<K>,
{
    let mut groups: Vec<(K, Vec<&Record>)> = Vec::new();
    for record in records {
        let Some(k) = key(record) else { continue };
        match groups.iter_mut().find(|(g, _)| *g == k) {
            Some((_, rows)) => rows.push(record),
            None => groups.push((k, vec![record])),
        }
    }
    groups
}

fn summarize(dataset: &Dataset, key_column: Option<&str>, groups: Vec<(String, Vec<&Record>)>) -> Summary {
    let metrics = dataset.variant.summary_metrics();
    let metric_columns = metrics
        .iter()
        .map(|f| dataset.layout.column(*f).to_string())
        .collect();

    let rows: Vec<SummaryRow> = groups
        .into_iter()
        .map(|(key, records)| SummaryRow {
            key: Some(key),
            values: metrics
                .iter()
                .map(|f| {
                    let values: Vec<f64> = records.iter().filter_map(|r| r.metric(*f)).collect();
                    mean(&values).map(round2)
                })
                .collect(),
        })
        .collect();

    debug!(
        "Summary by {}: {} groups",
        key_column.unwrap_or("<all>"),
        rows.len()
    );
    Summary {
        key_column: key_column.map(str::to_string),
        metric_columns,
        rows,
    }
}
