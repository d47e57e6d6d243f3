//! Summaries derived from stored profiler output.
//!
//! Payloads follow the profiler's layout: a `tableProfile` object with table
//! level metrics and a `columnProfile` array with one object per column. The
//! stored payload is never rewritten; everything here is computed on read.

pub mod metrics;

use serde::Serialize;
use serde_json::Value;

use crate::database::models::ProfileRecord;
pub use metrics::{
    column_accuracy_ratio, lenient_int, raw_accuracy_ratio, AccuracyKind, ACCURACY_THRESHOLD,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnAccuracy {
    pub name: String,
    pub values_count: i64,
    pub dominant_kind: Option<AccuracyKind>,
    /// `None` when the column has no usable values count.
    pub accuracy_ratio: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub timestamp: i64,
    pub row_count: i64,
    pub column_count: i64,
    pub size_in_bytes: i64,
    pub columns: Vec<ColumnAccuracy>,
    pub accuracy_proportion: f64,
    /// `accuracy_proportion` as a percentage with two decimals, e.g. `"62.50%"`.
    pub accuracy_proportion_display: String,
}

impl ProfileSummary {
    pub fn from_profile(profile: &ProfileRecord) -> Self {
        let table = profile.payload.get("tableProfile");
        let table_metric = |key: &str| lenient_int(key, table.and_then(|t| t.get(key)));

        let named: Vec<&Value> = profile
            .payload
            .get("columnProfile")
            .and_then(Value::as_array)
            .map(|cols| cols.iter().filter(|c| column_name(c).is_some()).collect())
            .unwrap_or_default();

        let columns: Vec<ColumnAccuracy> = named.iter().filter_map(|c| column_accuracy(c)).collect();

        // Averaged over every named column on the raw ratio; columns without
        // values count as 0.
        let ratios: Vec<f64> = named.iter().map(|c| raw_accuracy_ratio(c)).collect();
        let accuracy_proportion = if ratios.is_empty() {
            0.0
        } else {
            ratios.iter().sum::<f64>() / ratios.len() as f64
        };

        Self {
            timestamp: profile.timestamp,
            row_count: table_metric("rowCount"),
            column_count: table_metric("columnCount"),
            size_in_bytes: table_metric("sizeInBytes"),
            columns,
            accuracy_proportion,
            accuracy_proportion_display: format!("{:.2}%", accuracy_proportion * 100.0),
        }
    }
}

fn column_name(column: &Value) -> Option<&str> {
    column.get("name")?.as_str()
}

fn column_accuracy(column: &Value) -> Option<ColumnAccuracy> {
    let name = column_name(column)?.to_string();
    let values_count = lenient_int("valuesCount", column.get("valuesCount"));
    let (dominant_kind, accuracy_ratio) = column_accuracy_ratio(column);

    Some(ColumnAccuracy {
        name,
        values_count,
        dominant_kind,
        accuracy_ratio,
    })
}
