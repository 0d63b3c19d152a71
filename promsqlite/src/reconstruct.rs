//! Rebuilding time-series objects from stored rows.
//!
//! Each stored row independently becomes one single-sample series: rows
//! are deliberately *not* grouped by label identity, so two rows with the
//! same name and dimensions yield two result series. This flattening is a
//! known simplification of the read path, not an accident.

use std::collections::BTreeMap;

use crate::error::ReconstructError;
use crate::proto::{self, METRIC_NAME_LABEL};
use crate::storage::SampleRow;

/// Rebuilds one [`proto::TimeSeries`] per stored row, in row order.
///
/// # Errors
///
/// Returns [`ReconstructError::InvalidDimensions`] if any row's
/// `dimensions` column is not a valid JSON object; the whole query is
/// aborted rather than returning partial results.
pub fn reconstruct(rows: &[SampleRow]) -> Result<Vec<proto::TimeSeries>, ReconstructError> {
    rows.iter().map(series_from_row).collect()
}

/// Builds a single-sample series from one row.
///
/// The label set is `{__name__: row.name}` plus the decoded dimensions,
/// sorted by label name as the prompb convention requires.
fn series_from_row(row: &SampleRow) -> Result<proto::TimeSeries, ReconstructError> {
    let dimensions: BTreeMap<String, String> = serde_json::from_str(&row.dimensions)
        .map_err(|e| ReconstructError::InvalidDimensions { source: e })?;

    let mut labels = Vec::with_capacity(dimensions.len() + 1);
    labels.push(proto::Label {
        name: METRIC_NAME_LABEL.to_string(),
        value: row.name.clone(),
    });
    for (name, value) in dimensions {
        labels.push(proto::Label { name, value });
    }
    labels.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(proto::TimeSeries {
        labels,
        samples: vec![proto::Sample {
            value: row.value,
            timestamp: row.timestamp,
        }],
    })
}
