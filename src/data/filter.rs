use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};

use super::model::{MetadataValue, Series, SeriesDataset};

// ---------------------------------------------------------------------------
// Metadata predicates: which values are accepted per column
// ---------------------------------------------------------------------------

/// Per-column accepted values: column_name → set of values.
/// A record passes when, for every listed column, its value is in the set.
/// Records lacking the column only pass if `Null` is accepted.
pub type FilterState = BTreeMap<String, BTreeSet<MetadataValue>>;

/// Parse `column=value` predicates. Repeating a column widens its set, so
/// `label=0 label=2` accepts either label.
pub fn parse_predicates<S: AsRef<str>>(predicates: &[S]) -> Result<FilterState> {
    let mut filters = FilterState::new();
    for raw in predicates {
        let raw = raw.as_ref();
        let (column, value) = raw
            .split_once('=')
            .with_context(|| format!("predicate '{raw}' is not of the form column=value"))?;
        filters
            .entry(column.trim().to_string())
            .or_default()
            .insert(MetadataValue::parse(value));
    }
    Ok(filters)
}

/// Indices of records passing every predicate.
pub fn filtered_indices(dataset: &SeriesDataset, filters: &FilterState) -> Vec<usize> {
    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, record)| {
            filters.iter().all(|(col, accepted)| {
                let value = record.metadata.get(col).unwrap_or(&MetadataValue::Null);
                accepted.contains(value)
            })
        })
        .map(|(i, _)| i)
        .collect()
}

/// The background pool: series of every passing record except `exclude`
/// (normally the record being explained).
pub fn background_pool(
    dataset: &SeriesDataset,
    filters: &FilterState,
    exclude: Option<usize>,
) -> Vec<Series> {
    filtered_indices(dataset, filters)
        .into_iter()
        .filter(|&i| Some(i) != exclude)
        .map(|i| dataset.records[i].series.clone())
        .collect()
}
