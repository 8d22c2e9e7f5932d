use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Range;

use serde::Serialize;

use crate::error::{ExplainError, Result};

// ---------------------------------------------------------------------------
// Series – T timesteps × F channels
// ---------------------------------------------------------------------------

/// A univariate or multivariate time series.
///
/// Values are stored row-major: `values[t * channels + c]`. A univariate
/// series is simply the `channels == 1` case, so every component handles both
/// shapes through the same accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    len: usize,
    channels: usize,
    values: Vec<f64>,
}

impl Series {
    /// Single-channel series.
    pub fn univariate(values: Vec<f64>) -> Self {
        Series {
            len: values.len(),
            channels: 1,
            values,
        }
    }

    /// Build from one row per timestep; every row must have the same width.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let channels = rows.first().map(Vec::len).unwrap_or(1);
        if channels == 0 {
            return Err(ExplainError::shape("at least one channel", "0 channels"));
        }
        let len = rows.len();
        let mut values = Vec::with_capacity(len * channels);
        for (t, row) in rows.into_iter().enumerate() {
            if row.len() != channels {
                return Err(ExplainError::shape(
                    format!("{channels} values per timestep"),
                    format!("{} at timestep {t}", row.len()),
                ));
            }
            values.extend(row);
        }
        Ok(Series {
            len,
            channels,
            values,
        })
    }

    /// Build from one vector per channel; all channels must have equal length.
    pub fn from_channels(channels: Vec<Vec<f64>>) -> Result<Self> {
        let n_channels = channels.len();
        if n_channels == 0 {
            return Err(ExplainError::shape("at least one channel", "0 channels"));
        }
        let len = channels[0].len();
        if let Some((c, ch)) = channels.iter().enumerate().find(|(_, ch)| ch.len() != len) {
            return Err(ExplainError::shape(
                format!("{len} timesteps in every channel"),
                format!("{} in channel {c}", ch.len()),
            ));
        }
        let mut values = Vec::with_capacity(len * n_channels);
        for t in 0..len {
            values.extend(channels.iter().map(|ch| ch[t]));
        }
        Ok(Series {
            len,
            channels: n_channels,
            values,
        })
    }

    /// Number of timesteps (T).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of channels (F).
    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn value(&self, t: usize, c: usize) -> f64 {
        self.values[t * self.channels + c]
    }

    /// All channel values at timestep `t`.
    pub fn row(&self, t: usize) -> &[f64] {
        &self.values[t * self.channels..(t + 1) * self.channels]
    }

    /// Copy of one channel as a contiguous vector.
    pub fn channel(&self, c: usize) -> Vec<f64> {
        self.values
            .iter()
            .skip(c)
            .step_by(self.channels)
            .copied()
            .collect()
    }

    /// Raw row-major values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Largest value over all timesteps and channels (`-inf` when empty).
    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Human-readable `T×F` shape used in error messages.
    pub fn shape_label(&self) -> String {
        format!("{}x{}", self.len, self.channels)
    }

    /// Fail with a shape error unless `other` has exactly this shape.
    pub fn ensure_same_shape(&self, other: &Series, what: &str) -> Result<()> {
        if self.len != other.len || self.channels != other.channels {
            return Err(ExplainError::shape(
                format!("{what} of shape {}", self.shape_label()),
                other.shape_label(),
            ));
        }
        Ok(())
    }

    /// Overwrite `span` with the values of `source` (same shape), either on
    /// every channel or on a single one.
    pub(crate) fn copy_span_from(
        &mut self,
        source: &Series,
        span: Range<usize>,
        channel: Option<usize>,
    ) {
        let f = self.channels;
        match channel {
            None => self.values[span.start * f..span.end * f]
                .copy_from_slice(&source.values[span.start * f..span.end * f]),
            Some(c) => {
                for t in span {
                    self.values[t * f + c] = source.values[t * f + c];
                }
            }
        }
    }

    /// Set `span` of channel `c` to a constant.
    pub(crate) fn fill_span(&mut self, span: Range<usize>, c: usize, value: f64) {
        let f = self.channels;
        for t in span {
            self.values[t * f + c] = value;
        }
    }

    /// Replace one channel wholesale; `values` must have length T.
    pub(crate) fn set_channel(&mut self, c: usize, values: &[f64]) {
        let f = self.channels;
        for (t, v) in values.iter().enumerate().take(self.len) {
            self.values[t * f + c] = *v;
        }
    }
}

// ---------------------------------------------------------------------------
// MetadataValue – a single metadata cell attached to a record
// ---------------------------------------------------------------------------

/// Dynamically typed metadata (labels, subject ids, dates …).
///
/// Ordered so it can key `BTreeMap`/`BTreeSet`; values of different kinds sort
/// by kind first.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date kept as text.
    Date(String),
    Null,
}

impl MetadataValue {
    fn kind_rank(&self) -> u8 {
        match self {
            MetadataValue::Null => 0,
            MetadataValue::Bool(_) => 1,
            MetadataValue::Integer(_) => 2,
            MetadataValue::Float(_) => 3,
            MetadataValue::String(_) => 4,
            MetadataValue::Date(_) => 5,
        }
    }

    /// Infer a value from a text cell (CSV cells, `--where` predicates).
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            MetadataValue::Null
        } else if let Ok(i) = text.parse::<i64>() {
            MetadataValue::Integer(i)
        } else if let Ok(f) = text.parse::<f64>() {
            MetadataValue::Float(f)
        } else if let Ok(b) = text.parse::<bool>() {
            MetadataValue::Bool(b)
        } else {
            MetadataValue::String(text.to_string())
        }
    }
}

impl Eq for MetadataValue {}

impl PartialOrd for MetadataValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetadataValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use MetadataValue::*;
        match (self, other) {
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) | (Date(a), Date(b)) => a.cmp(b),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) | MetadataValue::Date(s) => write!(f, "{s}"),
            MetadataValue::Integer(i) => write!(f, "{i}"),
            MetadataValue::Float(v) => write!(f, "{v}"),
            MetadataValue::Bool(b) => write!(f, "{b}"),
            MetadataValue::Null => write!(f, "<null>"),
        }
    }
}

// ---------------------------------------------------------------------------
// SeriesRecord / SeriesDataset
// ---------------------------------------------------------------------------

/// One example: the series plus whatever metadata travelled with it.
#[derive(Debug, Clone)]
pub struct SeriesRecord {
    pub series: Series,
    pub metadata: BTreeMap<String, MetadataValue>,
}

/// A loaded collection of records with a per-column index of unique values.
#[derive(Debug, Clone)]
pub struct SeriesDataset {
    pub records: Vec<SeriesRecord>,
    /// Metadata column names, sorted.
    pub column_names: Vec<String>,
    pub unique_values: BTreeMap<String, BTreeSet<MetadataValue>>,
}

impl SeriesDataset {
    pub fn from_records(records: Vec<SeriesRecord>) -> Self {
        let mut unique_values: BTreeMap<String, BTreeSet<MetadataValue>> = BTreeMap::new();
        for record in &records {
            for (col, val) in &record.metadata {
                unique_values
                    .entry(col.clone())
                    .or_default()
                    .insert(val.clone());
            }
        }
        let column_names = unique_values.keys().cloned().collect();
        SeriesDataset {
            records,
            column_names,
            unique_values,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SeriesRecord> {
        self.records.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_channels_interleaves_row_major() {
        let s = Series::from_channels(vec![vec![1.0, 2.0, 3.0], vec![10.0, 20.0, 30.0]]).unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.channels(), 2);
        assert_eq!(s.row(1), &[2.0, 20.0]);
        assert_eq!(s.channel(1), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn ragged_rows_are_a_shape_error() {
        let err = Series::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, ExplainError::Shape { .. }));
    }

    #[test]
    fn series_serializes_with_its_shape() {
        let s = Series::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["len"], 2);
        assert_eq!(json["channels"], 2);
        assert_eq!(json["values"], serde_json::json!([1.0, 2.0, 3.0, 4.0]));
    }

    #[test]
    fn copy_span_single_channel_leaves_others() {
        let mut a = Series::from_channels(vec![vec![0.0; 4], vec![0.0; 4]]).unwrap();
        let b = Series::from_channels(vec![vec![1.0; 4], vec![2.0; 4]]).unwrap();
        a.copy_span_from(&b, 1..3, Some(1));
        assert_eq!(a.channel(0), vec![0.0; 4]);
        assert_eq!(a.channel(1), vec![0.0, 2.0, 2.0, 0.0]);
    }

    #[test]
    fn metadata_parse_and_order() {
        assert_eq!(MetadataValue::parse("3"), MetadataValue::Integer(3));
        assert_eq!(MetadataValue::parse("0.5"), MetadataValue::Float(0.5));
        assert_eq!(MetadataValue::parse("true"), MetadataValue::Bool(true));
        assert_eq!(MetadataValue::parse(""), MetadataValue::Null);
        assert!(MetadataValue::Null < MetadataValue::Integer(-5));
        assert!(MetadataValue::Integer(1) < MetadataValue::Integer(2));
    }

    #[test]
    fn dataset_indexes_unique_values() {
        let rec = |label: i64| SeriesRecord {
            series: Series::univariate(vec![0.0, 1.0]),
            metadata: BTreeMap::from([("label".to_string(), MetadataValue::Integer(label))]),
        };
        let ds = SeriesDataset::from_records(vec![rec(0), rec(1), rec(1)]);
        assert_eq!(ds.column_names, vec!["label".to_string()]);
        assert_eq!(ds.unique_values["label"].len(), 2);
    }
}
