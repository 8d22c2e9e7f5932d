use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Date32Type, Float64Type, Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::{Map, Value as JsonValue};

use super::model::{MetadataValue, Series, SeriesDataset, SeriesRecord};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a series dataset from a file.  Dispatch by extension.
///
/// `series_columns` names the columns holding series values; one column gives
/// a univariate series, several columns give one channel each (in the order
/// listed). Every other column becomes metadata.
///
/// Supported formats:
/// * `.parquet` – list columns of Float64/Float32
/// * `.json`    – `[{ "values": [...], ...meta }, ...]`; a single series
///   column may also hold rows (`[[c0, c1], ...]`) for multivariate data
/// * `.csv`     – series columns contain semicolon-separated floats
pub fn load_file<S: AsRef<str>>(path: &Path, series_columns: &[S]) -> Result<SeriesDataset> {
    if series_columns.is_empty() {
        bail!("at least one series column is required");
    }
    let columns: Vec<&str> = series_columns.iter().map(AsRef::as_ref).collect();

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path, &columns),
        "json" => load_json(path, &columns),
        "csv" => load_csv(path, &columns),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "loaded {} series ({} metadata columns) from {}",
        dataset.len(),
        dataset.column_names.len(),
        path.display()
    );
    Ok(dataset)
}

/// Assemble a record from per-channel vectors plus metadata.
fn make_record(
    channels: Vec<Vec<f64>>,
    metadata: BTreeMap<String, MetadataValue>,
    row: usize,
) -> Result<SeriesRecord> {
    let series = Series::from_channels(channels).with_context(|| format!("Row {row}"))?;
    Ok(SeriesRecord { series, metadata })
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "values": [0.1, 0.4, ...], "label": 1, "subject": "s01" },
///   ...
/// ]
/// ```
fn load_json(path: &Path, columns: &[&str]) -> Result<SeriesDataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    let mut out = Vec::with_capacity(records.len());
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let metadata = obj
            .iter()
            .filter(|(key, _)| !columns.contains(&key.as_str()))
            .map(|(key, val)| (key.clone(), json_to_metadata(val)))
            .collect();

        if let [column] = columns {
            if is_row_matrix(obj, column) {
                let rows = json_rows(obj.get(*column), i, column)?;
                let series = Series::from_rows(rows).with_context(|| format!("Row {i}"))?;
                out.push(SeriesRecord { series, metadata });
                continue;
            }
        }

        let channels = columns
            .iter()
            .map(|col| json_array_to_f64(obj.get(*col), i, col))
            .collect::<Result<Vec<_>>>()?;
        out.push(make_record(channels, metadata, i)?);
    }

    Ok(SeriesDataset::from_records(out))
}

fn is_row_matrix(obj: &Map<String, JsonValue>, column: &str) -> bool {
    obj.get(column)
        .and_then(JsonValue::as_array)
        .and_then(|arr| arr.first())
        .is_some_and(JsonValue::is_array)
}

fn json_rows(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<Vec<f64>>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;
    arr.iter()
        .enumerate()
        .map(|(t, v)| json_array_to_f64(Some(v), row, &format!("{col}[{t}]")))
        .collect()
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| {
            v.as_f64()
                .with_context(|| format!("Row {row}, {col}[{j}]: not a number"))
        })
        .collect()
}

fn json_to_metadata(val: &JsonValue) -> MetadataValue {
    match val {
        JsonValue::String(s) => MetadataValue::String(s.clone()),
        JsonValue::Number(n) => n
            .as_i64()
            .map(MetadataValue::Integer)
            .or_else(|| n.as_f64().map(MetadataValue::Float))
            .unwrap_or_else(|| MetadataValue::String(n.to_string())),
        JsonValue::Bool(b) => MetadataValue::Bool(*b),
        JsonValue::Null => MetadataValue::Null,
        other => MetadataValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Header row with column names; series cells hold semicolon-separated floats
/// (`"0.12;0.14;0.11"`). All other columns are metadata.
fn load_csv(path: &Path, columns: &[&str]) -> Result<SeriesDataset> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(str::to_string)
        .collect();

    let series_idx = columns
        .iter()
        .map(|col| {
            headers
                .iter()
                .position(|h| h == col)
                .with_context(|| format!("CSV missing '{col}' column"))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut out = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let channels = series_idx
            .iter()
            .zip(columns)
            .map(|(&idx, col)| parse_semicolon_floats(record.get(idx).unwrap_or(""), row_no, col))
            .collect::<Result<Vec<_>>>()?;

        let metadata = record
            .iter()
            .enumerate()
            .filter(|(idx, _)| !series_idx.contains(idx))
            .map(|(idx, value)| (headers[idx].clone(), MetadataValue::parse(value)))
            .collect();

        out.push(make_record(channels, metadata, row_no)?);
    }

    Ok(SeriesDataset::from_records(out))
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Series columns are `List<Float64>` / `LargeList<Float64>` (Float32 inner
/// values are widened). Works with files written by Pandas and Polars.
fn load_parquet(path: &Path, columns: &[&str]) -> Result<SeriesDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut out = Vec::new();
    let mut row_offset = 0;

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let series_idx = columns
            .iter()
            .map(|col| {
                schema
                    .index_of(col)
                    .map_err(|_| anyhow::anyhow!("Parquet file missing '{col}' column"))
            })
            .collect::<Result<Vec<_>>>()?;

        let meta_cols: Vec<(usize, String)> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(i, _)| !series_idx.contains(i))
            .map(|(i, f)| (i, f.name().clone()))
            .collect();

        for row in 0..batch.num_rows() {
            let global_row = row_offset + row;
            let channels = series_idx
                .iter()
                .zip(columns)
                .map(|(&idx, col)| {
                    extract_f64_list(batch.column(idx), row)
                        .with_context(|| format!("Row {global_row}: failed to read '{col}'"))
                })
                .collect::<Result<Vec<_>>>()?;

            let metadata = meta_cols
                .iter()
                .map(|(idx, name)| (name.clone(), extract_metadata_value(batch.column(*idx), row)))
                .collect();

            out.push(make_record(channels, metadata, global_row)?);
        }
        row_offset += batch.num_rows();
    }

    Ok(SeriesDataset::from_records(out))
}

// -- Parquet / Arrow helpers --

/// One list cell as `f64` values. Any numeric inner type is cast to Float64;
/// null cells or null elements are rejected since they would poison every
/// distance computed downstream.
fn extract_f64_list(col: &ArrayRef, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null series");
    }
    let cell = match col.data_type() {
        DataType::List(_) => col.as_list::<i32>().value(row),
        DataType::LargeList(_) => col.as_list::<i64>().value(row),
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };
    if !cell.data_type().is_numeric() {
        bail!("list elements are {:?}, expected numbers", cell.data_type());
    }
    let floats = cast(&cell, &DataType::Float64).context("casting list elements to Float64")?;
    let floats = floats.as_primitive::<Float64Type>();
    if floats.null_count() > 0 {
        bail!("{} null elements in series", floats.null_count());
    }
    Ok(floats.values().to_vec())
}

/// Metadata cell at `row`; unsupported types fall back to their debug name.
fn extract_metadata_value(col: &ArrayRef, row: usize) -> MetadataValue {
    if col.is_null(row) {
        return MetadataValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 => MetadataValue::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => MetadataValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Boolean => MetadataValue::Bool(col.as_boolean().value(row)),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 | DataType::UInt8
        | DataType::UInt16 | DataType::UInt32 => cast(col, &DataType::Int64)
            .map(|a| MetadataValue::Integer(a.as_primitive::<Int64Type>().value(row)))
            .unwrap_or(MetadataValue::Null),
        DataType::Float32 | DataType::Float64 => cast(col, &DataType::Float64)
            .map(|a| MetadataValue::Float(a.as_primitive::<Float64Type>().value(row)))
            .unwrap_or(MetadataValue::Null),
        DataType::Date32 => col
            .as_primitive::<Date32Type>()
            .value_as_date(row)
            .map_or(MetadataValue::Null, |d| MetadataValue::Date(d.to_string())),
        other => MetadataValue::String(format!("{other:?}")),
    }
}
