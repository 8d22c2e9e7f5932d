use std::io::Write;
use std::sync::Arc;

use arrow::array::{Float64Builder, Int64Array, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use lime_segment::data::filter::{background_pool, parse_predicates};
use lime_segment::data::loader::load_file;
use lime_segment::data::MetadataValue;
use parquet::arrow::ArrowWriter;

fn temp_with_suffix(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn json_records_with_metadata() {
    let file = temp_with_suffix(
        ".json",
        r#"[
            {"values": [1.0, 2.0, 3.0], "label": 0, "site": "a"},
            {"values": [4.0, 5.0, 6.0], "label": 1, "site": null}
        ]"#,
    );
    let ds = load_file(file.path(), &["values"]).unwrap();
    assert_eq!(ds.len(), 2);
    assert_eq!(ds.records[1].series.values(), &[4.0, 5.0, 6.0]);
    assert_eq!(ds.records[0].metadata["site"], MetadataValue::String("a".into()));
    assert_eq!(ds.records[1].metadata["site"], MetadataValue::Null);
    assert_eq!(ds.column_names, vec!["label".to_string(), "site".to_string()]);
}

#[test]
fn json_row_matrix_is_multivariate() {
    let file = temp_with_suffix(".json", r#"[{"values": [[1, 10], [2, 20], [3, 30]]}]"#);
    let ds = load_file(file.path(), &["values"]).unwrap();
    let s = &ds.records[0].series;
    assert_eq!((s.len(), s.channels()), (3, 2));
    assert_eq!(s.channel(1), vec![10.0, 20.0, 30.0]);
}

#[test]
fn csv_columns_become_channels() {
    let file = temp_with_suffix(
        ".csv",
        "a,b,label\n\"1;2;3\",\"4;5;6\",1\n\"7;8;9\",\"0;0;0\",0\n",
    );
    let ds = load_file(file.path(), &["a", "b"]).unwrap();
    assert_eq!(ds.len(), 2);
    let s = &ds.records[0].series;
    assert_eq!(s.channels(), 2);
    assert_eq!(s.row(1), &[2.0, 5.0]);
    assert_eq!(ds.records[1].metadata["label"], MetadataValue::Integer(0));
}

#[test]
fn ragged_channels_are_rejected() {
    let file = temp_with_suffix(".csv", "a,b\n\"1;2;3\",\"4;5\"\n");
    assert!(load_file(file.path(), &["a", "b"]).is_err());
}

#[test]
fn unsupported_extension_is_rejected() {
    let file = temp_with_suffix(".txt", "");
    let err = load_file(file.path(), &["values"]).unwrap_err();
    assert!(err.to_string().contains("Unsupported"), "{err}");
}

#[test]
fn parquet_round_trip_and_pool_selection() {
    let mut values = ListBuilder::new(Float64Builder::new());
    for row in [[0.0, 1.0, 2.0], [3.0, 4.0, 5.0], [6.0, 7.0, 8.0]] {
        values.values().append_slice(&row);
        values.append(true);
    }
    let schema = Arc::new(Schema::new(vec![
        Field::new(
            "values",
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        ),
        Field::new("label", DataType::Int64, false),
        Field::new("subject", DataType::Utf8, false),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(values.finish()),
            Arc::new(Int64Array::from(vec![0, 1, 0])),
            Arc::new(StringArray::from(vec!["s1", "s2", "s3"])),
        ],
    )
    .unwrap();

    let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
    let mut writer = ArrowWriter::try_new(file.reopen().unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    let ds = load_file(file.path(), &["values"]).unwrap();
    assert_eq!(ds.len(), 3);
    assert_eq!(ds.records[2].series.values(), &[6.0, 7.0, 8.0]);

    // Label-0 pool for record 0 leaves only record 2.
    let filters = parse_predicates(&["label=0"]).unwrap();
    let pool = background_pool(&ds, &filters, Some(0));
    assert_eq!(pool.len(), 1);
    assert_eq!(pool[0].values(), &[6.0, 7.0, 8.0]);
}
