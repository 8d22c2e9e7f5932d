use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Builder, Int64Array, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SERIES_LEN: usize = 100;
const SERIES_PER_CLASS: usize = 20;

/// Box-Muller transform for a normal draw.
fn gauss<R: Rng>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    let u1 = rng.gen::<f64>().max(1e-15);
    let u2 = rng.gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
    mean + std_dev * z
}

/// Noisy sine; from `shift` on, the level and amplitude jump.
fn generate_series<R: Rng>(rng: &mut R, period: f64, shift: Option<usize>) -> Vec<f64> {
    (0..SERIES_LEN)
        .map(|t| {
            let wave = (std::f64::consts::TAU * t as f64 / period).sin();
            let level = match shift {
                Some(s) if t >= s => 3.0 + 2.0 * wave,
                _ => 0.5 * wave,
            };
            level + gauss(rng, 0.0, 0.05)
        })
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_series.parquet".to_string());
    let mut rng = StdRng::seed_from_u64(42);

    let subjects = ["s01", "s02", "s03", "s04"];

    let mut all_values: Vec<Vec<f64>> = Vec::new();
    let mut all_label: Vec<i64> = Vec::new();
    let mut all_shift: Vec<Option<i64>> = Vec::new();
    let mut all_subject: Vec<&str> = Vec::new();
    let mut all_id: Vec<i64> = Vec::new();

    for label in [0i64, 1] {
        for k in 0..SERIES_PER_CLASS {
            let period = rng.gen_range(8.0..14.0);
            let shift = (label == 1).then(|| rng.gen_range(30..70));
            all_values.push(generate_series(&mut rng, period, shift));
            all_label.push(label);
            all_shift.push(shift.map(|s| s as i64));
            all_subject.push(subjects[k % subjects.len()]);
            all_id.push(all_id.len() as i64);
        }
    }

    let mut values_builder = ListBuilder::new(Float64Builder::new());
    for row in &all_values {
        values_builder.values().append_slice(row);
        values_builder.append(true);
    }
    let values_array = values_builder.finish();

    let schema = Arc::new(Schema::new(vec![
        Field::new(
            "values",
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        ),
        Field::new("label", DataType::Int64, false),
        Field::new("shift_start", DataType::Int64, true),
        Field::new("subject", DataType::Utf8, false),
        Field::new("series_id", DataType::Int64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(values_array),
            Arc::new(Int64Array::from(all_label)),
            Arc::new(Int64Array::from(all_shift)),
            Arc::new(StringArray::from(all_subject)),
            Arc::new(Int64Array::from(all_id.clone())),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(&output_path)
        .with_context(|| format!("creating {output_path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;

    let preview = pretty_format_batches(&[batch.slice(0, 3)]).context("formatting preview")?;
    log::info!("first rows:\n{preview}");
    println!(
        "Wrote {} series ({SERIES_LEN} timesteps each) to {output_path}",
        all_id.len()
    );
    Ok(())
}
