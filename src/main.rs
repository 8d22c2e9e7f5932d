use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};

use lime_segment::data::filter::{background_pool, parse_predicates};
use lime_segment::data::loader::load_file;
use lime_segment::{
    BaselineConfig, DistanceScheme, ExplainConfig, Explanation, LabelDecoding, Leftist,
    LimeSegment, Method, Neves, ThresholdClassifier,
};

/// Explain a threshold classifier's prediction on one series of a dataset.
#[derive(Parser, Debug)]
#[command(name = "lime-segment", version, about, long_about = None)]
struct Cli {
    /// Dataset file (.parquet, .json or .csv)
    file: PathBuf,

    /// Column(s) holding series values; several columns give several channels
    #[arg(short, long = "column", default_value = "values")]
    columns: Vec<String>,

    /// Record to explain
    #[arg(short, long, default_value_t = 0)]
    index: usize,

    /// Explanation method: limesegment, leftist or neves
    #[arg(short, long, default_value = "limesegment")]
    method: Method,

    /// JSON configuration file; flags below override it
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Class 1 when the series maximum exceeds this value
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    threshold: f64,

    /// Let the classifier emit class probabilities instead of labels
    #[arg(long)]
    proba: bool,

    /// How predictions become regression targets: class, proba or a column index
    #[arg(long)]
    model_type: Option<LabelDecoding>,

    /// Background pool predicate `column=value` (baselines only, repeatable)
    #[arg(short = 'w', long = "where")]
    predicates: Vec<String>,

    #[arg(long)]
    seed: Option<u64>,

    /// Number of perturbed samples
    #[arg(long)]
    samples: Option<usize>,

    #[arg(long)]
    window_size: Option<usize>,

    #[arg(long)]
    change_points: Option<usize>,

    #[arg(long)]
    nperseg: Option<usize>,

    #[arg(long)]
    distance: Option<Distance>,

    /// Uniform segment count of the baselines
    #[arg(long)]
    segments: Option<usize>,

    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Write here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Distance {
    Dtw,
    Euclidean,
}

impl From<Distance> for DistanceScheme {
    fn from(d: Distance) -> Self {
        match d {
            Distance::Dtw => DistanceScheme::Dtw,
            Distance::Euclidean => DistanceScheme::Euclidean,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    /// Full explanation object
    Json,
    /// One row per feature, most important first
    Csv,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let dataset = load_file(&cli.file, &cli.columns)?;
    let record = dataset.get(cli.index).with_context(|| {
        format!(
            "record {} requested but {} holds {} records",
            cli.index,
            cli.file.display(),
            dataset.len()
        )
    })?;
    let example = &record.series;
    log::info!("explaining record {} ({})", cli.index, example.shape_label());
    for (column, value) in &record.metadata {
        log::debug!("  {column} = {value}");
    }

    let model = ThresholdClassifier::new(cli.threshold).with_probabilities(cli.proba);
    let model_type = cli.model_type.or(cli.proba.then_some(LabelDecoding::Proba));

    let explanation = match cli.method {
        Method::LimeSegment => {
            let config = explain_config(&cli, model_type)?;
            LimeSegment::new(config).explain(example, &model)?
        }
        Method::Leftist | Method::Neves => {
            let config = baseline_config(&cli, model_type)?;
            let filters = parse_predicates(&cli.predicates)?;
            let pool = background_pool(&dataset, &filters, Some(cli.index));
            if pool.is_empty() {
                bail!("no background series left after applying {:?}", cli.predicates);
            }
            log::info!("background pool of {} series", pool.len());
            match cli.method {
                Method::Leftist => Leftist::new(config, &pool).explain(example, &model)?,
                _ => Neves::new(config, &pool).explain(example, &model)?,
            }
        }
    };

    let out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    write_explanation(&explanation, cli.format, out)
}

fn explain_config(cli: &Cli, model_type: Option<LabelDecoding>) -> Result<ExplainConfig> {
    let mut config = match &cli.config {
        Some(path) => ExplainConfig::from_json_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => ExplainConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.random_seed = Some(seed);
    }
    if let Some(n) = cli.samples {
        config.sample_count = n;
    }
    if let Some(w) = cli.window_size {
        config.window_size = Some(w);
    }
    if let Some(cp) = cli.change_points {
        config.change_points = cp;
    }
    if let Some(n) = cli.nperseg {
        config.nperseg = Some(n);
    }
    if let Some(d) = cli.distance {
        config.distance = d.into();
    }
    if let Some(m) = model_type {
        config.model_type = m;
    }
    Ok(config)
}

fn baseline_config(cli: &Cli, model_type: Option<LabelDecoding>) -> Result<BaselineConfig> {
    let mut config = match &cli.config {
        Some(path) => BaselineConfig::from_json_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => BaselineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.random_seed = Some(seed);
    }
    if let Some(n) = cli.samples {
        config.sample_count = n;
    }
    if let Some(k) = cli.segments {
        config.segment_count = k;
    }
    if let Some(m) = model_type {
        config.model_type = m;
    }
    Ok(config)
}

fn write_explanation(
    explanation: &Explanation,
    format: Format,
    mut out: Box<dyn Write>,
) -> Result<()> {
    match format {
        Format::Json => {
            serde_json::to_writer_pretty(&mut out, explanation)?;
            writeln!(out)?;
        }
        Format::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for feature in explanation.ranked() {
                writer.serialize(feature)?;
            }
            writer.flush()?;
            return Ok(());
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn columns_and_config_have_distinct_short_flags() {
        let cli = Cli::try_parse_from([
            "lime-segment",
            "data.json",
            "-c",
            "a",
            "-c",
            "b",
            "-C",
            "config.json",
        ])
        .unwrap();
        assert_eq!(cli.columns, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(cli.config, Some(PathBuf::from("config.json")));
    }
}
