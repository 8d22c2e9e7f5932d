use serde::{Deserialize, Serialize};

use crate::data::model::Series;
use crate::error::{ExplainError, Result};

/// Raw output of a black-box model for a batch of series.
#[derive(Debug, Clone, PartialEq)]
pub enum Predictions {
    /// One class label (or score) per series.
    Labels(Vec<f64>),
    /// One row of class probabilities per series.
    Probabilities(Vec<Vec<f64>>),
}

impl Predictions {
    pub fn len(&self) -> usize {
        match self {
            Predictions::Labels(v) => v.len(),
            Predictions::Probabilities(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The model being explained. Only prediction is required.
pub trait Classifier {
    fn predict(&self, batch: &[Series]) -> anyhow::Result<Predictions>;
}

impl<F> Classifier for F
where
    F: Fn(&[Series]) -> anyhow::Result<Predictions>,
{
    fn predict(&self, batch: &[Series]) -> anyhow::Result<Predictions> {
        self(batch)
    }
}

/// How model output becomes the scalar regression target of the surrogate.
///
/// JSON form: `"class"`, `"proba"`, or a column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "LabelDecodingRepr", into = "LabelDecodingRepr")]
pub enum LabelDecoding {
    /// Labels are used as they are.
    #[default]
    Class,
    /// Index of the most probable class.
    Proba,
    /// Probability of one class.
    Column(usize),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LabelDecodingRepr {
    Name(String),
    Column(usize),
}

impl TryFrom<LabelDecodingRepr> for LabelDecoding {
    type Error = String;

    fn try_from(repr: LabelDecodingRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            LabelDecodingRepr::Name(name) => match name.as_str() {
                "class" => Ok(LabelDecoding::Class),
                "proba" => Ok(LabelDecoding::Proba),
                other => Err(format!(
                    "unknown model type `{other}`, expected \"class\", \"proba\" or a column index"
                )),
            },
            LabelDecodingRepr::Column(k) => Ok(LabelDecoding::Column(k)),
        }
    }
}

impl From<LabelDecoding> for LabelDecodingRepr {
    fn from(decoding: LabelDecoding) -> Self {
        match decoding {
            LabelDecoding::Class => LabelDecodingRepr::Name("class".to_string()),
            LabelDecoding::Proba => LabelDecodingRepr::Name("proba".to_string()),
            LabelDecoding::Column(k) => LabelDecodingRepr::Column(k),
        }
    }
}

impl std::str::FromStr for LabelDecoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.parse::<usize>() {
            Ok(k) => Ok(LabelDecoding::Column(k)),
            Err(_) => LabelDecoding::try_from(LabelDecodingRepr::Name(s.to_string())),
        }
    }
}

impl LabelDecoding {
    /// One scalar per sample; `expected` is the batch size.
    pub fn decode(self, predictions: Predictions, expected: usize) -> Result<Vec<f64>> {
        if predictions.len() != expected {
            return Err(ExplainError::shape(
                format!("{expected} predictions"),
                format!("{} predictions", predictions.len()),
            ));
        }
        match (self, predictions) {
            (LabelDecoding::Class, Predictions::Labels(labels)) => Ok(labels),
            (LabelDecoding::Class, Predictions::Probabilities(_)) => Err(ExplainError::shape(
                "one label per sample",
                "a probability matrix (use model type \"proba\" or a column index)",
            )),
            (LabelDecoding::Proba, Predictions::Probabilities(rows)) => rows
                .iter()
                .map(|row| {
                    row.iter()
                        .enumerate()
                        .fold(None, |best: Option<(usize, f64)>, (k, &p)| match best {
                            Some((_, bp)) if bp >= p => best,
                            _ => Some((k, p)),
                        })
                        .map(|(k, _)| k as f64)
                        .ok_or_else(|| {
                            ExplainError::shape("at least one class", "an empty probability row")
                        })
                })
                .collect(),
            (LabelDecoding::Column(k), Predictions::Probabilities(rows)) => rows
                .iter()
                .map(|row| {
                    row.get(k).copied().ok_or_else(|| {
                        ExplainError::shape(
                            format!("more than {k} classes"),
                            format!("{} classes", row.len()),
                        )
                    })
                })
                .collect(),
            (_, Predictions::Labels(_)) => Err(ExplainError::shape(
                "a probability matrix",
                "one label per sample (use model type \"class\")",
            )),
        }
    }
}

/// Predicts class 1 when the largest value of a series exceeds a threshold.
///
/// The built-in model of the command line tool and the tests.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdClassifier {
    threshold: f64,
    probabilities: bool,
}

impl ThresholdClassifier {
    pub fn new(threshold: f64) -> Self {
        ThresholdClassifier {
            threshold,
            probabilities: false,
        }
    }

    /// Emit one-hot `[p(0), p(1)]` rows instead of labels.
    pub fn with_probabilities(mut self, probabilities: bool) -> Self {
        self.probabilities = probabilities;
        self
    }

    fn label(&self, series: &Series) -> f64 {
        if series.max() > self.threshold {
            1.0
        } else {
            0.0
        }
    }
}

impl Classifier for ThresholdClassifier {
    fn predict(&self, batch: &[Series]) -> anyhow::Result<Predictions> {
        let labels = batch.iter().map(|s| self.label(s));
        Ok(if self.probabilities {
            Predictions::Probabilities(labels.map(|l| vec![1.0 - l, l]).collect())
        } else {
            Predictions::Labels(labels.collect())
        })
    }
}
