//! Explanation procedures.
//!
//! ```text
//!   example ──► boundaries ──► PerturbationSampler ──► model.predict
//!                                                          │
//!   Explanation ◄── RidgeSurrogate ◄── Weighter ◄── LabelDecoding
//! ```
//!
//! [`LimeSegment`] finds the boundaries with change-point detection and
//! perturbs toward a spectral background. [`Leftist`] and [`Neves`] are the
//! uniform-segmentation baselines.

pub mod baselines;
pub mod limesegment;

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::data::model::Series;
use crate::data::segments::SegmentBoundaries;
use crate::error::Result;
use crate::model::{Classifier, LabelDecoding};
use crate::perturbation::{Attribution, PerturbedBatch};
use crate::surrogate::RidgeSurrogate;
use crate::weighting::Weighter;

pub use baselines::{Leftist, Neves};
pub use limesegment::LimeSegment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    LimeSegment,
    Leftist,
    Neves,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::LimeSegment => "limesegment",
            Method::Leftist => "leftist",
            Method::Neves => "neves",
        })
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "limesegment" => Ok(Method::LimeSegment),
            "leftist" => Ok(Method::Leftist),
            "neves" => Ok(Method::Neves),
            other => Err(format!(
                "unknown method `{other}`, expected limesegment, leftist or neves"
            )),
        }
    }
}

/// Importance of one interpretable feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub segment: usize,
    /// `None` when the feature switches every channel.
    pub channel: Option<usize>,
    pub start: usize,
    pub end: usize,
    pub coefficient: f64,
}

/// Segment-level attribution of one prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub method: Method,
    pub boundaries: SegmentBoundaries,
    pub attribution: Attribution,
    pub series_len: usize,
    pub channels: usize,
    /// One per segment, or per `(segment, channel)` at index
    /// `segment * channels + channel`.
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Weighted R² of the surrogate on its own samples.
    pub local_fidelity: f64,
    pub sample_count: usize,
}

impl Explanation {
    pub fn segment_count(&self) -> usize {
        self.boundaries.segment_count()
    }

    /// Coefficient of a segment; `channel` only matters for channel-level
    /// attribution.
    pub fn coefficient(&self, segment: usize, channel: Option<usize>) -> Option<f64> {
        let index = match self.attribution {
            Attribution::Segment => segment,
            Attribution::SegmentChannel => segment * self.channels + channel.unwrap_or(0),
        };
        self.coefficients.get(index).copied()
    }

    /// Every feature in coefficient order.
    pub fn features(&self) -> Vec<FeatureImportance> {
        let spans = self.boundaries.spans(self.series_len);
        let per_segment = match self.attribution {
            Attribution::Segment => 1,
            Attribution::SegmentChannel => self.channels,
        };
        self.coefficients
            .iter()
            .enumerate()
            .map(|(i, &coefficient)| {
                let segment = i / per_segment;
                let span = &spans[segment];
                FeatureImportance {
                    segment,
                    channel: match self.attribution {
                        Attribution::Segment => None,
                        Attribution::SegmentChannel => Some(i % per_segment),
                    },
                    start: span.start,
                    end: span.end,
                    coefficient,
                }
            })
            .collect()
    }

    /// Features sorted by decreasing absolute coefficient.
    pub fn ranked(&self) -> Vec<FeatureImportance> {
        let mut features = self.features();
        features.sort_by(|a, b| b.coefficient.abs().total_cmp(&a.coefficient.abs()));
        features
    }

    pub fn most_important(&self) -> Option<FeatureImportance> {
        self.ranked().into_iter().next()
    }
}

/// Seeded generator when a seed is given, entropy otherwise.
pub(crate) fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Everything after sampling: ask the model, weight, and fit.
pub(crate) struct SurrogateStage<'a> {
    pub method: Method,
    pub boundaries: SegmentBoundaries,
    pub attribution: Attribution,
    pub decoding: LabelDecoding,
    pub weighter: &'a dyn Weighter,
    pub ridge: RidgeSurrogate,
}

impl SurrogateStage<'_> {
    pub fn run<M: Classifier + ?Sized>(
        self,
        example: &Series,
        model: &M,
        batch: PerturbedBatch,
    ) -> Result<Explanation> {
        let predictions = model.predict(&batch.samples)?;
        let labels = self.decoding.decode(predictions, batch.len())?;
        let weights = self.weighter.weights(example, &batch)?;
        let fit = self.ridge.fit(&batch.vectors, &labels, &weights)?;

        log::info!(
            "{} explanation: {} segments, {} samples, local fidelity {:.3}",
            self.method,
            self.boundaries.segment_count(),
            batch.len(),
            fit.r_squared
        );
        Ok(Explanation {
            method: self.method,
            boundaries: self.boundaries,
            attribution: self.attribution,
            series_len: example.len(),
            channels: example.channels(),
            coefficients: fit.coefficients,
            intercept: fit.intercept,
            local_fidelity: fit.r_squared,
            sample_count: batch.len(),
        })
    }
}
