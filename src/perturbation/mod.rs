//! Perturbation sampling: interpretable vectors and the series they stand for.

pub mod strategy;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::data::model::Series;
use crate::data::segments::SegmentBoundaries;
use crate::error::Result;

pub use strategy::{BackgroundSplice, PoolSplice, ReplacementStrategy, SegmentMeanFill};

/// Granularity of the interpretable features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribution {
    /// One bit per segment, switching all channels together.
    #[default]
    Segment,
    /// One bit per (segment, channel); bit `s * channels + c`.
    SegmentChannel,
}

impl Attribution {
    pub fn feature_count(self, segments: usize, channels: usize) -> usize {
        match self {
            Attribution::Segment => segments,
            Attribution::SegmentChannel => segments * channels,
        }
    }
}

/// Binary mask over the interpretable features: `true` keeps the original
/// data, `false` hands it to the replacement strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterpretableVector {
    bits: Vec<bool>,
}

impl InterpretableVector {
    pub fn new(bits: Vec<bool>) -> Self {
        InterpretableVector { bits }
    }

    /// Nothing removed.
    pub fn ones(len: usize) -> Self {
        InterpretableVector {
            bits: vec![true; len],
        }
    }

    /// Independent fair coin per bit.
    pub fn random<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Self {
        InterpretableVector {
            bits: (0..len).map(|_| rng.gen_bool(0.5)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn is_retained(&self, i: usize) -> bool {
        self.bits[i]
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// 0/1 row of the surrogate's design matrix.
    pub fn as_features(&self) -> Vec<f64> {
        self.bits.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect()
    }

    /// Number of replaced features.
    pub fn removed(&self) -> usize {
        self.bits.iter().filter(|&&b| !b).count()
    }
}

/// Generated samples, aligned by index with their interpretable vectors.
#[derive(Debug, Clone, Default)]
pub struct PerturbedBatch {
    pub vectors: Vec<InterpretableVector>,
    pub samples: Vec<Series>,
}

impl PerturbedBatch {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Turns interpretable vectors into full-length series by handing every
/// switched-off feature to a [`ReplacementStrategy`].
#[derive(Debug, Clone)]
pub struct PerturbationSampler<'a, S> {
    boundaries: &'a SegmentBoundaries,
    strategy: S,
    attribution: Attribution,
}

impl<'a, S: ReplacementStrategy> PerturbationSampler<'a, S> {
    pub fn new(boundaries: &'a SegmentBoundaries, strategy: S) -> Self {
        PerturbationSampler {
            boundaries,
            strategy,
            attribution: Attribution::Segment,
        }
    }

    pub fn with_attribution(mut self, attribution: Attribution) -> Self {
        self.attribution = attribution;
        self
    }

    pub fn feature_count(&self, channels: usize) -> usize {
        self.attribution
            .feature_count(self.boundaries.segment_count(), channels)
    }

    /// Copy of `original` with every switched-off feature replaced.
    pub fn materialize<R: RngCore>(
        &self,
        original: &Series,
        vector: &InterpretableVector,
        rng: &mut R,
    ) -> Series {
        let mut sample = original.clone();
        let channels = original.channels();
        for (segment, span) in self.boundaries.spans(original.len()).into_iter().enumerate() {
            match self.attribution {
                Attribution::Segment => {
                    if !vector.is_retained(segment) {
                        self.strategy.replace(&mut sample, segment, span, None, rng);
                    }
                }
                Attribution::SegmentChannel => {
                    for c in 0..channels {
                        if !vector.is_retained(segment * channels + c) {
                            self.strategy
                                .replace(&mut sample, segment, span.clone(), Some(c), rng);
                        }
                    }
                }
            }
        }
        sample
    }

    /// Draw `count` interpretable vectors from `rng` and materialize each.
    pub fn generate<R: RngCore>(
        &self,
        original: &Series,
        count: usize,
        rng: &mut R,
    ) -> Result<PerturbedBatch> {
        self.strategy.validate(original, self.boundaries)?;
        let features = self.feature_count(original.channels());

        let mut batch = PerturbedBatch {
            vectors: Vec::with_capacity(count),
            samples: Vec::with_capacity(count),
        };
        for _ in 0..count {
            let vector = InterpretableVector::random(features, rng);
            batch.samples.push(self.materialize(original, &vector, rng));
            batch.vectors.push(vector);
        }
        log::debug!(
            "generated {count} perturbed samples over {features} interpretable features"
        );
        Ok(batch)
    }
}

/// Background-splice sampling in one call.
pub fn generate<R: RngCore>(
    series: &Series,
    boundaries: &SegmentBoundaries,
    background: &Series,
    count: usize,
    rng: &mut R,
) -> Result<PerturbedBatch> {
    PerturbationSampler::new(boundaries, BackgroundSplice::new(background))
        .generate(series, count, rng)
}
