//! Proximity weights for perturbed samples.
//!
//! Two kernels, selected by [`DistanceScheme`]:
//! - signal space: DTW between each sample and the original, standardized
//!   over the batch;
//! - interpretable space: Euclidean distance of each interpretable vector
//!   to the all-ones vector.
//!
//! Both give the unperturbed sample the largest possible weight.

pub mod dtw;

use serde::{Deserialize, Serialize};

use crate::data::model::Series;
use crate::error::{ExplainError, Result};
use crate::perturbation::PerturbedBatch;

pub use dtw::dtw_distance;

/// Width used by the segment-based explainer's interpretable kernel.
pub const PRIMARY_KERNEL_WIDTH: f64 = 0.75;
/// Width used by the uniform-segmentation baselines.
pub const BASELINE_KERNEL_WIDTH: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceScheme {
    #[default]
    Dtw,
    Euclidean,
}

pub trait Weighter {
    /// One positive, finite weight per sample of `batch`.
    fn weights(&self, original: &Series, batch: &PerturbedBatch) -> Result<Vec<f64>>;
}

// ---------------------------------------------------------------------------
// Signal space
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct SignalSpaceWeighter {
    radius: Option<usize>,
}

impl SignalSpaceWeighter {
    pub fn new(radius: Option<usize>) -> Self {
        SignalSpaceWeighter { radius }
    }
}

impl Weighter for SignalSpaceWeighter {
    fn weights(&self, original: &Series, batch: &PerturbedBatch) -> Result<Vec<f64>> {
        for sample in &batch.samples {
            original.ensure_same_shape(sample, "perturbed sample")?;
        }
        let distances: Vec<f64> = batch
            .samples
            .iter()
            .map(|sample| dtw_distance(original, sample, self.radius))
            .collect();
        Ok(standardized_kernel(&distances))
    }
}

/// `exp(-max(z, 0))` over the z-scores of `distances`.
///
/// This departs from the symmetric `exp(-|z|)` on purpose: with the
/// symmetric kernel the unperturbed sample (distance 0, negative z) would
/// weigh less than samples near the mean distance. Samples at or below the
/// mean distance all weigh 1. A batch with no spread gets uniform weights.
fn standardized_kernel(distances: &[f64]) -> Vec<f64> {
    let n = distances.len() as f64;
    let mean = distances.iter().sum::<f64>() / n;
    let std = (distances.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n).sqrt();

    if distances.len() < 2 || std == 0.0 || !std.is_finite() {
        log::warn!(
            "DTW distances have no spread over {} samples, using uniform weights",
            distances.len()
        );
        return vec![1.0; distances.len()];
    }
    distances
        .iter()
        .map(|d| (-((d - mean) / std).max(0.0)).exp())
        .collect()
}

// ---------------------------------------------------------------------------
// Interpretable space
// ---------------------------------------------------------------------------

/// `exp(-d² / k)` with `d = ||1 - v||` and `k = width · L²`, where `L` is the
/// number of boundary entries (segment count plus the closing end).
#[derive(Debug, Clone, Copy)]
pub struct InterpretableSpaceWeighter {
    width: f64,
    segment_count: usize,
}

impl InterpretableSpaceWeighter {
    pub fn new(width: f64, segment_count: usize) -> Result<Self> {
        if !(width > 0.0 && width.is_finite()) {
            return Err(ExplainError::invalid(
                "kernel_width",
                format!("must be positive and finite, got {width}"),
            ));
        }
        Ok(InterpretableSpaceWeighter {
            width,
            segment_count,
        })
    }

    fn kernel_scale(&self) -> f64 {
        let l = (self.segment_count + 1) as f64;
        self.width * l * l
    }
}

impl Weighter for InterpretableSpaceWeighter {
    fn weights(&self, _original: &Series, batch: &PerturbedBatch) -> Result<Vec<f64>> {
        let k = self.kernel_scale();
        // Squared distance to all-ones is the number of zero bits.
        Ok(batch
            .vectors
            .iter()
            .map(|v| (-(v.removed() as f64) / k).exp())
            .collect())
    }
}

/// Weighter for a distance scheme, boxed so the explainer can pick at runtime.
pub fn weighter_for(
    scheme: DistanceScheme,
    segment_count: usize,
    dtw_radius: Option<usize>,
) -> Result<Box<dyn Weighter>> {
    Ok(match scheme {
        DistanceScheme::Dtw => Box::new(SignalSpaceWeighter::new(dtw_radius)),
        DistanceScheme::Euclidean => Box::new(InterpretableSpaceWeighter::new(
            PRIMARY_KERNEL_WIDTH,
            segment_count,
        )?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perturbation::InterpretableVector;

    fn batch(vectors: Vec<Vec<bool>>, samples: Vec<Series>) -> PerturbedBatch {
        PerturbedBatch {
            vectors: vectors.into_iter().map(InterpretableVector::new).collect(),
            samples,
        }
    }

    #[test]
    fn identical_sample_gets_maximum_dtw_weight() {
        let original = Series::univariate(vec![0.0, 1.0, 2.0, 3.0]);
        let samples = vec![
            original.clone(),
            Series::univariate(vec![0.0, 1.0, 2.0, 9.0]),
            Series::univariate(vec![5.0, 5.0, 5.0, 5.0]),
        ];
        let b = batch(vec![vec![true]; 3], samples);
        let w = SignalSpaceWeighter::default().weights(&original, &b).unwrap();
        assert_eq!(w[0], 1.0);
        assert!(w.iter().all(|&x| x > 0.0 && x <= 1.0));
    }

    #[test]
    fn kernel_is_one_sided_around_the_mean() {
        // Mean 1, so the zero distance and the mean both weigh 1 where the
        // symmetric kernel would rank the zero distance below the mean.
        let w = standardized_kernel(&[0.0, 1.0, 2.0]);
        assert_eq!(&w[..2], &[1.0, 1.0]);
        let z = 1.0 / (2.0f64 / 3.0).sqrt();
        assert!((w[2] - (-z).exp()).abs() < 1e-12);
    }

    #[test]
    fn no_spread_gives_uniform_weights() {
        assert_eq!(standardized_kernel(&[2.0, 2.0, 2.0]), vec![1.0; 3]);
        assert_eq!(standardized_kernel(&[4.0]), vec![1.0]);
    }

    #[test]
    fn interpretable_kernel_follows_removed_bits() {
        let original = Series::univariate(vec![0.0; 4]);
        let b = batch(
            vec![vec![true, true, true], vec![false, true, true], vec![false, false, false]],
            vec![original.clone(); 3],
        );
        let weighter = InterpretableSpaceWeighter::new(1.0, 3).unwrap();
        let w = weighter.weights(&original, &b).unwrap();
        assert_eq!(w[0], 1.0);
        assert!((w[1] - (-1.0f64 / 16.0).exp()).abs() < 1e-12);
        assert!((w[2] - (-3.0f64 / 16.0).exp()).abs() < 1e-12);
    }

    #[test]
    fn primary_width_is_narrower() {
        let original = Series::univariate(vec![0.0; 4]);
        let b = batch(vec![vec![false, true]], vec![original.clone()]);
        let primary = weighter_for(DistanceScheme::Euclidean, 2, None).unwrap();
        let baseline = InterpretableSpaceWeighter::new(BASELINE_KERNEL_WIDTH, 2).unwrap();
        let wp = primary.weights(&original, &b).unwrap()[0];
        let wb = baseline.weights(&original, &b).unwrap()[0];
        assert!(wp < wb);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let original = Series::univariate(vec![0.0; 4]);
        let b = batch(vec![vec![true]], vec![Series::univariate(vec![0.0; 3])]);
        assert!(matches!(
            SignalSpaceWeighter::default().weights(&original, &b),
            Err(ExplainError::Shape { .. })
        ));
    }

    #[test]
    fn scheme_parses_lowercase() {
        let s: DistanceScheme = serde_json::from_str("\"euclidean\"").unwrap();
        assert_eq!(s, DistanceScheme::Euclidean);
    }
}
