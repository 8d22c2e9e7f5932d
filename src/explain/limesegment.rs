use rand::RngCore;

use crate::config::ExplainConfig;
use crate::data::model::Series;
use crate::error::Result;
use crate::model::Classifier;
use crate::perturbation::{BackgroundSplice, PerturbationSampler};
use crate::segmentation::ChangePointDetector;
use crate::spectral::SpectralBackgroundExtractor;
use crate::surrogate::RidgeSurrogate;
use crate::weighting::weighter_for;

use super::{rng_from_seed, Explanation, Method, SurrogateStage};

/// Change-point segmentation, spectral background, surrogate fit.
#[derive(Debug, Clone, Default)]
pub struct LimeSegment {
    config: ExplainConfig,
}

impl LimeSegment {
    pub fn new(config: ExplainConfig) -> Self {
        LimeSegment { config }
    }

    /// Explain `model`'s prediction on `example`, drawing samples from the
    /// configured seed (or entropy).
    pub fn explain<M: Classifier + ?Sized>(
        &self,
        example: &Series,
        model: &M,
    ) -> Result<Explanation> {
        let mut rng = rng_from_seed(self.config.random_seed);
        self.explain_with_rng(example, model, &mut rng)
    }

    pub fn explain_with_rng<M: Classifier + ?Sized, R: RngCore>(
        &self,
        example: &Series,
        model: &M,
        rng: &mut R,
    ) -> Result<Explanation> {
        let cfg = &self.config;
        let windows = cfg.resolve(example.len())?;
        log::debug!(
            "explaining {} series: window {}, nperseg {}, {} change points",
            example.shape_label(),
            windows.window_size,
            windows.nperseg,
            cfg.change_points
        );

        let boundaries =
            ChangePointDetector::new(windows.window_size).detect(example, cfg.change_points)?;
        log::debug!("segment starts {:?}", boundaries.starts());

        let background = SpectralBackgroundExtractor::new(windows.nperseg).extract(example)?;

        let batch = PerturbationSampler::new(&boundaries, BackgroundSplice::new(&background))
            .with_attribution(cfg.attribution)
            .generate(example, cfg.sample_count, rng)?;

        let weighter = weighter_for(cfg.distance, boundaries.segment_count(), cfg.dtw_radius)?;
        SurrogateStage {
            method: Method::LimeSegment,
            boundaries,
            attribution: cfg.attribution,
            decoding: cfg.model_type,
            weighter: weighter.as_ref(),
            ridge: RidgeSurrogate::new(cfg.ridge_alpha),
        }
        .run(example, model, batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExplainError;
    use crate::model::{LabelDecoding, Predictions, ThresholdClassifier};
    use crate::perturbation::Attribution;
    use crate::weighting::DistanceScheme;

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|t| {
                let base = (t as f64 * std::f64::consts::TAU / 10.0).sin();
                if t >= 50 {
                    3.0 + 2.0 * base
                } else {
                    0.5 * base + 0.02 * ((t * 7919) % 13) as f64
                }
            })
            .collect()
    }

    fn config(seed: u64) -> ExplainConfig {
        ExplainConfig {
            window_size: Some(20),
            change_points: 2,
            sample_count: 40,
            random_seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn seeded_explanations_are_reproducible() {
        let example = Series::univariate(wave(100));
        let model = ThresholdClassifier::new(4.5);
        let a = LimeSegment::new(config(3)).explain(&example, &model).unwrap();
        let b = LimeSegment::new(config(3)).explain(&example, &model).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.coefficients.len(), a.segment_count());
        assert_eq!(a.sample_count, 40);
    }

    #[test]
    fn euclidean_weighting_and_probabilities() {
        let example = Series::univariate(wave(100));
        let model = ThresholdClassifier::new(4.5).with_probabilities(true);
        let cfg = ExplainConfig {
            distance: DistanceScheme::Euclidean,
            model_type: LabelDecoding::Column(1),
            ..config(5)
        };
        let e = LimeSegment::new(cfg).explain(&example, &model).unwrap();
        assert!(e.coefficients.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn channel_attribution_doubles_features() {
        let inverted = wave(100).iter().map(|v| -v).collect();
        let example = Series::from_channels(vec![wave(100), inverted]).unwrap();
        let cfg = ExplainConfig {
            attribution: Attribution::SegmentChannel,
            ..config(1)
        };
        let e = LimeSegment::new(cfg)
            .explain(&example, &ThresholdClassifier::new(4.5))
            .unwrap();
        assert_eq!(e.coefficients.len(), 2 * e.segment_count());
    }

    #[test]
    fn model_errors_pass_through() {
        let example = Series::univariate(wave(100));
        let failing =
            |_: &[Series]| -> anyhow::Result<Predictions> { anyhow::bail!("model offline") };
        let err = LimeSegment::new(config(0)).explain(&example, &failing).unwrap_err();
        assert!(matches!(err, ExplainError::Model(_)));
        assert_eq!(err.to_string(), "model offline");
    }
}
