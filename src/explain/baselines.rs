use rand::RngCore;

use crate::config::BaselineConfig;
use crate::data::model::Series;
use crate::data::segments::SegmentBoundaries;
use crate::error::Result;
use crate::model::Classifier;
use crate::perturbation::{PerturbationSampler, PoolSplice, ReplacementStrategy, SegmentMeanFill};
use crate::surrogate::RidgeSurrogate;
use crate::weighting::{InterpretableSpaceWeighter, BASELINE_KERNEL_WIDTH};

use super::{rng_from_seed, Explanation, Method, SurrogateStage};

// ---------------------------------------------------------------------------
// LEFTIST: uniform segments, spans copied from random pool members
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Leftist<'a> {
    config: BaselineConfig,
    pool: &'a [Series],
}

impl<'a> Leftist<'a> {
    pub fn new(config: BaselineConfig, pool: &'a [Series]) -> Self {
        Leftist { config, pool }
    }

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
        self.config.validate()?;
        let boundaries = SegmentBoundaries::uniform(example.len(), self.config.segment_count)?;
        let strategy = PoolSplice::new(self.pool)?;
        run_baseline(Method::Leftist, &self.config, example, model, boundaries, strategy, rng)
    }
}

// ---------------------------------------------------------------------------
// NEVES: uniform segments, filled with the pool's per-segment means
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Neves<'a> {
    config: BaselineConfig,
    pool: &'a [Series],
}

impl<'a> Neves<'a> {
    pub fn new(config: BaselineConfig, pool: &'a [Series]) -> Self {
        Neves { config, pool }
    }

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
        self.config.validate()?;
        let boundaries = SegmentBoundaries::uniform(example.len(), self.config.segment_count)?;
        let strategy = SegmentMeanFill::from_pool(self.pool, &boundaries)?;
        run_baseline(Method::Neves, &self.config, example, model, boundaries, strategy, rng)
    }
}

fn run_baseline<M, S, R>(
    method: Method,
    config: &BaselineConfig,
    example: &Series,
    model: &M,
    boundaries: SegmentBoundaries,
    strategy: S,
    rng: &mut R,
) -> Result<Explanation>
where
    M: Classifier + ?Sized,
    S: ReplacementStrategy,
    R: RngCore,
{
    log::debug!(
        "{method}: {} uniform segments over {} timesteps",
        boundaries.segment_count(),
        example.len()
    );
    let batch = PerturbationSampler::new(&boundaries, strategy).generate(
        example,
        config.sample_count,
        rng,
    )?;
    let weighter =
        InterpretableSpaceWeighter::new(BASELINE_KERNEL_WIDTH, boundaries.segment_count())?;

    SurrogateStage {
        method,
        attribution: Default::default(),
        decoding: config.model_type,
        weighter: &weighter,
        ridge: RidgeSurrogate::new(config.ridge_alpha),
        boundaries,
    }
    .run(example, model, batch)
}
