use std::ops::Range;

use rand::{Rng, RngCore};

use crate::data::model::Series;
use crate::data::segments::SegmentBoundaries;
use crate::error::{ExplainError, Result};

/// How a switched-off segment is filled in.
///
/// `channel == None` means the whole span on every channel; `Some(c)` limits
/// the replacement to one channel (channel-level attribution).
pub trait ReplacementStrategy {
    /// Shape checks against the series being explained, run once per batch.
    fn validate(&self, original: &Series, boundaries: &SegmentBoundaries) -> Result<()>;

    fn replace(
        &self,
        target: &mut Series,
        segment: usize,
        span: Range<usize>,
        channel: Option<usize>,
        rng: &mut dyn RngCore,
    );
}

// ---------------------------------------------------------------------------
// Background splice: copy the span from a precomputed background signal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct BackgroundSplice<'a> {
    background: &'a Series,
}

impl<'a> BackgroundSplice<'a> {
    pub fn new(background: &'a Series) -> Self {
        BackgroundSplice { background }
    }
}

impl ReplacementStrategy for BackgroundSplice<'_> {
    fn validate(&self, original: &Series, _boundaries: &SegmentBoundaries) -> Result<()> {
        original.ensure_same_shape(self.background, "background")
    }

    fn replace(
        &self,
        target: &mut Series,
        _segment: usize,
        span: Range<usize>,
        channel: Option<usize>,
        _rng: &mut dyn RngCore,
    ) {
        target.copy_span_from(self.background, span, channel);
    }
}

// ---------------------------------------------------------------------------
// Pool splice: copy the span from a randomly chosen background example
// ---------------------------------------------------------------------------

/// Each replaced segment draws its own pool member, uniformly.
#[derive(Debug, Clone, Copy)]
pub struct PoolSplice<'a> {
    pool: &'a [Series],
}

impl<'a> PoolSplice<'a> {
    pub fn new(pool: &'a [Series]) -> Result<Self> {
        if pool.is_empty() {
            return Err(ExplainError::invalid("background_pool", "pool is empty"));
        }
        Ok(PoolSplice { pool })
    }
}

impl ReplacementStrategy for PoolSplice<'_> {
    fn validate(&self, original: &Series, _boundaries: &SegmentBoundaries) -> Result<()> {
        self.pool
            .iter()
            .try_for_each(|member| original.ensure_same_shape(member, "background pool member"))
    }

    fn replace(
        &self,
        target: &mut Series,
        _segment: usize,
        span: Range<usize>,
        channel: Option<usize>,
        rng: &mut dyn RngCore,
    ) {
        let donor = &self.pool[rng.gen_range(0..self.pool.len())];
        target.copy_span_from(donor, span, channel);
    }
}

// ---------------------------------------------------------------------------
// Segment-mean fill: constant per segment and channel, averaged over a pool
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentMeanFill {
    /// `means[segment][channel]`
    means: Vec<Vec<f64>>,
}

impl SegmentMeanFill {
    /// Average each segment span over every pool member (computed once).
    pub fn from_pool(pool: &[Series], boundaries: &SegmentBoundaries) -> Result<Self> {
        let first = pool
            .first()
            .ok_or_else(|| ExplainError::invalid("background_pool", "pool is empty"))?;
        pool.iter()
            .try_for_each(|member| first.ensure_same_shape(member, "background pool member"))?;

        let spans = boundaries.spans(first.len());
        let means = spans
            .iter()
            .map(|span| {
                (0..first.channels())
                    .map(|c| {
                        if span.is_empty() {
                            return 0.0;
                        }
                        let total: f64 = pool
                            .iter()
                            .map(|member| span.clone().map(|t| member.value(t, c)).sum::<f64>())
                            .sum();
                        total / (pool.len() * span.len()) as f64
                    })
                    .collect()
            })
            .collect();
        Ok(SegmentMeanFill { means })
    }

    pub fn means(&self) -> &[Vec<f64>] {
        &self.means
    }
}

impl ReplacementStrategy for SegmentMeanFill {
    fn validate(&self, original: &Series, boundaries: &SegmentBoundaries) -> Result<()> {
        if self.means.len() != boundaries.segment_count() {
            return Err(ExplainError::shape(
                format!("{} segments", boundaries.segment_count()),
                format!("means for {} segments", self.means.len()),
            ));
        }
        match self.means.first() {
            Some(row) if row.len() != original.channels() => Err(ExplainError::shape(
                format!("{} channels", original.channels()),
                format!("means for {} channels", row.len()),
            )),
            _ => Ok(()),
        }
    }

    fn replace(
        &self,
        target: &mut Series,
        segment: usize,
        span: Range<usize>,
        channel: Option<usize>,
        _rng: &mut dyn RngCore,
    ) {
        let means = &self.means[segment];
        match channel {
            Some(c) => target.fill_span(span, c, means[c]),
            None => {
                for (c, &mean) in means.iter().enumerate() {
                    target.fill_span(span.clone(), c, mean);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn segment_means_average_over_pool_and_span() {
        let pool = vec![
            Series::univariate(vec![1.0, 1.0, 4.0, 4.0]),
            Series::univariate(vec![3.0, 3.0, 6.0, 6.0]),
        ];
        let b = SegmentBoundaries::from_change_points(&[2]).unwrap();
        let fill = SegmentMeanFill::from_pool(&pool, &b).unwrap();
        assert_eq!(fill.means(), &[vec![2.0], vec![5.0]]);
    }

    #[test]
    fn pool_splice_copies_from_a_member() {
        let pool = vec![Series::univariate(vec![9.0; 6])];
        let strategy = PoolSplice::new(&pool).unwrap();
        let mut target = Series::univariate(vec![0.0; 6]);
        let mut rng = StdRng::seed_from_u64(1);
        strategy.replace(&mut target, 0, 2..4, None, &mut rng);
        assert_eq!(target.values(), &[0.0, 0.0, 9.0, 9.0, 0.0, 0.0]);
    }

    #[test]
    fn mismatched_pool_is_a_shape_error() {
        let pool = vec![Series::univariate(vec![0.0; 5]), Series::univariate(vec![0.0; 4])];
        let b = SegmentBoundaries::from_change_points(&[2]).unwrap();
        assert!(matches!(
            SegmentMeanFill::from_pool(&pool, &b),
            Err(ExplainError::Shape { .. })
        ));
        let original = Series::univariate(vec![0.0; 5]);
        let splice = PoolSplice::new(&pool).unwrap();
        assert!(splice.validate(&original, &b).is_err());
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert!(PoolSplice::new(&[]).is_err());
    }
}
