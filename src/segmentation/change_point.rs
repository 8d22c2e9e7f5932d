use std::ops::Range;

use crate::data::model::Series;
use crate::data::segments::SegmentBoundaries;
use crate::error::Result;

use super::matrix_profile::{self_join, MatrixProfile};

/// A proposed change point and its level-and-variability shift score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub index: usize,
    pub score: f64,
}

/// Change-point segmentation driven by nearest-neighbour discontinuities in
/// the matrix profile.
#[derive(Debug, Clone, Copy)]
pub struct ChangePointDetector {
    window_size: usize,
}

impl ChangePointDetector {
    pub fn new(window_size: usize) -> Self {
        ChangePointDetector { window_size }
    }

    /// Half window: width of the scoring windows and of each exclusion zone.
    fn tolerance(&self) -> usize {
        self.window_size / 2
    }

    /// Segment `series` with at most `max_change_points` interior boundaries.
    ///
    /// Returning fewer boundaries than requested is a normal outcome when the
    /// candidates do not spread out far enough.
    pub fn detect(&self, series: &Series, max_change_points: usize) -> Result<SegmentBoundaries> {
        let profile = self_join(series, self.window_size)?;
        let scored = self.score_candidates(series, &profile);
        let selected = self.select(&scored, max_change_points, series.len());

        if selected.len() < max_change_points {
            log::debug!(
                "found {} of {} requested change points ({} candidates)",
                selected.len(),
                max_change_points,
                scored.len()
            );
        }
        SegmentBoundaries::from_change_points(&selected)
    }

    /// Indices where the nearest-neighbour index stops advancing in lockstep.
    pub fn candidates(profile: &MatrixProfile) -> Vec<usize> {
        profile
            .indices
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| pair[1] != pair[0] + 1)
            .map(|(i, _)| i)
            .collect()
    }

    fn score_candidates(&self, series: &Series, profile: &MatrixProfile) -> Vec<ScoredCandidate> {
        Self::candidates(profile)
            .into_iter()
            .map(|index| ScoredCandidate {
                index,
                score: self.score(series, index),
            })
            .collect()
    }

    /// `|Δmean| · |Δstd| / mean(std)` over the half-windows either side of
    /// `index`. Per-channel differences combine through their Euclidean norm.
    /// Empty or flat windows score 0.
    pub fn score(&self, series: &Series, index: usize) -> f64 {
        let tol = self.tolerance();
        let before = index.saturating_sub(tol)..index.min(series.len());
        let after = index.min(series.len())..(index + tol).min(series.len());
        if before.is_empty() || after.is_empty() {
            return 0.0;
        }

        let mut mean_sq = 0.0;
        let mut std_sq = 0.0;
        let mut std_total = 0.0;
        for c in 0..series.channels() {
            let (mean_b, std_b) = window_moments(series, c, before.clone());
            let (mean_a, std_a) = window_moments(series, c, after.clone());
            mean_sq += (mean_b - mean_a).powi(2);
            std_sq += (std_b - std_a).powi(2);
            std_total += std_b + std_a;
        }
        let std_mean = std_total / (2 * series.channels()) as f64;
        if std_mean <= f64::EPSILON {
            return 0.0;
        }
        mean_sq.sqrt() * std_sq.sqrt() / std_mean
    }

    /// Greedy best-first pick that keeps accepted points at least half a
    /// window apart (and away from the start of the series).
    fn select(
        &self,
        scored: &[ScoredCandidate],
        max_change_points: usize,
        len: usize,
    ) -> Vec<usize> {
        let tol = self.tolerance();
        let mut ranked = scored.to_vec();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut covered = vec![false; len];
        covered[..tol.min(len)].fill(true);

        let mut selected = Vec::with_capacity(max_change_points);
        for candidate in ranked {
            if selected.len() == max_change_points {
                break;
            }
            if covered[candidate.index] {
                continue;
            }
            selected.push(candidate.index);
            let zone = candidate.index.saturating_sub(tol)..(candidate.index + tol).min(len);
            covered[zone].fill(true);
        }
        selected.sort_unstable();
        selected
    }
}

/// Convenience wrapper around [`ChangePointDetector::detect`].
pub fn detect(
    series: &Series,
    window_size: usize,
    max_change_points: usize,
) -> Result<SegmentBoundaries> {
    ChangePointDetector::new(window_size).detect(series, max_change_points)
}

/// Mean and population standard deviation of channel `c` over `span`.
fn window_moments(series: &Series, c: usize, span: Range<usize>) -> (f64, f64) {
    let n = span.len() as f64;
    let mean = span.clone().map(|t| series.value(t, c)).sum::<f64>() / n;
    let var = span.map(|t| (series.value(t, c) - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
