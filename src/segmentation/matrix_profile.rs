//! Z-normalized matrix profile (self-join) computed with the STOMP update.
//!
//! For every subsequence of length `m` the profile stores the distance to,
//! and index of, its nearest neighbour outside the trivial-match exclusion
//! zone. Multivariate series produce one joint profile: per-channel distance
//! profiles are averaged before the neighbour is chosen.

use crate::data::model::Series;
use crate::error::{ExplainError, Result};

/// Standard deviations at or below this are treated as constant windows.
const STD_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixProfile {
    /// Subsequence length.
    pub window: usize,
    pub distances: Vec<f64>,
    pub indices: Vec<usize>,
}

impl MatrixProfile {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Half-width of the exclusion zone around the diagonal: `ceil(m / 4)`.
pub fn exclusion_zone(m: usize) -> usize {
    m.div_ceil(4)
}

/// Rolling mean and population standard deviation of every length-`m` window.
struct WindowStats {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl WindowStats {
    fn new(x: &[f64], m: usize) -> Self {
        let (mean, std) = x
            .windows(m)
            .map(|w| {
                let mu = w.iter().sum::<f64>() / m as f64;
                let var = w.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / m as f64;
                (mu, var.sqrt())
            })
            .unzip();
        WindowStats { mean, std }
    }

    fn distance(&self, qt: f64, i: usize, j: usize, m: usize) -> f64 {
        let (si, sj) = (self.std[i], self.std[j]);
        match (si <= STD_EPSILON, sj <= STD_EPSILON) {
            (true, true) => 0.0,
            (true, false) | (false, true) => (m as f64).sqrt(),
            (false, false) => {
                let m_f = m as f64;
                let corr = (qt - m_f * self.mean[i] * self.mean[j]) / (m_f * si * sj);
                (2.0 * m_f * (1.0 - corr)).max(0.0).sqrt()
            }
        }
    }
}

/// Dot products of `x[0..m]` with every window of `x`.
fn first_row(x: &[f64], m: usize) -> Vec<f64> {
    let query = &x[..m];
    x.windows(m)
        .map(|w| w.iter().zip(query).map(|(a, b)| a * b).sum())
        .collect()
}

/// Per-channel STOMP state: the current row of sliding dot products.
struct ChannelState {
    x: Vec<f64>,
    stats: WindowStats,
    qt: Vec<f64>,
    /// Row 0 doubles as column 0 by symmetry.
    qt_first: Vec<f64>,
}

impl ChannelState {
    fn new(x: Vec<f64>, m: usize) -> Self {
        let stats = WindowStats::new(&x, m);
        let qt_first = first_row(&x, m);
        ChannelState {
            qt: qt_first.clone(),
            x,
            stats,
            qt_first,
        }
    }

    /// Advance `qt` from row `i - 1` to row `i`.
    fn advance(&mut self, i: usize, m: usize) {
        let x = &self.x;
        for j in (1..self.qt.len()).rev() {
            self.qt[j] = self.qt[j - 1] - x[i - 1] * x[j - 1] + x[i + m - 1] * x[j + m - 1];
        }
        self.qt[0] = self.qt_first[i];
    }
}

/// Self-join of `series` with subsequence length `m`.
pub fn self_join(series: &Series, m: usize) -> Result<MatrixProfile> {
    let n = series.len();
    if m < 3 {
        return Err(ExplainError::invalid(
            "window_size",
            format!("subsequence length must be at least 3, got {m}"),
        ));
    }
    if m >= n {
        return Err(ExplainError::invalid(
            "window_size",
            format!("subsequence length {m} must be smaller than the series length {n}"),
        ));
    }

    let profile_len = n - m + 1;
    let zone = exclusion_zone(m);
    let mut channels: Vec<ChannelState> = (0..series.channels())
        .map(|c| ChannelState::new(series.channel(c), m))
        .collect();
    let n_channels = channels.len() as f64;

    let mut distances = vec![f64::INFINITY; profile_len];
    let mut indices = vec![0; profile_len];
    let mut row = vec![0.0; profile_len];

    for i in 0..profile_len {
        row.fill(0.0);
        for state in &mut channels {
            if i > 0 {
                state.advance(i, m);
            }
            for (j, d) in row.iter_mut().enumerate() {
                *d += state.stats.distance(state.qt[j], i, j, m);
            }
        }

        for (j, &d) in row.iter().enumerate() {
            if i.abs_diff(j) <= zone {
                continue;
            }
            let d = d / n_channels;
            if d < distances[i] {
                distances[i] = d;
                indices[i] = j;
            }
        }
    }

    Ok(MatrixProfile {
        window: m,
        distances,
        indices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Brute-force z-normalized nearest neighbour, univariate.
    fn naive(x: &[f64], m: usize) -> (Vec<f64>, Vec<usize>) {
        let znorm = |w: &[f64]| {
            let mu = w.iter().sum::<f64>() / m as f64;
            let sd = (w.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / m as f64).sqrt();
            w.iter().map(|v| (v - mu) / sd).collect::<Vec<_>>()
        };
        let subs: Vec<Vec<f64>> = x.windows(m).map(znorm).collect();
        let zone = exclusion_zone(m);
        let mut dist = Vec::new();
        let mut idx = Vec::new();
        for i in 0..subs.len() {
            let (mut best, mut best_j) = (f64::INFINITY, 0);
            for j in 0..subs.len() {
                if i.abs_diff(j) <= zone {
                    continue;
                }
                let d: f64 = subs[i]
                    .iter()
                    .zip(&subs[j])
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt();
                if d < best {
                    best = d;
                    best_j = j;
                }
            }
            dist.push(best);
            idx.push(best_j);
        }
        (dist, idx)
    }

    fn pseudo_random(n: usize) -> Vec<f64> {
        // Deterministic, irregular values without a shared period.
        (0..n)
            .map(|i| ((i as f64 * 12.9898).sin() * 43758.5453).fract())
            .collect()
    }

    #[test]
    fn stomp_matches_brute_force() {
        let x = pseudo_random(60);
        let mp = self_join(&Series::univariate(x.clone()), 8).unwrap();
        let (dist, idx) = naive(&x, 8);
        assert_eq!(mp.len(), 53);
        for i in 0..mp.len() {
            assert!((mp.distances[i] - dist[i]).abs() < 1e-6, "distance at {i}");
            assert_eq!(mp.indices[i], idx[i], "index at {i}");
        }
    }

    #[test]
    fn repeated_pattern_finds_its_copy() {
        let mut x = pseudo_random(40);
        let motif: Vec<f64> = x[5..15].to_vec();
        x[25..35].copy_from_slice(&motif);
        let mp = self_join(&Series::univariate(x), 10).unwrap();
        assert_eq!(mp.indices[5], 25);
        assert!(mp.distances[5] < 1e-4);
    }

    #[test]
    fn constant_windows_match_each_other() {
        let mut x = vec![1.0; 30];
        x.extend(pseudo_random(30));
        let mp = self_join(&Series::univariate(x), 5).unwrap();
        assert_eq!(mp.distances[0], 0.0);
    }

    #[test]
    fn multivariate_profile_averages_channels() {
        let a = pseudo_random(50);
        let s = Series::from_channels(vec![a.clone(), a.clone()]).unwrap();
        let joint = self_join(&s, 6).unwrap();
        let single = self_join(&Series::univariate(a), 6).unwrap();
        assert_eq!(joint.indices, single.indices);
    }

    #[test]
    fn window_must_fit() {
        let s = Series::univariate(pseudo_random(10));
        assert!(self_join(&s, 2).is_err());
        assert!(self_join(&s, 10).is_err());
    }
}
