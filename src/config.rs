use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExplainError, Result};
use crate::model::LabelDecoding;
use crate::perturbation::Attribution;
use crate::weighting::DistanceScheme;

/// Parameters of the segment-based explainer.
///
/// Every field has a default so a partial JSON file is enough. `window_size`
/// and `nperseg` depend on the series length and stay `None` until
/// [`ExplainConfig::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExplainConfig {
    /// Subsequence length of the matrix profile (default `T / 5`).
    pub window_size: Option<usize>,
    /// Maximum number of change points.
    pub change_points: usize,
    /// STFT segment length (default `T / 10`).
    pub nperseg: Option<usize>,
    pub distance: DistanceScheme,
    pub sample_count: usize,
    /// Fixed seed for reproducible sampling; entropy when absent.
    pub random_seed: Option<u64>,
    pub model_type: LabelDecoding,
    pub ridge_alpha: f64,
    pub attribution: Attribution,
    /// Sakoe-Chiba band for the DTW weighting.
    pub dtw_radius: Option<usize>,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        ExplainConfig {
            window_size: None,
            change_points: 3,
            nperseg: None,
            distance: DistanceScheme::Dtw,
            sample_count: 100,
            random_seed: None,
            model_type: LabelDecoding::Class,
            ridge_alpha: 1.0,
            attribution: Attribution::Segment,
            dtw_radius: None,
        }
    }
}

/// Length-dependent parameters after defaults are filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedWindows {
    pub window_size: usize,
    pub nperseg: usize,
}

impl ExplainConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Fill in the length-dependent defaults and check every parameter
    /// against a series of `len` timesteps.
    pub fn resolve(&self, len: usize) -> Result<ResolvedWindows> {
        let window_size = self.window_size.unwrap_or(len / 5);
        let nperseg = self.nperseg.unwrap_or(len / 10);

        if window_size < 3 || window_size >= len {
            return Err(ExplainError::invalid(
                "window_size",
                format!("must be in [3, {len}) for a series of length {len}, got {window_size}"),
            ));
        }
        if nperseg < 2 {
            return Err(ExplainError::invalid(
                "nperseg",
                format!("must be at least 2, got {nperseg}"),
            ));
        }
        check_common(self.sample_count, self.ridge_alpha)?;
        Ok(ResolvedWindows {
            window_size,
            nperseg,
        })
    }
}

/// Parameters of the uniform-segmentation baselines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BaselineConfig {
    pub segment_count: usize,
    pub sample_count: usize,
    pub random_seed: Option<u64>,
    pub model_type: LabelDecoding,
    pub ridge_alpha: f64,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        BaselineConfig {
            segment_count: 10,
            sample_count: 100,
            random_seed: None,
            model_type: LabelDecoding::Class,
            ridge_alpha: 1.0,
        }
    }
}

impl BaselineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.segment_count == 0 {
            return Err(ExplainError::invalid("segment_count", "must be at least 1"));
        }
        check_common(self.sample_count, self.ridge_alpha)
    }
}

fn check_common(sample_count: usize, ridge_alpha: f64) -> Result<()> {
    if sample_count == 0 {
        return Err(ExplainError::invalid("sample_count", "must be at least 1"));
    }
    if !(ridge_alpha > 0.0 && ridge_alpha.is_finite()) {
        return Err(ExplainError::invalid(
            "ridge_alpha",
            format!("must be positive, got {ridge_alpha}"),
        ));
    }
    Ok(())
}
