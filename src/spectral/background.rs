use crate::data::model::Series;
use crate::error::{ExplainError, Result};

use super::stft::{istft, stft, Spectrogram};

/// Reconstructs the "background" of a series from its single flattest
/// frequency band.
///
/// Per channel: short-time spectrum, flatness `mean / std` of each band's
/// magnitude over time, keep the band with the highest flatness, zero the
/// rest, transform back. The steadiest band is what remains once transient
/// and localized structure is removed.
#[derive(Debug, Clone, Copy)]
pub struct SpectralBackgroundExtractor {
    nperseg: usize,
}

impl SpectralBackgroundExtractor {
    pub fn new(nperseg: usize) -> Self {
        SpectralBackgroundExtractor { nperseg }
    }

    /// Background with the same shape as `series`. Channels are processed
    /// independently.
    pub fn extract(&self, series: &Series) -> Result<Series> {
        let mut background = series.clone();
        for c in 0..series.channels() {
            let channel = series.channel(c);
            let reconstructed = self.extract_channel(&channel).map_err(|e| match e {
                ExplainError::Degenerate(msg) => {
                    ExplainError::Degenerate(format!("channel {c}: {msg}"))
                }
                other => other,
            })?;
            background.set_channel(c, &reconstructed);
        }
        Ok(background)
    }

    pub fn extract_channel(&self, signal: &[f64]) -> Result<Vec<f64>> {
        let nperseg = self.effective_nperseg(signal.len())?;

        let first = signal[0];
        if signal.iter().all(|&v| v == first) {
            return Err(ExplainError::Degenerate(
                "constant signal has no spectral structure".to_string(),
            ));
        }

        let mut spec = stft(signal, nperseg);
        let flatness = band_flatness(&spec)?;
        let selected = flatness
            .iter()
            .enumerate()
            .fold(0, |best, (f, &v)| if v > flatness[best] { f } else { best });
        log::debug!(
            "background band {selected} of {} (flatness {:.4})",
            flatness.len(),
            flatness[selected]
        );

        spec.retain_band(selected);
        let mut reconstructed = istft(&spec);
        reconstructed.resize(signal.len(), 0.0);
        Ok(reconstructed)
    }

    fn effective_nperseg(&self, len: usize) -> Result<usize> {
        if len == 0 {
            return Err(ExplainError::invalid(
                "series",
                "cannot extract the background of an empty series",
            ));
        }
        if self.nperseg < 2 {
            return Err(ExplainError::invalid(
                "nperseg",
                format!("segment length must be at least 2, got {}", self.nperseg),
            ));
        }
        if self.nperseg > len {
            log::warn!(
                "nperseg {} exceeds series length {len}, using {len}",
                self.nperseg
            );
            if len < 2 {
                return Err(ExplainError::invalid(
                    "nperseg",
                    "series is too short for a spectrogram",
                ));
            }
            return Ok(len);
        }
        Ok(self.nperseg)
    }
}

/// `mean / std` of each band's magnitude across frames.
pub fn band_flatness(spec: &Spectrogram) -> Result<Vec<f64>> {
    (0..spec.n_freqs())
        .map(|f| {
            let mags = spec.band_magnitudes(f);
            let n = mags.len() as f64;
            let mean = mags.iter().sum::<f64>() / n;
            let std = (mags.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / n).sqrt();
            let ratio = mean / std;
            if std == 0.0 || !ratio.is_finite() {
                return Err(ExplainError::Degenerate(format!(
                    "frequency band {f} has zero variance over time"
                )));
            }
            Ok(ratio)
        })
        .collect()
}

/// Convenience wrapper around [`SpectralBackgroundExtractor::extract`].
pub fn extract(series: &Series, nperseg: usize) -> Result<Series> {
    SpectralBackgroundExtractor::new(nperseg).extract(series)
}
