//! Frequency-domain background extraction.

pub mod background;
pub mod stft;

pub use background::{extract, SpectralBackgroundExtractor};
pub use stft::{istft, stft, Spectrogram};
