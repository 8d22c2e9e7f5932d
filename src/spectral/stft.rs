use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Periodic Hann window of length `n`.
pub fn hann(n: usize) -> Vec<f64> {
    (0..n)
        .map(|k| 0.5 - 0.5 * (std::f64::consts::TAU * k as f64 / n as f64).cos())
        .collect()
}

/// One-sided short-time spectrum of a real signal.
///
/// Frames overlap by `nperseg / 2`, the signal is zero-padded by `nperseg / 2`
/// at both ends (so the first and last samples sit at a frame centre) and then
/// at the tail up to a whole number of hops. Coefficients are scaled by the
/// window sum.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    nperseg: usize,
    hop: usize,
    signal_len: usize,
    window: Vec<f64>,
    /// `frames[t][f]`
    frames: Vec<Vec<Complex<f64>>>,
}

impl Spectrogram {
    pub fn nperseg(&self) -> usize {
        self.nperseg
    }

    pub fn n_freqs(&self) -> usize {
        self.nperseg / 2 + 1
    }

    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    /// Magnitude of band `f` over time.
    pub fn band_magnitudes(&self, f: usize) -> Vec<f64> {
        self.frames.iter().map(|frame| frame[f].norm()).collect()
    }

    /// Zero every band except `keep`.
    pub fn retain_band(&mut self, keep: usize) {
        for frame in &mut self.frames {
            for (f, z) in frame.iter_mut().enumerate() {
                if f != keep {
                    *z = Complex::new(0.0, 0.0);
                }
            }
        }
    }

    fn window_sum(&self) -> f64 {
        self.window.iter().sum()
    }
}

/// Forward transform. `nperseg` must be at least 2.
pub fn stft(signal: &[f64], nperseg: usize) -> Spectrogram {
    let pad = nperseg / 2;
    let hop = nperseg - nperseg / 2;
    let window = hann(nperseg);
    let scale = window.iter().sum::<f64>();

    let mut x = vec![0.0; pad];
    x.extend_from_slice(signal);
    x.resize(x.len() + pad, 0.0);
    if x.len() < nperseg {
        x.resize(nperseg, 0.0);
    }
    let rem = (x.len() - nperseg) % hop;
    if rem != 0 {
        x.resize(x.len() + hop - rem, 0.0);
    }

    let fft = FftPlanner::<f64>::new().plan_fft_forward(nperseg);
    let n_freqs = nperseg / 2 + 1;
    let n_frames = (x.len() - nperseg) / hop + 1;

    let frames = (0..n_frames)
        .map(|t| {
            let start = t * hop;
            let mut buf: Vec<Complex<f64>> = x[start..start + nperseg]
                .iter()
                .zip(&window)
                .map(|(v, w)| Complex::new(v * w, 0.0))
                .collect();
            fft.process(&mut buf);
            buf.truncate(n_freqs);
            buf.iter_mut().for_each(|z| *z /= scale);
            buf
        })
        .collect();

    Spectrogram {
        nperseg,
        hop,
        signal_len: signal.len(),
        window,
        frames,
    }
}

/// Inverse transform by weighted overlap-add, trimmed back to the length of
/// the signal the spectrogram was computed from.
pub fn istft(spec: &Spectrogram) -> Vec<f64> {
    let n = spec.nperseg;
    let n_freqs = spec.n_freqs();
    let scale = spec.window_sum();
    let ifft = FftPlanner::<f64>::new().plan_fft_inverse(n);

    let out_len = (spec.n_frames().saturating_sub(1)) * spec.hop + n;
    let mut out = vec![0.0; out_len];
    let mut norm = vec![0.0; out_len];

    let mut buf = vec![Complex::new(0.0, 0.0); n];
    for (t, frame) in spec.frames.iter().enumerate() {
        for (k, slot) in buf.iter_mut().enumerate() {
            *slot = if k < n_freqs {
                frame[k] * scale
            } else {
                (frame[n - k] * scale).conj()
            };
        }
        ifft.process(&mut buf);

        let start = t * spec.hop;
        for (k, z) in buf.iter().enumerate() {
            let w = spec.window[k];
            out[start + k] += z.re / n as f64 * w;
            norm[start + k] += w * w;
        }
    }

    for (v, w) in out.iter_mut().zip(&norm) {
        if *w > 1e-10 {
            *v /= w;
        }
    }

    let pad = n / 2;
    out.into_iter().skip(pad).take(spec.signal_len).collect()
}
