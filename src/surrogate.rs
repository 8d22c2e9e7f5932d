use crate::error::{ExplainError, Result};
use crate::perturbation::InterpretableVector;

/// Result of a surrogate fit.
#[derive(Debug, Clone, PartialEq)]
pub struct SurrogateFit {
    /// One per interpretable feature.
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Weighted coefficient of determination on the training samples.
    pub r_squared: f64,
}

impl SurrogateFit {
    pub fn predict(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(b, x)| b * x)
                .sum::<f64>()
    }
}

/// Weighted ridge regression on interpretable vectors.
///
/// The data are centered with the sample weights, each row is scaled by the
/// square root of its weight, and `(XᵀX + αI) β = Xᵀy` is solved by Cholesky
/// decomposition. The intercept is recovered from the weighted means and is
/// never penalized.
#[derive(Debug, Clone, Copy)]
pub struct RidgeSurrogate {
    alpha: f64,
    fit_intercept: bool,
}

impl Default for RidgeSurrogate {
    fn default() -> Self {
        RidgeSurrogate {
            alpha: 1.0,
            fit_intercept: true,
        }
    }
}

impl RidgeSurrogate {
    pub fn new(alpha: f64) -> Self {
        RidgeSurrogate {
            alpha,
            ..Default::default()
        }
    }

    pub fn with_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }

    pub fn fit(
        &self,
        vectors: &[InterpretableVector],
        labels: &[f64],
        weights: &[f64],
    ) -> Result<SurrogateFit> {
        self.validate(vectors, labels, weights)?;

        let n_features = vectors[0].len();
        let x: Vec<Vec<f64>> = vectors.iter().map(InterpretableVector::as_features).collect();
        let total_weight: f64 = weights.iter().sum();
        if total_weight <= 0.0 {
            return Err(ExplainError::Degenerate(
                "sample weights sum to zero".to_string(),
            ));
        }

        let (x_mean, y_mean) = if self.fit_intercept {
            let mut x_mean = vec![0.0; n_features];
            for (row, &w) in x.iter().zip(weights) {
                for (m, v) in x_mean.iter_mut().zip(row) {
                    *m += w * v;
                }
            }
            x_mean.iter_mut().for_each(|m| *m /= total_weight);
            let y_mean = labels.iter().zip(weights).map(|(y, w)| w * y).sum::<f64>() / total_weight;
            (x_mean, y_mean)
        } else {
            (vec![0.0; n_features], 0.0)
        };

        // Normal equations on the centered, sqrt-weight scaled rows:
        // Σ w (x - x̄)(x - x̄)ᵀ and Σ w (x - x̄)(y - ȳ).
        let mut gram = vec![0.0; n_features * n_features];
        let mut rhs = vec![0.0; n_features];
        for ((row, &y), &w) in x.iter().zip(labels).zip(weights) {
            let centered: Vec<f64> = row.iter().zip(&x_mean).map(|(v, m)| v - m).collect();
            let yc = y - y_mean;
            for i in 0..n_features {
                rhs[i] += w * centered[i] * yc;
                for j in 0..=i {
                    gram[i * n_features + j] += w * centered[i] * centered[j];
                }
            }
        }
        for i in 0..n_features {
            for j in 0..i {
                gram[j * n_features + i] = gram[i * n_features + j];
            }
            gram[i * n_features + i] += self.alpha;
        }

        let coefficients = cholesky_solve(&gram, &rhs, n_features)?;
        let intercept = if self.fit_intercept {
            y_mean
                - coefficients
                    .iter()
                    .zip(&x_mean)
                    .map(|(b, m)| b * m)
                    .sum::<f64>()
        } else {
            0.0
        };

        let mut fit = SurrogateFit {
            coefficients,
            intercept,
            r_squared: 0.0,
        };
        fit.r_squared = weighted_r_squared(&fit, &x, labels, weights, total_weight);
        log::debug!(
            "ridge surrogate: {} samples, {n_features} features, R² {:.4}",
            labels.len(),
            fit.r_squared
        );
        Ok(fit)
    }

    fn validate(
        &self,
        vectors: &[InterpretableVector],
        labels: &[f64],
        weights: &[f64],
    ) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha.is_finite()) {
            return Err(ExplainError::invalid(
                "ridge_alpha",
                format!("must be positive, got {}", self.alpha),
            ));
        }
        let first = vectors.first().ok_or_else(|| {
            ExplainError::invalid("samples", "cannot fit a surrogate on zero samples")
        })?;
        if first.is_empty() {
            return Err(ExplainError::invalid("samples", "interpretable vectors are empty"));
        }
        if let Some(v) = vectors.iter().find(|v| v.len() != first.len()) {
            return Err(ExplainError::shape(
                format!("{} features", first.len()),
                format!("{} features", v.len()),
            ));
        }
        if labels.len() != vectors.len() {
            return Err(ExplainError::shape(
                format!("{} labels", vectors.len()),
                format!("{} labels", labels.len()),
            ));
        }
        if weights.len() != vectors.len() {
            return Err(ExplainError::shape(
                format!("{} weights", vectors.len()),
                format!("{} weights", weights.len()),
            ));
        }
        if let Some(w) = weights.iter().find(|w| !(w.is_finite() && **w >= 0.0)) {
            return Err(ExplainError::Degenerate(format!(
                "sample weights must be finite and non-negative, got {w}"
            )));
        }
        if let Some(y) = labels.iter().find(|y| !y.is_finite()) {
            return Err(ExplainError::Degenerate(format!("non-finite label {y}")));
        }
        Ok(())
    }
}

/// Solve `A x = b` for symmetric positive definite `A` (row-major, `n × n`).
fn cholesky_solve(a: &[f64], b: &[f64], n: usize) -> Result<Vec<f64>> {
    let mut l = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i * n + k] * l[j * n + k]).sum();
            if i == j {
                let diag = a[i * n + i] - sum;
                if diag <= 0.0 {
                    return Err(ExplainError::Degenerate(
                        "ridge system is not positive definite".to_string(),
                    ));
                }
                l[i * n + i] = diag.sqrt();
            } else {
                l[i * n + j] = (a[i * n + j] - sum) / l[j * n + j];
            }
        }
    }

    // L y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[i * n + j] * y[j]).sum();
        y[i] = (b[i] - sum) / l[i * n + i];
    }
    // Lᵀ x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let sum: f64 = (i + 1..n).map(|j| l[j * n + i] * x[j]).sum();
        x[i] = (y[i] - sum) / l[i * n + i];
    }
    Ok(x)
}

fn weighted_r_squared(
    fit: &SurrogateFit,
    x: &[Vec<f64>],
    labels: &[f64],
    weights: &[f64],
    total_weight: f64,
) -> f64 {
    let y_mean = labels.iter().zip(weights).map(|(y, w)| w * y).sum::<f64>() / total_weight;
    let mut residual = 0.0;
    let mut total = 0.0;
    for ((row, &y), &w) in x.iter().zip(labels).zip(weights) {
        residual += w * (y - fit.predict(row)).powi(2);
        total += w * (y - y_mean).powi(2);
    }
    if total == 0.0 {
        return if residual == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - residual / total
}
