use thiserror::Error;

// ---------------------------------------------------------------------------
// Library error type
// ---------------------------------------------------------------------------

/// Everything that can make an explanation call fail.
///
/// There is no partial-result mode: a call either returns a complete
/// explanation or one of these.
#[derive(Debug, Error)]
pub enum ExplainError {
    /// Two inputs that must agree in length or channel count do not.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    /// Zero-variance data that would otherwise turn into NaN/Inf downstream.
    #[error("degenerate input: {0}")]
    Degenerate(String),

    #[error("invalid parameter `{param}`: {reason}")]
    InvalidParameter { param: &'static str, reason: String },

    /// Failure reported by the wrapped model, passed through untouched.
    #[error(transparent)]
    Model(#[from] anyhow::Error),

    #[error("reading configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExplainError>;

impl ExplainError {
    pub(crate) fn shape(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        ExplainError::Shape {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub(crate) fn invalid(param: &'static str, reason: impl Into<String>) -> Self {
        ExplainError::InvalidParameter {
            param,
            reason: reason.into(),
        }
    }
}
