//! Segment-level local explanations for black-box time-series classifiers.
//!
//! A series is cut into segments (by change-point detection, or uniformly for
//! the baselines), segments are switched off by replacing them with a
//! background signal, the model is queried on the perturbed copies and a
//! weighted ridge surrogate attributes the change in prediction to segments.
//!
//! ```no_run
//! use lime_segment::{ExplainConfig, LimeSegment, Series, ThresholdClassifier};
//!
//! let example = Series::univariate((0..100).map(|t| (t as f64 / 3.0).sin()).collect());
//! let explanation = LimeSegment::new(ExplainConfig::default())
//!     .explain(&example, &ThresholdClassifier::new(0.5))?;
//! for feature in explanation.ranked() {
//!     println!("{}..{}: {:+.3}", feature.start, feature.end, feature.coefficient);
//! }
//! # Ok::<(), lime_segment::ExplainError>(())
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod explain;
pub mod model;
pub mod perturbation;
pub mod segmentation;
pub mod spectral;
pub mod surrogate;
pub mod weighting;

pub use config::{BaselineConfig, ExplainConfig};
pub use data::{SegmentBoundaries, Series, SeriesDataset};
pub use error::{ExplainError, Result};
pub use explain::{Explanation, FeatureImportance, Leftist, LimeSegment, Method, Neves};
pub use model::{Classifier, LabelDecoding, Predictions, ThresholdClassifier};
pub use perturbation::{Attribution, InterpretableVector, PerturbedBatch};
pub use weighting::DistanceScheme;
