/// Segmentation: where the segment boundaries of an explanation come from.
///
/// ```text
///   Series
///     │
///     ▼
///   ┌────────────────┐
///   │ matrix_profile  │  z-normalized self-join (STOMP)
///   └────────────────┘
///     │ nearest-neighbour indices
///     ▼
///   ┌──────────────┐
///   │ change_point  │  candidates → scores → greedy selection
///   └──────────────┘
///     │
///     ▼
///   SegmentBoundaries
/// ```
///
/// The baselines skip all of this and use `SegmentBoundaries::uniform`.

pub mod change_point;
pub mod matrix_profile;

pub use change_point::{detect, ChangePointDetector, ScoredCandidate};
pub use matrix_profile::{self_join, MatrixProfile};
