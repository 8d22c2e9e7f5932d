use std::ops::Range;

use serde::Serialize;

use crate::error::{ExplainError, Result};

/// Partition of a series into contiguous, non-overlapping segments.
///
/// `starts` always begins at 0 and is strictly increasing. `end` is the
/// exclusive end of the last segment: `None` means "through the end of the
/// series", whatever its length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentBoundaries {
    starts: Vec<usize>,
    end: Option<usize>,
}

impl SegmentBoundaries {
    pub fn new(starts: Vec<usize>, end: Option<usize>) -> Result<Self> {
        if starts.first() != Some(&0) {
            return Err(ExplainError::invalid(
                "boundaries",
                "the first segment must start at 0",
            ));
        }
        if starts.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ExplainError::invalid(
                "boundaries",
                format!("segment starts must be strictly increasing: {starts:?}"),
            ));
        }
        if let Some(end) = end {
            if end <= starts[starts.len() - 1] {
                return Err(ExplainError::invalid(
                    "boundaries",
                    format!("end {end} does not follow the last start"),
                ));
            }
        }
        Ok(SegmentBoundaries { starts, end })
    }

    /// `[0] + change_points` with an open end. Change points must be sorted,
    /// unique and non-zero.
    pub fn from_change_points(change_points: &[usize]) -> Result<Self> {
        let mut starts = Vec::with_capacity(change_points.len() + 1);
        starts.push(0);
        starts.extend_from_slice(change_points);
        Self::new(starts, None)
    }

    /// `count` equal spans (the last one absorbs the remainder).
    pub fn uniform(len: usize, count: usize) -> Result<Self> {
        if len == 0 {
            return Err(ExplainError::invalid("series", "cannot segment an empty series"));
        }
        if count == 0 {
            return Err(ExplainError::invalid("segment_count", "must be at least 1"));
        }
        let step = (len / count).max(1);
        Self::new((0..len).step_by(step).collect(), None)
    }

    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    pub fn end(&self) -> Option<usize> {
        self.end
    }

    /// Interior boundaries, i.e. the detected change points.
    pub fn change_points(&self) -> &[usize] {
        &self.starts[1..]
    }

    pub fn segment_count(&self) -> usize {
        self.starts.len()
    }

    /// Concrete spans for a series of `len` timesteps.
    ///
    /// Spans are clamped to `len`, so a boundary set computed for a longer
    /// series never indexes out of range.
    pub fn spans(&self, len: usize) -> Vec<Range<usize>> {
        let end = self.end.map_or(len, |e| e.min(len));
        self.starts
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let stop = self.starts.get(i + 1).copied().unwrap_or(end).min(len);
                start.min(stop)..stop
            })
            .collect()
    }

    /// Index of the segment containing timestep `t` of a `len`-long series.
    pub fn segment_containing(&self, t: usize, len: usize) -> Option<usize> {
        self.spans(len).iter().position(|span| span.contains(&t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_end_resolves_to_series_length() {
        let b = SegmentBoundaries::from_change_points(&[3, 7]).unwrap();
        assert_eq!(b.spans(10), vec![0..3, 3..7, 7..10]);
        assert_eq!(b.change_points(), &[3, 7]);
        assert_eq!(b.segment_count(), 3);
    }

    #[test]
    fn closed_end_is_respected() {
        let b = SegmentBoundaries::new(vec![0, 5], Some(8)).unwrap();
        assert_eq!(b.spans(10), vec![0..5, 5..8]);
        assert_eq!(b.segment_containing(9, 10), None);
    }

    #[test]
    fn uniform_segmentation_of_100_gives_ten_spans() {
        let b = SegmentBoundaries::uniform(100, 10).unwrap();
        assert_eq!(b.segment_count(), 10);
        assert_eq!(b.starts()[1], 10);
        assert_eq!(b.spans(100).last(), Some(&(90..100)));
    }

    #[test]
    fn uniform_short_series_uses_unit_steps() {
        let b = SegmentBoundaries::uniform(4, 10).unwrap();
        assert_eq!(b.starts(), &[0, 1, 2, 3]);
    }

    #[test]
    fn unsorted_starts_are_rejected() {
        assert!(SegmentBoundaries::new(vec![0, 5, 5], None).is_err());
        assert!(SegmentBoundaries::new(vec![1, 5], None).is_err());
        assert!(SegmentBoundaries::from_change_points(&[0]).is_err());
    }

    #[test]
    fn segment_containing_finds_span() {
        let b = SegmentBoundaries::from_change_points(&[50]).unwrap();
        assert_eq!(b.segment_containing(49, 100), Some(0));
        assert_eq!(b.segment_containing(50, 100), Some(1));
    }
}
