use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SegmentError {
    #[error("segment bounds must be finite and non-negative: {start}..{end}")]
    InvalidBounds { start: f64, end: f64 },

    #[error("segment ends before it starts: {start}..{end}")]
    Reversed { start: f64, end: f64 },
}

/// A labeled time range inside a screen's video: one practice to spot.
///
/// Identity is the `(start, end)` pair, see [`Segment::key`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    start: f64,
    end: f64,
    title: String,
}

impl Segment {
    /// # Errors
    ///
    /// Returns `SegmentError` if the bounds are not finite, negative, or reversed.
    pub fn new(start: f64, end: f64, title: impl Into<String>) -> Result<Self, SegmentError> {
        let segment = Self {
            start,
            end,
            title: title.into(),
        };
        segment.validate()?;
        Ok(segment)
    }

    /// Re-check bounds on a segment that came in through deserialization.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Segment::new`].
    pub fn validate(&self) -> Result<(), SegmentError> {
        let (start, end) = (self.start, self.end);
        if !start.is_finite() || !end.is_finite() || start < 0.0 {
            return Err(SegmentError::InvalidBounds { start, end });
        }
        if end < start {
            return Err(SegmentError::Reversed { start, end });
        }
        Ok(())
    }

    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> f64 {
        self.end
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Inclusive on both ends.
    #[must_use]
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }

    #[must_use]
    pub fn key(&self) -> SegmentKey {
        SegmentKey(format!("{}-{}", self.start, self.end))
    }
}

/// Stable identifier of a segment, rendered as `"{start}-{end}"`.
///
/// This string is what ends up in persisted `viewedSegments`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentKey(String);

impl SegmentKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_uses_shortest_number_rendering() {
        let whole = Segment::new(10.0, 15.0, "B").unwrap();
        assert_eq!(whole.key().as_str(), "10-15");

        let fractional = Segment::new(2.5, 7.25, "C").unwrap();
        assert_eq!(fractional.key().as_str(), "2.5-7.25");
    }

    #[test]
    fn bounds_are_inclusive() {
        let segment = Segment::new(0.0, 5.0, "A").unwrap();
        assert!(segment.contains(0.0));
        assert!(segment.contains(5.0));
        assert!(!segment.contains(5.01));
    }

    #[test]
    fn rejects_bad_bounds() {
        assert!(matches!(
            Segment::new(5.0, 1.0, "x"),
            Err(SegmentError::Reversed { .. })
        ));
        assert!(matches!(
            Segment::new(f64::NAN, 1.0, "x"),
            Err(SegmentError::InvalidBounds { .. })
        ));
        assert!(matches!(
            Segment::new(-1.0, 1.0, "x"),
            Err(SegmentError::InvalidBounds { .. })
        ));
    }
}
