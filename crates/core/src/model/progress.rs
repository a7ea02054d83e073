use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::matcher::MatchOutcome;
use crate::model::{Segment, SegmentKey};

/// An alert that landed inside an unclaimed segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectAlert {
    pub time: f64,
    pub title: String,
}

//
// ─── SCREEN PROGRESS ───────────────────────────────────────────────────────────
//

/// Persisted progress for one screen.
///
/// `completed` holds exactly when no unmarked segment is left without a full replay.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScreenProgress {
    correct_alerts: Vec<CorrectAlert>,
    incorrect_alerts: Vec<f64>,
    unmarked_segments: Vec<Segment>,
    viewed_segments: BTreeSet<SegmentKey>,
    viewed: bool,
    completed: bool,
}

impl ScreenProgress {
    /// Build the record written when the video ends.
    ///
    /// The viewed-segment set always starts empty: a new evaluation is a new generation.
    #[must_use]
    pub fn evaluated(outcome: MatchOutcome) -> Self {
        let completed = outcome.unmarked.is_empty();
        Self {
            correct_alerts: outcome.correct,
            incorrect_alerts: outcome.incorrect,
            unmarked_segments: outcome.unmarked,
            viewed_segments: BTreeSet::new(),
            viewed: true,
            completed,
        }
    }

    /// Record a segment replayed to its end.
    ///
    /// Returns `true` if the viewed set changed.
    pub fn mark_segment_viewed(&mut self, key: SegmentKey) -> bool {
        let inserted = self.viewed_segments.insert(key);
        if self.all_unmarked_viewed() {
            self.completed = true;
        }
        inserted
    }

    /// Whether every unmarked segment has been replayed. Vacuously true when none are left.
    #[must_use]
    pub fn all_unmarked_viewed(&self) -> bool {
        self.unmarked_segments
            .iter()
            .all(|segment| self.viewed_segments.contains(&segment.key()))
    }

    #[must_use]
    pub fn pending_segments(&self) -> Vec<&Segment> {
        self.unmarked_segments
            .iter()
            .filter(|segment| !self.viewed_segments.contains(&segment.key()))
            .collect()
    }

    #[must_use]
    pub fn correct_alerts(&self) -> &[CorrectAlert] {
        &self.correct_alerts
    }

    #[must_use]
    pub fn incorrect_alerts(&self) -> &[f64] {
        &self.incorrect_alerts
    }

    #[must_use]
    pub fn unmarked_segments(&self) -> &[Segment] {
        &self.unmarked_segments
    }

    #[must_use]
    pub fn viewed_segments(&self) -> &BTreeSet<SegmentKey> {
        &self.viewed_segments
    }

    #[must_use]
    pub fn is_viewed(&self) -> bool {
        self.viewed
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

//
// ─── SUSPEND DATA ──────────────────────────────────────────────────────────────
//

/// Snapshot of all per-screen progress; the unit of resumability.
///
/// Slots are `None` for screens never evaluated. They serialize as `null`, so a
/// course resumed on screen 3 without data for screen 2 still round-trips.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SuspendData {
    screens: Vec<Option<ScreenProgress>>,
}

#[derive(Deserialize)]
struct RawSuspendData {
    screens: Option<Vec<Option<ScreenProgress>>>,
}

impl SuspendData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a persisted blob.
    ///
    /// Empty strings, `{}`, non-JSON and schema mismatches all mean "no data".
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }
        let decoded: RawSuspendData = serde_json::from_str(raw).ok()?;
        decoded.screens.map(|screens| Self { screens })
    }

    /// # Errors
    ///
    /// Returns the serializer error; unreachable for well-formed progress.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    #[must_use]
    pub fn screen(&self, index: usize) -> Option<&ScreenProgress> {
        self.screens.get(index).and_then(Option::as_ref)
    }

    /// Replace the progress of one screen, padding earlier slots with `None`.
    pub fn set_screen(&mut self, index: usize, progress: ScreenProgress) {
        if self.screens.len() <= index {
            self.screens.resize(index + 1, None);
        }
        self.screens[index] = Some(progress);
    }

    /// Number of slots, including empty ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.screens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.screens
            .iter()
            .flatten()
            .filter(|screen| screen.is_completed())
            .count()
    }

    /// Highest index whose screen is completed.
    #[must_use]
    pub fn last_completed_index(&self) -> Option<usize> {
        self.screens
            .iter()
            .rposition(|slot| slot.as_ref().is_some_and(ScreenProgress::is_completed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::match_alerts;

    fn segments() -> Vec<Segment> {
        vec![
            Segment::new(0.0, 5.0, "A").unwrap(),
            Segment::new(10.0, 15.0, "B").unwrap(),
        ]
    }

    #[test]
    fn evaluation_with_nothing_unmarked_is_complete() {
        let progress = ScreenProgress::evaluated(match_alerts(&[1.0, 11.0], &segments()));
        assert!(progress.is_viewed());
        assert!(progress.is_completed());
        assert!(progress.viewed_segments().is_empty());
    }

    #[test]
    fn completes_once_every_unmarked_segment_is_replayed() {
        let segs = segments();
        let mut progress = ScreenProgress::evaluated(match_alerts(&[], &segs));
        assert!(!progress.is_completed());
        assert_eq!(progress.pending_segments().len(), 2);

        assert!(progress.mark_segment_viewed(segs[0].key()));
        assert!(!progress.is_completed());
        assert!(!progress.mark_segment_viewed(segs[0].key()));

        progress.mark_segment_viewed(segs[1].key());
        assert!(progress.is_completed());
        assert!(progress.pending_segments().is_empty());
    }

    #[test]
    fn replaying_a_correct_segment_does_not_complete() {
        let segs = segments();
        let mut progress = ScreenProgress::evaluated(match_alerts(&[2.0], &segs));
        progress.mark_segment_viewed(segs[0].key());
        assert!(!progress.is_completed());
    }

    #[test]
    fn parse_treats_garbage_as_absent() {
        assert_eq!(SuspendData::parse(""), None);
        assert_eq!(SuspendData::parse("{}"), None);
        assert_eq!(SuspendData::parse("not json"), None);
        assert_eq!(SuspendData::parse(r#"{"screens":"nope"}"#), None);
        assert_eq!(SuspendData::parse(r#"{"screens":[]}"#), Some(SuspendData::new()));
    }

    #[test]
    fn parse_accepts_sparse_and_partial_records() {
        let raw = r#"{"screens":[null,{"viewed":true,"completed":true}]}"#;
        let data = SuspendData::parse(raw).unwrap();
        assert_eq!(data.len(), 2);
        assert!(data.screen(0).is_none());
        assert!(data.screen(1).unwrap().is_completed());
        assert_eq!(data.last_completed_index(), Some(1));
    }

    #[test]
    fn json_uses_camel_case_field_names() {
        let mut data = SuspendData::new();
        data.set_screen(1, ScreenProgress::evaluated(match_alerts(&[3.0], &segments())));
        let json = data.to_json().unwrap();
        assert!(json.starts_with(r#"{"screens":[null,{"correctAlerts":[{"time":3.0,"title":"A"}]"#));
        assert!(json.contains(r#""unmarkedSegments":[{"start":10.0,"end":15.0,"title":"B"}]"#));
        assert_eq!(SuspendData::parse(&json), Some(data));
    }
}
