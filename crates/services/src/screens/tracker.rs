use std::sync::Arc;
use std::time::Duration;

use player_core::match_alerts;
use player_core::model::{ScreenDef, ScreenProgress, Segment};
use tracing::debug;

use super::{ReplayTimer, VideoPlayback};
use crate::error::PlayerError;

/// Where a screen stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenPhase {
    /// The video has not been watched to the end yet.
    Unviewed,
    /// Evaluated, with unmarked segments still to replay.
    SegmentsPending,
    Completed,
}

/// Which segment a replay targets, by position in the evaluated lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayTarget {
    Correct(usize),
    Unmarked(usize),
}

/// Result of a replay that reached its end boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct SettledReplay {
    pub segment: Segment,
    /// The viewed set gained this segment.
    pub changed: bool,
    /// This replay moved the screen to completed.
    pub newly_completed: bool,
}

/// Ephemeral state of the screen on display plus its working progress record.
pub struct ScreenTracker {
    index: usize,
    video_title: String,
    segments: Vec<Segment>,
    alerts: Vec<f64>,
    progress: Option<ScreenProgress>,
    replay: Option<ReplayTimer>,
    poll: Duration,
}

impl ScreenTracker {
    /// Open a screen, starting from whatever was persisted for it.
    #[must_use]
    pub fn open(
        index: usize,
        screen: &ScreenDef,
        persisted: Option<ScreenProgress>,
        poll: Duration,
    ) -> Self {
        Self {
            index,
            video_title: screen.title.clone(),
            segments: screen.segments.clone(),
            alerts: Vec::new(),
            progress: persisted,
            replay: None,
            poll,
        }
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn video_title(&self) -> &str {
        &self.video_title
    }

    #[must_use]
    pub fn alerts(&self) -> &[f64] {
        &self.alerts
    }

    #[must_use]
    pub fn progress(&self) -> Option<&ScreenProgress> {
        self.progress.as_ref()
    }

    #[must_use]
    pub fn phase(&self) -> ScreenPhase {
        match &self.progress {
            None => ScreenPhase::Unviewed,
            Some(progress) if progress.is_completed() => ScreenPhase::Completed,
            Some(progress) if !progress.is_viewed() => ScreenPhase::Unviewed,
            Some(_) => ScreenPhase::SegmentsPending,
        }
    }

    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.phase() == ScreenPhase::Completed
    }

    #[must_use]
    pub fn is_replaying(&self) -> bool {
        self.replay.is_some()
    }

    /// Record an alert at `time`. Ignored while a segment replays.
    pub fn record_alert(&mut self, time: f64) -> bool {
        if self.replay.is_some() || !time.is_finite() {
            return false;
        }
        self.alerts.push(time);
        true
    }

    /// Evaluate the collected alerts against the screen's segments.
    ///
    /// Replaces the working progress with a fresh generation; calling it again with the
    /// same alerts yields the same record.
    pub fn evaluate(&mut self) -> ScreenProgress {
        self.cancel_replay();
        let progress = ScreenProgress::evaluated(match_alerts(&self.alerts, &self.segments));
        debug!(
            screen = self.index,
            correct = progress.correct_alerts().len(),
            incorrect = progress.incorrect_alerts().len(),
            unmarked = progress.unmarked_segments().len(),
            "screen evaluated"
        );
        self.progress = Some(progress.clone());
        progress
    }

    /// Replay one evaluated segment.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::NotEvaluated` before the first evaluation,
    /// `PlayerError::ReplayInProgress` while another replay runs, and
    /// `PlayerError::NoSuchSegment` for an out-of-range target.
    pub fn start_replay(
        &mut self,
        target: ReplayTarget,
        playback: Arc<dyn VideoPlayback>,
    ) -> Result<Segment, PlayerError> {
        let progress = self.progress.as_ref().ok_or(PlayerError::NotEvaluated)?;
        if !progress.is_viewed() {
            return Err(PlayerError::NotEvaluated);
        }
        if self.replay.is_some() {
            return Err(PlayerError::ReplayInProgress);
        }
        let segment = match target {
            ReplayTarget::Unmarked(i) => progress.unmarked_segments().get(i).cloned(),
            ReplayTarget::Correct(i) => progress.correct_alerts().get(i).and_then(|alert| {
                self.segments
                    .iter()
                    .find(|segment| segment.title() == alert.title && segment.contains(alert.time))
                    .cloned()
            }),
        }
        .ok_or(PlayerError::NoSuchSegment)?;

        self.replay = Some(ReplayTimer::start(playback, segment.clone(), self.poll));
        Ok(segment)
    }

    /// Wait for the running replay to reach its end and record the segment as viewed.
    ///
    /// `None` when no replay is running or it was cancelled.
    pub async fn settle_replay(&mut self) -> Option<SettledReplay> {
        let replay = self.replay.take()?;
        let (segment, reached) = replay.finished().await;
        if !reached {
            return None;
        }
        let progress = self.progress.as_mut()?;
        let was_completed = progress.is_completed();
        let changed = progress.mark_segment_viewed(segment.key());
        let newly_completed = !was_completed && progress.is_completed();
        debug!(screen = self.index, segment = %segment.key(), changed, newly_completed, "segment viewed");
        Some(SettledReplay {
            segment,
            changed,
            newly_completed,
        })
    }

    /// Restart the video: pending alerts are dropped, persisted progress stays.
    pub fn retry(&mut self) {
        self.cancel_replay();
        self.alerts.clear();
    }

    /// Drop all ephemeral state before leaving the screen.
    pub fn reset(&mut self) {
        self.cancel_replay();
        self.alerts.clear();
        self.progress = None;
    }

    fn cancel_replay(&mut self) {
        if let Some(replay) = self.replay.take() {
            replay.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screens::ScriptedPlayback;
    use player_core::model::PracticeKind;

    fn screen() -> ScreenDef {
        ScreenDef {
            title: "Loading dock".into(),
            content: String::new(),
            video: "dock.mp4".into(),
            kind: PracticeKind::Bad,
            segments: vec![
                Segment::new(0.0, 5.0, "Helmet").unwrap(),
                Segment::new(10.0, 15.0, "Forklift").unwrap(),
            ],
        }
    }

    fn tracker() -> ScreenTracker {
        ScreenTracker::open(0, &screen(), None, Duration::from_millis(100))
    }

    #[test]
    fn evaluation_is_idempotent_and_keeps_alerts() {
        let mut tracker = tracker();
        tracker.record_alert(3.0);
        tracker.record_alert(3.0);
        tracker.record_alert(12.0);

        let first = tracker.evaluate();
        let second = tracker.evaluate();
        assert_eq!(first, second);
        assert_eq!(first.incorrect_alerts(), &[3.0]);
        assert_eq!(tracker.phase(), ScreenPhase::Completed);
        assert!(tracker.can_advance());
    }

    #[test]
    fn unmarked_segments_block_advance() {
        let mut tracker = tracker();
        tracker.record_alert(2.0);
        tracker.evaluate();
        assert_eq!(tracker.phase(), ScreenPhase::SegmentsPending);
        assert!(!tracker.can_advance());
    }

    #[test]
    fn replay_requires_evaluation_and_a_known_target() {
        let video: Arc<dyn VideoPlayback> = Arc::new(ScriptedPlayback::new());
        let mut tracker = tracker();
        assert!(matches!(
            tracker.start_replay(ReplayTarget::Unmarked(0), video.clone()),
            Err(PlayerError::NotEvaluated)
        ));

        tracker.evaluate();
        assert!(matches!(
            tracker.start_replay(ReplayTarget::Correct(0), video),
            Err(PlayerError::NoSuchSegment)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn replaying_every_unmarked_segment_completes_the_screen() {
        let video = Arc::new(ScriptedPlayback::new());
        let mut tracker = tracker();
        tracker.record_alert(1.0);
        tracker.evaluate();

        let correct = tracker.start_replay(ReplayTarget::Correct(0), video.clone()).unwrap();
        assert_eq!(correct.title(), "Helmet");
        assert!(!tracker.record_alert(2.0));
        assert!(matches!(
            tracker.start_replay(ReplayTarget::Unmarked(0), video.clone()),
            Err(PlayerError::ReplayInProgress)
        ));
        let settled = tracker.settle_replay().await.unwrap();
        assert!(settled.changed);
        assert!(!settled.newly_completed);
        assert_eq!(tracker.phase(), ScreenPhase::SegmentsPending);

        tracker.start_replay(ReplayTarget::Unmarked(0), video.clone()).unwrap();
        let settled = tracker.settle_replay().await.unwrap();
        assert_eq!(settled.segment.title(), "Forklift");
        assert!(settled.newly_completed);
        assert_eq!(tracker.phase(), ScreenPhase::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cancels_replay_and_forgets_progress() {
        let video = Arc::new(ScriptedPlayback::new());
        let mut tracker = tracker();
        tracker.evaluate();
        tracker.start_replay(ReplayTarget::Unmarked(1), video.clone()).unwrap();

        tracker.reset();
        assert!(!tracker.is_replaying());
        assert_eq!(tracker.phase(), ScreenPhase::Unviewed);
        assert!(tracker.settle_replay().await.is_none());
        assert!(tracker.alerts().is_empty());
    }

    #[test]
    fn retry_clears_alerts_only() {
        let mut tracker = tracker();
        tracker.record_alert(3.0);
        tracker.evaluate();
        tracker.record_alert(11.0);

        tracker.retry();
        assert!(tracker.alerts().is_empty());
        assert!(tracker.progress().is_some());
    }
}
