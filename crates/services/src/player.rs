//! The player session: one learner, one course, from start to quit.

use std::sync::Arc;
use std::time::Duration;

use player_core::format::first_name;
use player_core::model::{
    Actor, Course, CourseStatus, ScreenPosition, ScreenProgress, Segment, SuspendData,
};
use tracing::{debug, info};

use crate::bootstrap::{ResumeState, SessionBootstrap};
use crate::config::PlayerConfig;
use crate::course_progress::{Navigator, initial_position, progress_percent};
use crate::error::PlayerError;
use crate::events::{EventFactory, EventSink};
use crate::screens::{ReplayTarget, ScreenTracker, SettledReplay, VideoPlayback};
use crate::sync::ProgressSync;
use crate::timer::SessionTimer;
use crate::Clock;

/// Drives a course session: navigation, screen tracking, persistence, timing and events.
pub struct Player {
    course: Course,
    actor: Actor,
    user_name: String,
    navigator: Navigator,
    sync: ProgressSync,
    tracker: Option<ScreenTracker>,
    timer: SessionTimer,
    events: EventFactory,
    sink: Arc<dyn EventSink>,
    playback: Arc<dyn VideoPlayback>,
    poll: Duration,
    quit_sent: bool,
}

impl Player {
    /// Build a player for a resolved learner. Nothing runs until [`Player::start`].
    #[must_use]
    pub fn new(
        course: Course,
        config: &PlayerConfig,
        bootstrap: &SessionBootstrap,
        resume: ResumeState,
        sink: Arc<dyn EventSink>,
        playback: Arc<dyn VideoPlayback>,
    ) -> Self {
        let sync = bootstrap.progress_sync(&resume);
        let position = initial_position(resume.loaded.data.as_ref(), course.len());
        let navigator = Navigator::new(position, resume.loaded.status, course.len());
        let events = EventFactory::new(config.event_base.clone(), course.title());
        Self {
            course,
            actor: resume.actor,
            user_name: resume.user_name,
            navigator,
            sync,
            tracker: None,
            timer: SessionTimer::new(config.session_tick),
            events,
            sink,
            playback,
            poll: config.replay_poll,
            quit_sent: false,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.events = self.events.with_clock(clock);
        self
    }

    /// Emit the started event, start the session timer and open the resume position.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        info!(
            position = %self.navigator.position(),
            status = %self.navigator.status(),
            "player started"
        );
        self.sink.emit(self.events.started(&self.actor));
        self.timer.start();
        self.open_current();
    }

    // ─── ACCESSORS ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// Given name for greetings.
    #[must_use]
    pub fn first_name(&self) -> &str {
        first_name(&self.user_name)
    }

    #[must_use]
    pub fn position(&self) -> ScreenPosition {
        self.navigator.position()
    }

    #[must_use]
    pub fn status(&self) -> CourseStatus {
        self.navigator.status()
    }

    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        progress_percent(&self.sync.snapshot(), self.course.len())
    }

    #[must_use]
    pub fn session_seconds(&self) -> u64 {
        self.timer.seconds()
    }

    #[must_use]
    pub fn snapshot(&self) -> SuspendData {
        self.sync.snapshot()
    }

    #[must_use]
    pub fn screen(&self) -> Option<&ScreenTracker> {
        self.tracker.as_ref()
    }

    #[must_use]
    pub fn progress_sync(&self) -> &ProgressSync {
        &self.sync
    }

    // ─── SCREEN ────────────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns `PlayerError::NotOnScreen` on the welcome or finish screen.
    pub fn play_video(&mut self) -> Result<(), PlayerError> {
        self.tracker_mut()?;
        self.playback.play();
        Ok(())
    }

    /// Alert at the current playback position.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::NotOnScreen` on the welcome or finish screen.
    pub fn record_alert(&mut self) -> Result<bool, PlayerError> {
        let time = self.playback.current_time();
        self.record_alert_at(time)
    }

    /// # Errors
    ///
    /// Returns `PlayerError::NotOnScreen` on the welcome or finish screen.
    pub fn record_alert_at(&mut self, time: f64) -> Result<bool, PlayerError> {
        Ok(self.tracker_mut()?.record_alert(time))
    }

    /// The video reached its end: evaluate the alerts and persist the result.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::NotOnScreen` on the welcome or finish screen.
    pub async fn video_ended(&mut self) -> Result<ScreenProgress, PlayerError> {
        let tracker = self.tracker.as_mut().ok_or(PlayerError::NotOnScreen)?;
        let index = tracker.index();
        let progress = tracker.evaluate();
        let event = self.events.viewed_video(&self.actor, tracker.video_title());
        self.sink.emit(event);

        self.sync.save_screen(index, progress.clone()).await;
        if progress.is_completed() {
            self.mirror_score().await;
        }
        Ok(progress)
    }

    /// Restart the screen's video, dropping the alerts of this viewing.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::NotOnScreen` on the welcome or finish screen.
    pub fn retry(&mut self) -> Result<(), PlayerError> {
        let tracker = self.tracker.as_mut().ok_or(PlayerError::NotOnScreen)?;
        tracker.retry();
        let event = self.events.retried(&self.actor, tracker.video_title());
        self.sink.emit(event);
        self.playback.seek(0.0);
        self.playback.play();
        Ok(())
    }

    /// Start replaying one evaluated segment.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::NotOnScreen` off a course screen, plus whatever
    /// [`ScreenTracker::start_replay`] rejects.
    pub fn replay_segment(&mut self, target: ReplayTarget) -> Result<Segment, PlayerError> {
        let tracker = self.tracker.as_mut().ok_or(PlayerError::NotOnScreen)?;
        let segment = tracker.start_replay(target, self.playback.clone())?;
        let event = self
            .events
            .viewed_segment(&self.actor, tracker.video_title(), segment.title());
        self.sink.emit(event);
        Ok(segment)
    }

    /// Wait for the running replay to end and persist the viewed segment.
    ///
    /// `None` when nothing was replaying or the replay was cancelled.
    pub async fn settle_replay(&mut self) -> Option<SettledReplay> {
        let tracker = self.tracker.as_mut()?;
        let settled = tracker.settle_replay().await?;
        let index = tracker.index();
        let progress = tracker.progress().cloned();
        if settled.changed
            && let Some(progress) = progress
        {
            self.sync.save_screen(index, progress).await;
        }
        if settled.newly_completed {
            self.mirror_score().await;
        }
        Some(settled)
    }

    // ─── NAVIGATION ────────────────────────────────────────────────────────────

    /// Move forward. Leaving the last screen completes the course.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::ScreenIncomplete` while the current screen is not completed.
    pub async fn next(&mut self) -> Result<ScreenPosition, PlayerError> {
        if let Some(tracker) = &self.tracker
            && !tracker.can_advance()
        {
            return Err(PlayerError::ScreenIncomplete {
                index: tracker.index(),
            });
        }
        self.leave_screen();
        let step = self.navigator.next();
        if step.completed_course {
            self.complete_course().await;
        }
        self.open_current();
        Ok(step.position)
    }

    pub fn previous(&mut self) -> ScreenPosition {
        self.leave_screen();
        let position = self.navigator.previous();
        self.open_current();
        position
    }

    /// Jump to any position, such as back to welcome from the finish screen.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::InvalidPosition` for a screen past the end of the course.
    pub fn go_to(&mut self, position: ScreenPosition) -> Result<ScreenPosition, PlayerError> {
        if let ScreenPosition::Screen(index) = position
            && index >= self.course.len()
        {
            return Err(PlayerError::InvalidPosition(position));
        }
        self.leave_screen();
        let position = self.navigator.go_to(position)?;
        self.open_current();
        Ok(position)
    }

    // ─── LIFECYCLE ─────────────────────────────────────────────────────────────

    /// Page unload: emit the quit event once, persist progress, flush session time and
    /// close the store.
    ///
    /// Returns the final session seconds.
    pub async fn terminate(&mut self) -> u64 {
        self.leave_screen();
        let seconds = self.timer.stop();
        if self.quit_sent {
            return seconds;
        }
        self.quit_sent = true;
        self.navigator.set_session_seconds(seconds);
        self.sink.emit(self.events.quitted(&self.actor, seconds));
        self.sync.terminate(seconds).await;
        info!(session_seconds = seconds, "player terminated");
        seconds
    }

    async fn complete_course(&mut self) {
        let seconds = self.timer.seconds();
        self.navigator.set_session_seconds(seconds);
        self.sync.complete(seconds).await;
        self.sink.emit(self.events.completed(&self.actor));
        self.timer.pause();
    }

    async fn mirror_score(&self) {
        let percent = self.progress_percent();
        let mirrored = self.sync.mirror_score(percent).await;
        debug!(percent, mirrored, "score");
    }

    fn open_current(&mut self) {
        self.tracker = self.navigator.position().index().and_then(|index| {
            let screen = self.course.screen(index)?;
            let persisted = self.sync.screen(index).cloned();
            Some(ScreenTracker::open(index, screen, persisted, self.poll))
        });
    }

    fn leave_screen(&mut self) {
        if let Some(mut tracker) = self.tracker.take() {
            tracker.reset();
        }
        self.playback.pause();
    }

    fn tracker_mut(&mut self) -> Result<&mut ScreenTracker, PlayerError> {
        self.tracker.as_mut().ok_or(PlayerError::NotOnScreen)
    }
}
