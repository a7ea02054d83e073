//! Course-level progress: percentage, resume position and navigation.

use player_core::model::{CourseState, CourseStatus, ScreenPosition, SuspendData};
use tracing::debug;

use crate::error::PlayerError;

/// Share of completed screens, 0 to 100. Zero for an empty course.
#[must_use]
pub fn progress_percent(data: &SuspendData, total_screens: usize) -> f64 {
    if total_screens == 0 {
        return 0.0;
    }
    let completed = data.completed_count().min(total_screens);
    100.0 * completed as f64 / total_screens as f64
}

/// Screen to open on resume.
///
/// No persisted data opens the welcome screen. Otherwise the screen after the last
/// completed one, or the finish screen when that was the last screen.
#[must_use]
pub fn initial_position(data: Option<&SuspendData>, total_screens: usize) -> ScreenPosition {
    let Some(data) = data else {
        return ScreenPosition::Welcome;
    };
    let next = data.last_completed_index().map_or(0, |last| last + 1);
    if next >= total_screens {
        ScreenPosition::Finish
    } else {
        ScreenPosition::Screen(next)
    }
}

/// Result of a forward step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextStep {
    pub position: ScreenPosition,
    /// Set only on the step that first completed the course.
    pub completed_course: bool,
}

/// Moves through welcome, the course screens and finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigator {
    state: CourseState,
    total_screens: usize,
}

impl Navigator {
    #[must_use]
    pub fn new(position: ScreenPosition, status: CourseStatus, total_screens: usize) -> Self {
        Self {
            state: CourseState::new(position, status),
            total_screens,
        }
    }

    #[must_use]
    pub fn position(&self) -> ScreenPosition {
        self.state.position()
    }

    #[must_use]
    pub fn status(&self) -> CourseStatus {
        self.state.status()
    }

    #[must_use]
    pub fn state(&self) -> &CourseState {
        &self.state
    }

    pub fn set_session_seconds(&mut self, seconds: u64) {
        self.state.set_session_seconds(seconds);
    }

    #[must_use]
    pub fn total_screens(&self) -> usize {
        self.total_screens
    }

    /// Step forward. Leaving the last screen completes the course the first time.
    pub fn next(&mut self) -> NextStep {
        let last = self.total_screens.saturating_sub(1);
        let (position, completes) = match self.state.position() {
            ScreenPosition::Welcome if self.total_screens == 0 => (ScreenPosition::Finish, false),
            ScreenPosition::Welcome => (ScreenPosition::Screen(0), false),
            ScreenPosition::Screen(index) if index >= last => (ScreenPosition::Finish, true),
            ScreenPosition::Screen(index) => (ScreenPosition::Screen(index + 1), false),
            ScreenPosition::Finish => (ScreenPosition::Finish, false),
        };
        let completed_course = completes && self.state.mark_completed();
        self.move_to(position);
        NextStep {
            position,
            completed_course,
        }
    }

    /// Step back. From finish this is the last real screen.
    pub fn previous(&mut self) -> ScreenPosition {
        let position = match self.state.position() {
            ScreenPosition::Welcome | ScreenPosition::Screen(0) => ScreenPosition::Welcome,
            ScreenPosition::Screen(index) => ScreenPosition::Screen(index - 1),
            ScreenPosition::Finish if self.total_screens == 0 => ScreenPosition::Welcome,
            ScreenPosition::Finish => ScreenPosition::Screen(self.total_screens - 1),
        };
        self.move_to(position);
        position
    }

    /// Jump anywhere in the course.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::InvalidPosition` for a screen index past the end.
    pub fn go_to(&mut self, position: ScreenPosition) -> Result<ScreenPosition, PlayerError> {
        if let ScreenPosition::Screen(index) = position
            && index >= self.total_screens
        {
            return Err(PlayerError::InvalidPosition(position));
        }
        self.move_to(position);
        Ok(position)
    }

    fn move_to(&mut self, position: ScreenPosition) {
        debug!(from = %self.state.position(), to = %position, "navigate");
        self.state.set_position(position);
    }
}
