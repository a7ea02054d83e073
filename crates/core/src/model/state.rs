use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall course status as persisted in both backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    #[default]
    Incomplete,
    Completed,
}

impl CourseStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CourseStatus::Incomplete => "incomplete",
            CourseStatus::Completed => "completed",
        }
    }

    /// Read a persisted status string. Anything other than `"completed"` resumes as incomplete.
    #[must_use]
    pub fn from_persisted(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("completed") => CourseStatus::Completed,
            _ => CourseStatus::Incomplete,
        }
    }

    #[must_use]
    pub fn is_completed(self) -> bool {
        matches!(self, CourseStatus::Completed)
    }
}

impl fmt::Display for CourseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the learner is: one of the two sentinel screens or a real screen index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenPosition {
    Welcome,
    Screen(usize),
    Finish,
}

impl ScreenPosition {
    #[must_use]
    pub fn index(self) -> Option<usize> {
        match self {
            ScreenPosition::Screen(index) => Some(index),
            ScreenPosition::Welcome | ScreenPosition::Finish => None,
        }
    }
}

impl fmt::Display for ScreenPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenPosition::Welcome => f.write_str("welcome"),
            ScreenPosition::Screen(index) => write!(f, "screen {}", index + 1),
            ScreenPosition::Finish => f.write_str("finish"),
        }
    }
}

/// Session-level course state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseState {
    position: ScreenPosition,
    status: CourseStatus,
    session_seconds: u64,
}

impl CourseState {
    #[must_use]
    pub fn new(position: ScreenPosition, status: CourseStatus) -> Self {
        Self {
            position,
            status,
            session_seconds: 0,
        }
    }

    #[must_use]
    pub fn position(&self) -> ScreenPosition {
        self.position
    }

    pub fn set_position(&mut self, position: ScreenPosition) {
        self.position = position;
    }

    #[must_use]
    pub fn status(&self) -> CourseStatus {
        self.status
    }

    #[must_use]
    pub fn session_seconds(&self) -> u64 {
        self.session_seconds
    }

    pub fn set_session_seconds(&mut self, seconds: u64) {
        self.session_seconds = seconds;
    }

    /// Move to `Completed`. Returns `true` only on the first transition.
    ///
    /// There is no way back to `Incomplete`.
    pub fn mark_completed(&mut self) -> bool {
        if self.status.is_completed() {
            return false;
        }
        self.status = CourseStatus::Completed;
        true
    }
}
