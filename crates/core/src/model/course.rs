use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Segment, SegmentError};

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course must contain at least one screen")]
    NoScreens,

    #[error("screen {index} has no video")]
    MissingVideo { index: usize },

    #[error("screen {index}: {source}")]
    InvalidSegment {
        index: usize,
        #[source]
        source: SegmentError,
    },

    #[error("course file is not valid: {0}")]
    Parse(String),
}

/// Whether a screen asks the learner to spot good or bad practices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PracticeKind {
    #[default]
    Good,
    Bad,
}

/// Static definition of one course screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenDef {
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub video: String,
    #[serde(default, rename = "type")]
    pub kind: PracticeKind,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// Ordered screen sequence, excluding the welcome and finish sentinels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    title: String,
    screens: Vec<ScreenDef>,
}

impl Course {
    /// # Errors
    ///
    /// Returns `CourseError` if the course has no screens, a screen lacks a video,
    /// or any segment has invalid bounds.
    pub fn new(title: impl Into<String>, screens: Vec<ScreenDef>) -> Result<Self, CourseError> {
        let course = Self {
            title: title.into(),
            screens,
        };
        course.validate()?;
        Ok(course)
    }

    /// Parse and validate a course definition.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::Parse` for malformed JSON, otherwise the validation errors of
    /// [`Course::new`].
    pub fn from_json(raw: &str) -> Result<Self, CourseError> {
        let course: Course =
            serde_json::from_str(raw).map_err(|err| CourseError::Parse(err.to_string()))?;
        course.validate()?;
        Ok(course)
    }

    fn validate(&self) -> Result<(), CourseError> {
        if self.screens.is_empty() {
            return Err(CourseError::NoScreens);
        }
        for (index, screen) in self.screens.iter().enumerate() {
            if screen.video.trim().is_empty() {
                return Err(CourseError::MissingVideo { index });
            }
            for segment in &screen.segments {
                segment
                    .validate()
                    .map_err(|source| CourseError::InvalidSegment { index, source })?;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn screens(&self) -> &[ScreenDef] {
        &self.screens
    }

    #[must_use]
    pub fn screen(&self, index: usize) -> Option<&ScreenDef> {
        self.screens.get(index)
    }

    /// Number of real screens. Never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.screens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }
}
