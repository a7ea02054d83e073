//! LMS session store: protocol, version strategy and the session wrapper.

mod api;
mod session;

use std::fmt;
use std::str::FromStr;

use player_core::TimeFormat;
use thiserror::Error;

pub use api::{InMemoryScormApi, ScormApi};
pub use session::ScormSession;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unsupported SCORM version {0:?}; expected 1.2 or 2004")]
pub struct ScormVersionError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScormVersion {
    V1_2,
    V2004,
}

impl FromStr for ScormVersion {
    type Err = ScormVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.2" => Ok(Self::V1_2),
            "2004" => Ok(Self::V2004),
            other => Err(ScormVersionError(other.to_owned())),
        }
    }
}

impl fmt::Display for ScormVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScormVersion::V1_2 => f.write_str("1.2"),
            ScormVersion::V2004 => f.write_str("2004"),
        }
    }
}

/// Fields the player reads or writes, by meaning rather than wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmiField {
    Status,
    SuspendData,
    Score,
    SessionTime,
    TotalTime,
    LearnerName,
    LearnerId,
}

/// Maps semantic fields to one runtime's element names and time format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmiVocabulary {
    version: ScormVersion,
    status: &'static str,
    suspend_data: &'static str,
    score: &'static str,
    session_time: &'static str,
    total_time: &'static str,
    learner_name: &'static str,
    learner_id: &'static str,
    /// Older element that suspend data may have been written to.
    legacy_suspend_data: Option<&'static str>,
    time_format: TimeFormat,
}

impl CmiVocabulary {
    pub const SCORM_1_2: Self = Self {
        version: ScormVersion::V1_2,
        status: "cmi.core.lesson_status",
        suspend_data: "cmi.suspend_data",
        score: "cmi.core.score.raw",
        session_time: "cmi.core.session_time",
        total_time: "cmi.core.total_time",
        learner_name: "cmi.core.student_name",
        learner_id: "cmi.core.student_id",
        legacy_suspend_data: None,
        time_format: TimeFormat::Clock,
    };

    pub const SCORM_2004: Self = Self {
        version: ScormVersion::V2004,
        status: "cmi.completion_status",
        suspend_data: "cmi.suspend_data",
        score: "cmi.score.raw",
        session_time: "cmi.session_time",
        total_time: "cmi.total_time",
        learner_name: "cmi.learner_name",
        learner_id: "cmi.learner_id",
        legacy_suspend_data: Some("cmi.location"),
        time_format: TimeFormat::Iso8601,
    };

    #[must_use]
    pub fn for_version(version: ScormVersion) -> Self {
        match version {
            ScormVersion::V1_2 => Self::SCORM_1_2,
            ScormVersion::V2004 => Self::SCORM_2004,
        }
    }

    #[must_use]
    pub fn version(&self) -> ScormVersion {
        self.version
    }

    #[must_use]
    pub fn element(&self, field: CmiField) -> &'static str {
        match field {
            CmiField::Status => self.status,
            CmiField::SuspendData => self.suspend_data,
            CmiField::Score => self.score,
            CmiField::SessionTime => self.session_time,
            CmiField::TotalTime => self.total_time,
            CmiField::LearnerName => self.learner_name,
            CmiField::LearnerId => self.learner_id,
        }
    }

    /// Element read for suspend data when the standard one is empty.
    #[must_use]
    pub fn legacy_suspend_data(&self) -> Option<&'static str> {
        self.legacy_suspend_data
    }

    #[must_use]
    pub fn time_format(&self) -> TimeFormat {
        self.time_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_versions() {
        assert_eq!("1.2".parse::<ScormVersion>(), Ok(ScormVersion::V1_2));
        assert_eq!(" 2004 ".parse::<ScormVersion>(), Ok(ScormVersion::V2004));
        assert!("1.3".parse::<ScormVersion>().is_err());
    }

    #[test]
    fn vocabularies_differ_per_version() {
        let old = CmiVocabulary::for_version(ScormVersion::V1_2);
        let new = CmiVocabulary::for_version(ScormVersion::V2004);

        assert_eq!(old.element(CmiField::Status), "cmi.core.lesson_status");
        assert_eq!(new.element(CmiField::Status), "cmi.completion_status");
        assert_eq!(old.element(CmiField::LearnerId), "cmi.core.student_id");
        assert_eq!(new.element(CmiField::SessionTime), "cmi.session_time");
        assert_eq!(old.time_format().encode(61), "0000:01:01");
        assert_eq!(new.time_format().encode(61), "PT0000H01M01S");
    }
}
