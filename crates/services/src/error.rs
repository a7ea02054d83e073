//! Shared error types for the services crate.

use thiserror::Error;

use player_core::model::ScreenPosition;
use storage::StorageError;
use storage::scorm::ScormVersionError;

/// Errors emitted by `Player` operations.
///
/// These are misuse errors (acting on the wrong screen, replaying an unknown segment).
/// Persistence trouble never shows up here; it is logged and absorbed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlayerError {
    #[error("not on a course screen")]
    NotOnScreen,
    #[error("screen {index} is not completed yet")]
    ScreenIncomplete { index: usize },
    #[error("screen video has not been evaluated yet")]
    NotEvaluated,
    #[error("no segment to replay at that position")]
    NoSuchSegment,
    #[error("a segment replay is already running")]
    ReplayInProgress,
    #[error("no such position: {0}")]
    InvalidPosition(ScreenPosition),
}

/// Errors emitted while resolving who is taking the course.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BootstrapError {
    #[error("learner name cannot be empty")]
    EmptyName,
    #[error("learner email cannot be empty")]
    EmptyEmail,
    #[error("invalid LMS home page: {0}")]
    HomePage(#[from] url::ParseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while reading `PlayerConfig`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error(transparent)]
    ScormVersion(#[from] ScormVersionError),
    #[error("{name} must be a positive number of milliseconds, got {raw:?}")]
    Millis { name: &'static str, raw: String },
    #[error("invalid {name}: {source}")]
    Url {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
}
