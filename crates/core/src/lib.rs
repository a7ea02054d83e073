#![forbid(unsafe_code)]

pub mod duration;
pub mod error;
pub mod format;
pub mod matcher;
pub mod model;
pub mod time;

pub use duration::{TimeFormat, TimeFormatError};
pub use error::Error;
pub use matcher::{MatchOutcome, match_alerts};
pub use time::Clock;
