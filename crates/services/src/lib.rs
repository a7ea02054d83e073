#![forbid(unsafe_code)]

pub mod bootstrap;
pub mod config;
pub mod course_progress;
pub mod error;
pub mod events;
pub mod player;
pub mod screens;
pub mod sync;
pub mod timer;

pub use player_core::Clock;

pub use bootstrap::{Bootstrap, ResumeState, SessionBootstrap};
pub use config::PlayerConfig;
pub use course_progress::{Navigator, NextStep, initial_position, progress_percent};
pub use error::{BootstrapError, ConfigError, PlayerError};
pub use events::{EventFactory, EventSink, RecordingSink, TracingSink, TrainingEvent, Verb};
pub use player::Player;
pub use screens::{
    ReplayTarget, ReplayTimer, ScreenPhase, ScreenTracker, ScriptedPlayback, SettledReplay,
    VideoPlayback,
};
pub use sync::{LoadSource, Loaded, ProgressSync, SaveOutcome};
pub use timer::SessionTimer;
