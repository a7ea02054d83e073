//! Per-screen progress: alert collection, evaluation and segment replays.

mod playback;
mod replay;
mod tracker;

pub use playback::{ScriptedPlayback, VideoPlayback};
pub use replay::ReplayTimer;
pub use tracker::{ReplayTarget, ScreenPhase, ScreenTracker, SettledReplay};
