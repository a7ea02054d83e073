use std::sync::Mutex;

use tokio::time::Instant;

/// The video element the learner watches. Positions are in seconds.
pub trait VideoPlayback: Send + Sync {
    fn current_time(&self) -> f64;
    fn seek(&self, seconds: f64);
    fn play(&self);
    fn pause(&self);
}

#[derive(Debug, Default)]
struct ScriptedState {
    position: f64,
    playing_since: Option<Instant>,
    seeks: Vec<f64>,
    pauses: usize,
}

impl ScriptedState {
    fn position(&self) -> f64 {
        match self.playing_since {
            Some(since) => self.position + since.elapsed().as_secs_f64(),
            None => self.position,
        }
    }
}

/// Playback that advances at real speed on the tokio clock.
///
/// Under a paused test runtime the position moves only as virtual time advances.
#[derive(Debug, Default)]
pub struct ScriptedPlayback {
    state: Mutex<ScriptedState>,
}

impl ScriptedPlayback {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state.lock().is_ok_and(|state| state.playing_since.is_some())
    }

    /// Every position passed to `seek`, oldest first.
    #[must_use]
    pub fn seeks(&self) -> Vec<f64> {
        self.state
            .lock()
            .map(|state| state.seeks.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn pause_count(&self) -> usize {
        self.state.lock().map_or(0, |state| state.pauses)
    }
}

impl VideoPlayback for ScriptedPlayback {
    fn current_time(&self) -> f64 {
        self.state.lock().map_or(0.0, |state| state.position())
    }

    fn seek(&self, seconds: f64) {
        if let Ok(mut state) = self.state.lock() {
            state.position = seconds.max(0.0);
            state.seeks.push(seconds);
            if state.playing_since.is_some() {
                state.playing_since = Some(Instant::now());
            }
        }
    }

    fn play(&self) {
        if let Ok(mut state) = self.state.lock() {
            if state.playing_since.is_none() {
                state.playing_since = Some(Instant::now());
            }
        }
    }

    fn pause(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.position = state.position();
            state.playing_since = None;
            state.pauses += 1;
        }
    }
}
