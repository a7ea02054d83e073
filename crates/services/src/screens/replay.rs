use std::sync::Arc;
use std::time::Duration;

use player_core::model::Segment;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::debug;

use super::VideoPlayback;

/// Plays one segment and samples the position until it reaches the segment's end.
///
/// Dropping the timer cancels the polling task, so a replay never outlives its screen.
pub struct ReplayTimer {
    segment: Segment,
    done: oneshot::Receiver<()>,
    handle: JoinHandle<()>,
}

impl ReplayTimer {
    /// Seek to the segment start, play, and start polling every `poll`.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn start(playback: Arc<dyn VideoPlayback>, segment: Segment, poll: Duration) -> Self {
        playback.seek(segment.start());
        playback.play();

        let end = segment.end();
        let (tx, done) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(poll);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if playback.current_time() >= end {
                    playback.pause();
                    let _ = tx.send(());
                    break;
                }
            }
        });
        debug!(segment = %segment.key(), "segment replay started");

        Self {
            segment,
            done,
            handle,
        }
    }

    #[must_use]
    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    /// Wait for the end boundary. `false` if the replay was cancelled first.
    pub async fn finished(mut self) -> (Segment, bool) {
        let reached = (&mut self.done).await.is_ok();
        (self.segment.clone(), reached)
    }

    pub fn cancel(&self) {
        if !self.handle.is_finished() {
            debug!(segment = %self.segment.key(), "segment replay cancelled");
        }
        self.handle.abort();
    }
}

impl Drop for ReplayTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screens::ScriptedPlayback;

    #[tokio::test(start_paused = true)]
    async fn stops_at_the_segment_end() {
        let video = Arc::new(ScriptedPlayback::new());
        let segment = Segment::new(10.0, 12.0, "Gloves").unwrap();
        let timer = ReplayTimer::start(video.clone(), segment, Duration::from_millis(100));

        let (segment, reached) = timer.finished().await;
        assert!(reached);
        assert_eq!(segment.title(), "Gloves");
        assert_eq!(video.seeks(), vec![10.0]);
        assert!(!video.is_playing());
        let position = video.current_time();
        assert!((12.0..12.2).contains(&position), "stopped at {position}");
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_polling() {
        let video = Arc::new(ScriptedPlayback::new());
        let segment = Segment::new(0.0, 30.0, "Long").unwrap();
        let timer = ReplayTimer::start(video.clone(), segment, Duration::from_millis(100));

        time::sleep(Duration::from_secs(1)).await;
        timer.cancel();
        let (_, reached) = timer.finished().await;
        assert!(!reached);
        assert_eq!(video.pause_count(), 0);
    }
}
