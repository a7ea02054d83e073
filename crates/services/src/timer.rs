use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

/// Counts session seconds, one per tick while active.
///
/// The counter lives only in memory. Flushing it to the store is the caller's job.
pub struct SessionTimer {
    seconds: Arc<AtomicU64>,
    active: Arc<AtomicBool>,
    tick: Duration,
    ticker: Option<JoinHandle<()>>,
}

impl SessionTimer {
    #[must_use]
    pub fn new(tick: Duration) -> Self {
        Self {
            seconds: Arc::new(AtomicU64::new(0)),
            active: Arc::new(AtomicBool::new(false)),
            tick,
            ticker: None,
        }
    }

    /// Spawn the ticker and activate counting. Restarting keeps the count.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
        self.active.store(true, Ordering::SeqCst);

        let seconds = self.seconds.clone();
        let active = self.active.clone();
        let tick = self.tick;
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + tick, tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                interval.tick().await;
                if active.load(Ordering::SeqCst) {
                    seconds.fetch_add(1, Ordering::SeqCst);
                }
            }
        }));
        debug!("session timer started");
    }

    #[must_use]
    pub fn seconds(&self) -> u64 {
        self.seconds.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.ticker.is_some() && self.active.load(Ordering::SeqCst)
    }

    pub fn pause(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            debug!(seconds = self.seconds(), "session timer paused");
        }
    }

    pub fn resume(&self) {
        if self.ticker.is_some() {
            self.active.store(true, Ordering::SeqCst);
        }
    }

    /// Tear down the ticker and return the final count.
    pub fn stop(&mut self) -> u64 {
        self.active.store(false, Ordering::SeqCst);
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
        self.seconds()
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn settle() {
        // Let the ticker task observe the advanced clock.
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn counts_one_per_tick_while_active() {
        let mut timer = SessionTimer::new(Duration::from_secs(1));
        timer.start();
        assert_eq!(timer.seconds(), 0);

        time::sleep(Duration::from_millis(3500)).await;
        settle().await;
        assert_eq!(timer.seconds(), 3);

        timer.pause();
        time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(timer.seconds(), 3);

        timer.resume();
        time::sleep(Duration::from_secs(2)).await;
        settle().await;
        assert_eq!(timer.seconds(), 5);

        assert_eq!(timer.stop(), 5);
        time::sleep(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(timer.seconds(), 5);
        assert!(!timer.is_active());
    }

    #[test]
    fn unstarted_timer_ignores_resume() {
        let timer = SessionTimer::new(Duration::from_secs(1));
        timer.resume();
        assert!(!timer.is_active());
        assert_eq!(timer.seconds(), 0);
    }
}
