use std::sync::Arc;

use player_core::model::{CourseStatus, ScreenProgress, SuspendData};
use storage::{CacheKey, LocalCache, ScormSession};
use tracing::{debug, info, warn};

/// Where resumed progress came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Store,
    Cache,
}

/// Progress read at session start.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    /// `None` when nothing usable was persisted.
    pub data: Option<SuspendData>,
    pub status: CourseStatus,
    pub source: LoadSource,
}

/// What a save reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveOutcome {
    pub cached: bool,
    pub mirrored: bool,
}

/// Single owner of `SuspendData`, fanning writes out to the local cache and the LMS store.
///
/// The cache is written on every save. The store only while it is live and the course
/// has not been completed; completion freezes the store record for good.
pub struct ProgressSync {
    cache: Arc<dyn LocalCache>,
    store: Option<Arc<ScormSession>>,
    data: SuspendData,
    frozen: bool,
}

impl ProgressSync {
    /// Read resumable progress, preferring a live store.
    ///
    /// Store values are copied into the cache so a later offline session resumes from
    /// the same point. Malformed data reads as `None`.
    pub async fn load(cache: &dyn LocalCache, store: Option<&ScormSession>) -> Loaded {
        if let Some(store) = store.filter(|store| store.is_active()) {
            let status = CourseStatus::from_persisted(store.status().await.as_deref());
            let raw = store.suspend_data().await.unwrap_or_else(|| "{}".to_owned());
            write_cache(cache, CacheKey::Status, status.as_str());
            write_cache(cache, CacheKey::SuspendData, &raw);
            return Loaded {
                data: decode(&raw),
                status,
                source: LoadSource::Store,
            };
        }

        let status = read_cache(cache, CacheKey::Status);
        let raw = read_cache(cache, CacheKey::SuspendData);
        Loaded {
            data: raw.as_deref().and_then(decode),
            status: CourseStatus::from_persisted(status.as_deref()),
            source: LoadSource::Cache,
        }
    }

    #[must_use]
    pub fn new(
        cache: Arc<dyn LocalCache>,
        store: Option<Arc<ScormSession>>,
        data: SuspendData,
        status: CourseStatus,
    ) -> Self {
        Self {
            cache,
            store,
            data,
            frozen: status.is_completed(),
        }
    }

    /// Owned copy of the current progress.
    #[must_use]
    pub fn snapshot(&self) -> SuspendData {
        self.data.clone()
    }

    #[must_use]
    pub fn screen(&self, index: usize) -> Option<&ScreenProgress> {
        self.data.screen(index)
    }

    /// Whether store writes are suppressed after completion.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    #[must_use]
    pub fn store(&self) -> Option<&ScormSession> {
        self.store.as_deref()
    }

    /// Replace one screen's progress and persist the whole snapshot.
    pub async fn save_screen(&mut self, index: usize, progress: ScreenProgress) -> SaveOutcome {
        self.data.set_screen(index, progress);
        self.save().await
    }

    /// Persist the current snapshot. Never fails: each backend's failure is logged.
    pub async fn save(&self) -> SaveOutcome {
        let json = match self.data.to_json() {
            Ok(json) => json,
            Err(err) => {
                warn!("suspend data not encodable: {err}");
                return SaveOutcome::default();
            }
        };

        let cached = write_cache(self.cache.as_ref(), CacheKey::SuspendData, &json);
        let mirrored = match self.live_store() {
            Some(store) => match store.set_suspend_data(&json).await {
                Ok(()) => true,
                Err(err) => {
                    debug!("store rejected suspend data: {err}");
                    false
                }
            },
            None => false,
        };
        SaveOutcome { cached, mirrored }
    }

    /// Mirror the course progress as the store's raw score.
    pub async fn mirror_score(&self, percent: f64) -> bool {
        let Some(store) = self.live_store() else {
            return false;
        };
        match store.set_score(percent).await {
            Ok(()) => true,
            Err(err) => {
                debug!("store rejected score: {err}");
                false
            }
        }
    }

    /// Record course completion in both backends and close the store.
    ///
    /// The final snapshot reaches the store before it freezes. Returns `false` if the
    /// course was already frozen.
    pub async fn complete(&mut self, session_seconds: u64) -> bool {
        if self.frozen {
            return false;
        }
        self.save().await;
        write_cache(self.cache.as_ref(), CacheKey::Status, CourseStatus::Completed.as_str());
        if let Some(store) = self.live_store() {
            if let Err(err) = store.set_status(CourseStatus::Completed).await {
                debug!("store rejected completion: {err}");
            }
            flush_and_close(store, session_seconds).await;
        }
        self.frozen = true;
        info!(session_seconds, "course completed");
        true
    }

    /// Persist the snapshot once more, flush the session time and close the store.
    ///
    /// A frozen record gets neither; the store is only closed.
    pub async fn terminate(&self, session_seconds: u64) {
        self.save().await;
        if let Some(store) = self.live_store() {
            flush_and_close(store, session_seconds).await;
        } else if let Some(store) = self.store.as_deref().filter(|store| store.is_active()) {
            if let Err(err) = store.terminate().await {
                debug!("store terminate failed: {err}");
            }
        }
    }

    fn live_store(&self) -> Option<&ScormSession> {
        if self.frozen {
            return None;
        }
        self.store.as_deref().filter(|store| store.is_active())
    }
}

async fn flush_and_close(store: &ScormSession, session_seconds: u64) {
    if let Err(err) = store.set_session_time(session_seconds).await {
        debug!("store rejected session time: {err}");
    }
    if let Err(err) = store.terminate().await {
        debug!("store terminate failed: {err}");
    }
}

fn decode(raw: &str) -> Option<SuspendData> {
    let data = SuspendData::parse(raw);
    if data.is_none() && !matches!(raw.trim(), "" | "{}") {
        debug!("ignoring malformed suspend data");
    }
    data
}

fn read_cache(cache: &dyn LocalCache, key: CacheKey) -> Option<String> {
    cache.get(key).unwrap_or_else(|err| {
        warn!(%key, "local cache read failed: {err}");
        None
    })
}

fn write_cache(cache: &dyn LocalCache, key: CacheKey, value: &str) -> bool {
    match cache.set(key, value) {
        Ok(()) => true,
        Err(err) => {
            warn!(%key, "local cache write failed: {err}");
            false
        }
    }
}
