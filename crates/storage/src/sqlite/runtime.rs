use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::SqliteRepository;
use crate::scorm::{CmiField, CmiVocabulary, ScormApi};

const NO_ERROR: &str = "0";
const GENERAL_EXCEPTION: &str = "101";
const NOT_INITIALIZED: &str = "301";
const READ_ONLY: &str = "403";

#[derive(Default)]
struct RuntimeState {
    initialized: bool,
    terminated: bool,
    pending: BTreeMap<String, String>,
    session_seconds: Option<u64>,
    last_error: &'static str,
    diagnostic: String,
}

impl RuntimeState {
    fn fail(&mut self, code: &'static str, diagnostic: impl Into<String>) {
        self.last_error = code;
        self.diagnostic = diagnostic.into();
    }

    fn ok(&mut self) {
        self.last_error = NO_ERROR;
        self.diagnostic.clear();
    }

    fn is_open(&self) -> bool {
        self.initialized && !self.terminated
    }
}

/// Local emulation of an LMS runtime, persisting one learner's CMI values in SQLite.
///
/// Writes are buffered until `commit`. On `terminate` the reported session time is
/// added to the stored total time, as a hosted LMS would do.
pub struct SqliteRuntime {
    repo: SqliteRepository,
    learner_id: String,
    vocabulary: CmiVocabulary,
    state: Mutex<RuntimeState>,
}

impl SqliteRuntime {
    #[must_use]
    pub fn new(repo: SqliteRepository, learner_id: impl Into<String>, vocabulary: CmiVocabulary) -> Self {
        Self {
            repo,
            learner_id: learner_id.into(),
            vocabulary,
            state: Mutex::new(RuntimeState {
                last_error: NO_ERROR,
                ..RuntimeState::default()
            }),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut RuntimeState) -> T) -> Option<T> {
        self.state.lock().ok().map(|mut guard| f(&mut guard))
    }

    fn is_read_only(&self, element: &str) -> bool {
        element == self.vocabulary.element(CmiField::LearnerName)
            || element == self.vocabulary.element(CmiField::LearnerId)
            || element == self.vocabulary.element(CmiField::TotalTime)
    }

    async fn flush(&self, extra: Vec<(String, String)>) -> bool {
        let Some(mut batch) = self.with_state(|state| {
            std::mem::take(&mut state.pending)
                .into_iter()
                .collect::<Vec<_>>()
        }) else {
            return false;
        };
        batch.extend(extra);
        if batch.is_empty() {
            return true;
        }
        match self.repo.put_values(&self.learner_id, &batch).await {
            Ok(()) => {
                debug!(learner = %self.learner_id, count = batch.len(), "committed cmi values");
                true
            }
            Err(err) => {
                self.with_state(|state| {
                    // Keep the values so a later commit can retry them.
                    for (element, value) in batch {
                        state.pending.entry(element).or_insert(value);
                    }
                    state.fail(GENERAL_EXCEPTION, err.to_string());
                });
                false
            }
        }
    }

    async fn accumulated_total(&self, session_seconds: u64) -> Option<(String, String)> {
        let element = self.vocabulary.element(CmiField::TotalTime);
        let format = self.vocabulary.time_format();
        let previous = match self.repo.get_value(&self.learner_id, element).await {
            Ok(Some(raw)) => format.decode(&raw).unwrap_or(0),
            Ok(None) => 0,
            Err(err) => {
                debug!("could not read total time: {err}");
                return None;
            }
        };
        Some((element.to_owned(), format.encode(previous.saturating_add(session_seconds))))
    }
}

#[async_trait]
impl ScormApi for SqliteRuntime {
    async fn initialize(&self) -> bool {
        if self.with_state(|state| state.initialized).unwrap_or(true) {
            self.with_state(|state| state.fail(GENERAL_EXCEPTION, "already initialized"));
            return false;
        }
        match self.repo.learner_name(&self.learner_id).await {
            Ok(_) => self
                .with_state(|state| {
                    state.initialized = true;
                    state.ok();
                })
                .is_some(),
            Err(err) => {
                self.with_state(|state| {
                    state.fail(GENERAL_EXCEPTION, format!("learner {}: {err}", self.learner_id));
                });
                false
            }
        }
    }

    async fn get_value(&self, element: &str) -> String {
        let Some(buffered) = self.with_state(|state| {
            if state.is_open() {
                state.ok();
                Ok(state.pending.get(element).cloned())
            } else {
                state.fail(NOT_INITIALIZED, format!("read of {element} outside a session"));
                Err(())
            }
        }) else {
            return String::new();
        };
        let Ok(buffered) = buffered else {
            return String::new();
        };
        if let Some(value) = buffered {
            return value;
        }

        let result = if element == self.vocabulary.element(CmiField::LearnerId) {
            Ok(Some(self.learner_id.clone()))
        } else if element == self.vocabulary.element(CmiField::LearnerName) {
            self.repo.learner_name(&self.learner_id).await.map(Some)
        } else {
            self.repo.get_value(&self.learner_id, element).await
        };
        match result {
            Ok(value) => value.unwrap_or_default(),
            Err(err) => {
                self.with_state(|state| state.fail(GENERAL_EXCEPTION, err.to_string()));
                String::new()
            }
        }
    }

    async fn set_value(&self, element: &str, value: &str) -> bool {
        let session_time = self.vocabulary.element(CmiField::SessionTime);
        let format = self.vocabulary.time_format();
        let read_only = self.is_read_only(element);
        self.with_state(|state| {
            if !state.is_open() {
                state.fail(NOT_INITIALIZED, format!("write of {element} outside a session"));
                return false;
            }
            if read_only {
                state.fail(READ_ONLY, format!("{element} is read only"));
                return false;
            }
            if element == session_time {
                match format.decode(value) {
                    Ok(seconds) => state.session_seconds = Some(seconds),
                    Err(err) => {
                        state.fail(GENERAL_EXCEPTION, err.to_string());
                        return false;
                    }
                }
            }
            state.pending.insert(element.to_owned(), value.to_owned());
            state.ok();
            true
        })
        .unwrap_or(false)
    }

    async fn commit(&self) -> bool {
        if !self.with_state(|state| state.is_open()).unwrap_or(false) {
            self.with_state(|state| state.fail(NOT_INITIALIZED, "commit outside a session"));
            return false;
        }
        self.flush(Vec::new()).await
    }

    async fn terminate(&self) -> bool {
        let Some(Some(session_seconds)) = self.with_state(|state| {
            if state.is_open() {
                state.terminated = true;
                Some(state.session_seconds.take())
            } else {
                state.fail(NOT_INITIALIZED, "terminate outside a session");
                None
            }
        }) else {
            return false;
        };
        let extra: Vec<(String, String)> = match session_seconds {
            Some(seconds) => self.accumulated_total(seconds).await.into_iter().collect(),
            None => Vec::new(),
        };
        self.flush(extra).await
    }

    async fn get_last_error(&self) -> String {
        self.with_state(|state| state.last_error.to_owned())
            .unwrap_or_else(|| GENERAL_EXCEPTION.to_owned())
    }

    async fn get_error_string(&self, code: &str) -> String {
        match code {
            NO_ERROR => "No error",
            GENERAL_EXCEPTION => "General exception",
            NOT_INITIALIZED => "Not initialized",
            READ_ONLY => "Element is read only",
            _ => "Unknown error",
        }
        .to_owned()
    }

    async fn get_diagnostic(&self, _code: &str) -> String {
        self.with_state(|state| state.diagnostic.clone())
            .unwrap_or_default()
    }
}
