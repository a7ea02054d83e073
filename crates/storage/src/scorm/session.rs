use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use player_core::model::CourseStatus;
use tracing::debug;

use super::{CmiField, CmiVocabulary, ScormApi};
use crate::repository::StorageError;

/// Version-agnostic view over a runtime bridge.
///
/// Reads before `initialize` succeeds return `None` and writes are no-ops, matching a
/// page that never found its runtime. After `terminate` the session is closed for good.
pub struct ScormSession {
    api: Arc<dyn ScormApi>,
    vocabulary: CmiVocabulary,
    initialized: AtomicBool,
    terminated: AtomicBool,
}

impl ScormSession {
    #[must_use]
    pub fn new(api: Arc<dyn ScormApi>, vocabulary: CmiVocabulary) -> Self {
        Self {
            api,
            vocabulary,
            initialized: AtomicBool::new(false),
            terminated: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn vocabulary(&self) -> &CmiVocabulary {
        &self.vocabulary
    }

    pub async fn initialize(&self) -> bool {
        debug!(version = %self.vocabulary.version(), "initializing session store");
        let ok = self.api.initialize().await;
        self.initialized.store(ok, Ordering::SeqCst);
        if !ok {
            debug!("session store did not initialize");
        }
        ok
    }

    /// Initialized and not yet terminated.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.initialized.load(Ordering::SeqCst) && !self.terminated.load(Ordering::SeqCst)
    }

    /// Read a field. Empty values read as `None`.
    pub async fn get(&self, field: CmiField) -> Option<String> {
        if !self.is_active() {
            return None;
        }
        let element = self.vocabulary.element(field);
        let value = self.api.get_value(element).await;
        debug!(element, value = %value, "get value");
        (!value.is_empty()).then_some(value)
    }

    /// Write a field and commit it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Rejected` with the runtime's error code when either the
    /// write or the commit is refused.
    pub async fn set(&self, field: CmiField, value: &str) -> Result<(), StorageError> {
        if !self.is_active() {
            return Ok(());
        }
        let element = self.vocabulary.element(field);
        let accepted = self.api.set_value(element, value).await;
        debug!(element, value, accepted, "set value");
        if !accepted {
            return Err(self.rejection(element).await);
        }
        if !self.api.commit().await {
            return Err(self.rejection(element).await);
        }
        Ok(())
    }

    async fn rejection(&self, element: &str) -> StorageError {
        let code = self.api.get_last_error().await;
        let message = self.api.get_error_string(&code).await;
        StorageError::Rejected {
            element: element.to_owned(),
            code,
            message,
        }
    }

    pub async fn status(&self) -> Option<String> {
        self.get(CmiField::Status).await
    }

    /// # Errors
    ///
    /// See [`ScormSession::set`].
    pub async fn set_status(&self, status: CourseStatus) -> Result<(), StorageError> {
        self.set(CmiField::Status, status.as_str()).await
    }

    pub async fn suspend_data(&self) -> Option<String> {
        if let Some(raw) = self.get(CmiField::SuspendData).await {
            return Some(raw);
        }
        let element = self.vocabulary.legacy_suspend_data()?;
        let value = self.api.get_value(element).await;
        debug!(element, value = %value, "suspend data fallback");
        (!value.is_empty()).then_some(value)
    }

    /// # Errors
    ///
    /// See [`ScormSession::set`].
    pub async fn set_suspend_data(&self, raw: &str) -> Result<(), StorageError> {
        self.set(CmiField::SuspendData, raw).await
    }

    /// Raw score as a percentage, rounded to two decimals.
    ///
    /// # Errors
    ///
    /// See [`ScormSession::set`].
    pub async fn set_score(&self, percent: f64) -> Result<(), StorageError> {
        let rounded = (percent * 100.0).round() / 100.0;
        self.set(CmiField::Score, &rounded.to_string()).await
    }

    /// # Errors
    ///
    /// See [`ScormSession::set`].
    pub async fn set_session_time(&self, seconds: u64) -> Result<(), StorageError> {
        let encoded = self.vocabulary.time_format().encode(seconds);
        self.set(CmiField::SessionTime, &encoded).await
    }

    /// Accumulated time from earlier sessions. Absent or unreadable values count as zero.
    pub async fn total_time(&self) -> u64 {
        let Some(raw) = self.get(CmiField::TotalTime).await else {
            return 0;
        };
        self.vocabulary
            .time_format()
            .decode(&raw)
            .unwrap_or_else(|err| {
                debug!("ignoring total time: {err}");
                0
            })
    }

    pub async fn learner_name(&self) -> Option<String> {
        self.get(CmiField::LearnerName).await
    }

    pub async fn learner_id(&self) -> Option<String> {
        self.get(CmiField::LearnerId).await
    }

    /// Close the session. Later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Rejected` if the runtime refuses to terminate.
    pub async fn terminate(&self) -> Result<(), StorageError> {
        if !self.is_active() {
            return Ok(());
        }
        self.terminated.store(true, Ordering::SeqCst);
        let ok = self.api.terminate().await;
        debug!(ok, "terminate");
        if ok {
            Ok(())
        } else {
            Err(self.rejection("terminate").await)
        }
    }

    pub async fn last_error(&self) -> String {
        if !self.initialized.load(Ordering::SeqCst) {
            return "0".into();
        }
        self.api.get_last_error().await
    }

    pub async fn error_string(&self, code: &str) -> String {
        if !self.initialized.load(Ordering::SeqCst) {
            return String::new();
        }
        self.api.get_error_string(code).await
    }

    pub async fn diagnostic(&self, code: &str) -> String {
        if !self.initialized.load(Ordering::SeqCst) {
            return String::new();
        }
        self.api.get_diagnostic(code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorm::InMemoryScormApi;

    fn session(api: &InMemoryScormApi, vocabulary: CmiVocabulary) -> ScormSession {
        ScormSession::new(Arc::new(api.clone()), vocabulary)
    }

    #[tokio::test]
    async fn uninitialized_session_reads_nothing_and_writes_nothing() {
        let api = InMemoryScormApi::new()
            .with_value("cmi.core.student_name", "Student, Joe")
            .refusing_initialize();
        let store = session(&api, CmiVocabulary::SCORM_1_2);

        assert!(!store.initialize().await);
        assert_eq!(store.learner_name().await, None);
        store.set_status(CourseStatus::Completed).await.unwrap();
        assert_eq!(api.set_calls("cmi.core.lesson_status"), 0);
        assert_eq!(store.last_error().await, "0");
        assert_eq!(store.error_string("101").await, "");
    }

    #[tokio::test]
    async fn writes_use_version_specific_elements_and_commit() {
        let api = InMemoryScormApi::new();
        let store = session(&api, CmiVocabulary::SCORM_2004);
        assert!(store.initialize().await);

        store.set_session_time(3723).await.unwrap();
        store.set_score(100.0 / 3.0).await.unwrap();

        assert_eq!(api.value("cmi.session_time").as_deref(), Some("PT0001H02M03S"));
        assert_eq!(api.value("cmi.score.raw").as_deref(), Some("33.33"));
        assert_eq!(api.commit_count(), 2);
    }

    #[tokio::test]
    async fn rejected_write_reports_runtime_error() {
        let api = InMemoryScormApi::new().refusing_writes();
        let store = session(&api, CmiVocabulary::SCORM_1_2);
        assert!(store.initialize().await);

        let err = store.set_suspend_data("{}").await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::Rejected { ref element, ref code, .. }
                if element == "cmi.suspend_data" && code == "101"
        ));
    }

    #[tokio::test]
    async fn total_time_decodes_or_defaults_to_zero() {
        let api = InMemoryScormApi::new().with_value("cmi.core.total_time", "0002:00:05.5");
        let store = session(&api, CmiVocabulary::SCORM_1_2);
        store.initialize().await;
        assert_eq!(store.total_time().await, 7205);

        let garbled = InMemoryScormApi::new().with_value("cmi.total_time", "two hours");
        let store = session(&garbled, CmiVocabulary::SCORM_2004);
        store.initialize().await;
        assert_eq!(store.total_time().await, 0);

        let huge = InMemoryScormApi::new().with_value("cmi.total_time", "PT18446744073709551615H");
        let store = session(&huge, CmiVocabulary::SCORM_2004);
        store.initialize().await;
        assert_eq!(store.total_time().await, 0);
    }

    #[tokio::test]
    async fn suspend_data_falls_back_to_location_under_2004() {
        let api = InMemoryScormApi::new().with_value("cmi.location", "{\"screens\":[]}");
        let store = session(&api, CmiVocabulary::SCORM_2004);
        store.initialize().await;
        assert_eq!(store.suspend_data().await.as_deref(), Some("{\"screens\":[]}"));

        let both = InMemoryScormApi::new()
            .with_value("cmi.location", "{\"screens\":[]}")
            .with_value("cmi.suspend_data", "{\"screens\":[null]}");
        let store = session(&both, CmiVocabulary::SCORM_2004);
        store.initialize().await;
        assert_eq!(store.suspend_data().await.as_deref(), Some("{\"screens\":[null]}"));

        let older = InMemoryScormApi::new().with_value("cmi.location", "{\"screens\":[]}");
        let store = session(&older, CmiVocabulary::SCORM_1_2);
        store.initialize().await;
        assert_eq!(store.suspend_data().await, None);
    }

    #[tokio::test]
    async fn terminate_closes_the_session() {
        let api = InMemoryScormApi::new();
        let store = session(&api, CmiVocabulary::SCORM_1_2);
        store.initialize().await;

        store.terminate().await.unwrap();
        assert!(api.is_terminated());
        assert!(!store.is_active());

        store.set_status(CourseStatus::Completed).await.unwrap();
        assert_eq!(api.set_calls("cmi.core.lesson_status"), 0);
    }
}
