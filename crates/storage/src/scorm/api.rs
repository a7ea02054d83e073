use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Low-level session-store protocol exposed by an LMS runtime.
///
/// Mirrors the classic runtime bridge: every call answers synchronously from the
/// learner's point of view but may suspend the caller while the runtime responds.
/// Failures are reported through `false` returns plus `get_last_error`.
#[async_trait]
pub trait ScormApi: Send + Sync {
    async fn initialize(&self) -> bool;
    async fn get_value(&self, element: &str) -> String;
    async fn set_value(&self, element: &str, value: &str) -> bool;
    async fn commit(&self) -> bool;
    async fn terminate(&self) -> bool;
    async fn get_last_error(&self) -> String;
    async fn get_error_string(&self, code: &str) -> String;
    async fn get_diagnostic(&self, code: &str) -> String;
}

#[derive(Default)]
struct MockState {
    data: HashMap<String, String>,
    set_calls: Vec<(String, String)>,
    commits: usize,
    initialized: bool,
    terminated: bool,
    last_error: String,
}

/// Scriptable runtime double. Clones share state so tests can inspect what the
/// player wrote after handing a clone to it.
#[derive(Clone, Default)]
pub struct InMemoryScormApi {
    state: Arc<Mutex<MockState>>,
    refuse_initialize: bool,
    refuse_writes: bool,
}

impl InMemoryScormApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_value(self, element: &str, value: &str) -> Self {
        if let Ok(mut guard) = self.state.lock() {
            guard.data.insert(element.to_owned(), value.to_owned());
        }
        self
    }

    /// Simulate a page with no reachable runtime.
    #[must_use]
    pub fn refusing_initialize(mut self) -> Self {
        self.refuse_initialize = true;
        self
    }

    /// Accept reads but reject every `set_value`.
    #[must_use]
    pub fn refusing_writes(mut self) -> Self {
        self.refuse_writes = true;
        self
    }

    #[must_use]
    pub fn value(&self, element: &str) -> Option<String> {
        self.state
            .lock()
            .ok()
            .and_then(|guard| guard.data.get(element).cloned())
    }

    /// Number of `set_value` calls addressed to `element`, accepted or not.
    #[must_use]
    pub fn set_calls(&self, element: &str) -> usize {
        self.state.lock().map_or(0, |guard| {
            guard
                .set_calls
                .iter()
                .filter(|(written, _)| written == element)
                .count()
        })
    }

    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.state.lock().map_or(0, |guard| guard.commits)
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state.lock().is_ok_and(|guard| guard.terminated)
    }
}

#[async_trait]
impl ScormApi for InMemoryScormApi {
    async fn initialize(&self) -> bool {
        let Ok(mut guard) = self.state.lock() else {
            return false;
        };
        if self.refuse_initialize {
            guard.last_error = "101".into();
            return false;
        }
        guard.initialized = true;
        guard.last_error = "0".into();
        true
    }

    async fn get_value(&self, element: &str) -> String {
        self.state
            .lock()
            .ok()
            .and_then(|guard| guard.data.get(element).cloned())
            .unwrap_or_default()
    }

    async fn set_value(&self, element: &str, value: &str) -> bool {
        let Ok(mut guard) = self.state.lock() else {
            return false;
        };
        guard.set_calls.push((element.to_owned(), value.to_owned()));
        if self.refuse_writes || !guard.initialized || guard.terminated {
            guard.last_error = "101".into();
            return false;
        }
        guard.data.insert(element.to_owned(), value.to_owned());
        true
    }

    async fn commit(&self) -> bool {
        let Ok(mut guard) = self.state.lock() else {
            return false;
        };
        guard.commits += 1;
        guard.initialized && !guard.terminated
    }

    async fn terminate(&self) -> bool {
        let Ok(mut guard) = self.state.lock() else {
            return false;
        };
        guard.terminated = true;
        true
    }

    async fn get_last_error(&self) -> String {
        self.state
            .lock()
            .map(|guard| guard.last_error.clone())
            .unwrap_or_default()
    }

    async fn get_error_string(&self, code: &str) -> String {
        match code {
            "0" => "No error".into(),
            _ => "General exception".into(),
        }
    }

    async fn get_diagnostic(&self, code: &str) -> String {
        format!("in-memory runtime error {code}")
    }
}
