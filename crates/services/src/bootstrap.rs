use std::sync::Arc;

use player_core::model::{Actor, CourseStatus};
use storage::{CacheKey, LocalCache, ScormSession};
use tracing::{debug, info};
use url::Url;

use crate::error::BootstrapError;
use crate::sync::{LoadSource, Loaded, ProgressSync};

/// Who is taking the course and what they already did.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeState {
    pub actor: Actor,
    pub user_name: String,
    pub loaded: Loaded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Bootstrap {
    Ready(ResumeState),
    /// Neither backend knows the learner; ask for a name and an email.
    NeedsLogin,
}

/// Resolves the learner at session start from the LMS store or the local cache.
pub struct SessionBootstrap {
    cache: Arc<dyn LocalCache>,
    store: Option<Arc<ScormSession>>,
    home_page: String,
}

impl SessionBootstrap {
    #[must_use]
    pub fn new(
        cache: Arc<dyn LocalCache>,
        store: Option<Arc<ScormSession>>,
        home_page: impl Into<String>,
    ) -> Self {
        Self {
            cache,
            store,
            home_page: home_page.into(),
        }
    }

    #[must_use]
    pub fn cache(&self) -> Arc<dyn LocalCache> {
        self.cache.clone()
    }

    #[must_use]
    pub fn store(&self) -> Option<Arc<ScormSession>> {
        self.store.clone()
    }

    /// Build the synchronizer for a resolved session.
    #[must_use]
    pub fn progress_sync(&self, resume: &ResumeState) -> ProgressSync {
        ProgressSync::new(
            self.cache.clone(),
            self.store.clone(),
            resume.loaded.data.clone().unwrap_or_default(),
            resume.loaded.status,
        )
    }

    /// Initialize the store if one is configured and identify the learner.
    ///
    /// # Errors
    ///
    /// Returns `BootstrapError::HomePage` for an unparseable LMS home page and
    /// `BootstrapError::Storage` when the local cache cannot be read.
    pub async fn resolve(&self) -> Result<Bootstrap, BootstrapError> {
        if let Some(store) = &self.store {
            if store.is_active() || store.initialize().await {
                return self.resolve_from_store(store).await.map(Bootstrap::Ready);
            }
            debug!("session store unavailable, using local cache");
        }

        let name = self.cache.get(CacheKey::UserName)?.filter(|v| !v.trim().is_empty());
        let email = self.cache.get(CacheKey::Email)?.filter(|v| !v.trim().is_empty());
        let (Some(name), Some(email)) = (name, email) else {
            return Ok(Bootstrap::NeedsLogin);
        };
        let loaded = ProgressSync::load(self.cache.as_ref(), None).await;
        Ok(Bootstrap::Ready(ResumeState {
            actor: Actor::mailbox(name.clone(), email),
            user_name: name,
            loaded,
        }))
    }

    async fn resolve_from_store(&self, store: &ScormSession) -> Result<ResumeState, BootstrapError> {
        let home_page = Url::parse(&self.home_page)?;
        let name = store.learner_name().await.unwrap_or_default();
        let id = store.learner_id().await.unwrap_or_default();
        if let Err(err) = self.cache.set(CacheKey::UserName, &name) {
            debug!("could not mirror learner name: {err}");
        }
        let loaded = ProgressSync::load(self.cache.as_ref(), Some(store)).await;
        info!(learner = %id, status = %loaded.status, "resuming from session store");
        Ok(ResumeState {
            actor: Actor::account(name.clone(), home_page, id),
            user_name: name,
            loaded,
        })
    }

    /// Register a learner in the local cache, starting fresh.
    ///
    /// # Errors
    ///
    /// Returns `BootstrapError::EmptyName` or `BootstrapError::EmptyEmail` for blank
    /// input and `BootstrapError::Storage` if the cache rejects the write.
    pub fn login(&self, name: &str, email: &str) -> Result<ResumeState, BootstrapError> {
        let name = name.trim();
        let email = email.trim();
        if name.is_empty() {
            return Err(BootstrapError::EmptyName);
        }
        if email.is_empty() {
            return Err(BootstrapError::EmptyEmail);
        }

        self.cache.set(CacheKey::UserName, name)?;
        self.cache.set(CacheKey::Email, email)?;
        self.cache.set(CacheKey::Status, CourseStatus::Incomplete.as_str())?;
        self.cache.set(CacheKey::SuspendData, "")?;
        info!(user = name, "learner registered locally");

        Ok(ResumeState {
            actor: Actor::mailbox(name, email),
            user_name: name.to_owned(),
            loaded: Loaded {
                data: None,
                status: CourseStatus::Incomplete,
                source: LoadSource::Cache,
            },
        })
    }
}
