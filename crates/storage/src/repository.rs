use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session store rejected {element}: [{code}] {message}")]
    Rejected {
        element: String,
        code: String,
        message: String,
    },
}

/// Keys of the flat local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    UserName,
    Email,
    Status,
    SuspendData,
}

impl CacheKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CacheKey::UserName => "userName",
            CacheKey::Email => "email",
            CacheKey::Status => "status",
            CacheKey::SuspendData => "suspendData",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable key-value cache that lives next to the player.
///
/// Always available and synchronous: implementations must not block on the network.
pub trait LocalCache: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    fn get(&self, key: CacheKey) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn set(&self, key: CacheKey, value: &str) -> Result<(), StorageError>;
}

/// In-memory cache for tests and ephemeral sessions. Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryCache {
    values: Arc<Mutex<HashMap<CacheKey, String>>>,
    writes: Arc<Mutex<HashMap<CacheKey, usize>>>,
}

impl InMemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_value(self, key: CacheKey, value: impl Into<String>) -> Self {
        if let Ok(mut guard) = self.values.lock() {
            guard.insert(key, value.into());
        }
        self
    }

    /// How many times `key` was written through [`LocalCache::set`].
    #[must_use]
    pub fn write_count(&self, key: CacheKey) -> usize {
        self.writes
            .lock()
            .map(|guard| guard.get(&key).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl LocalCache for InMemoryCache {
    fn get(&self, key: CacheKey) -> Result<Option<String>, StorageError> {
        let guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&key).cloned())
    }

    fn set(&self, key: CacheKey, value: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .insert(key, value.to_owned());
        *self
            .writes
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .entry(key)
            .or_default() += 1;
        Ok(())
    }
}
