#![forbid(unsafe_code)]

pub mod file_cache;
pub mod repository;
pub mod scorm;
pub mod sqlite;

pub use file_cache::JsonFileCache;
pub use repository::{CacheKey, InMemoryCache, LocalCache, StorageError};
pub use scorm::{CmiField, CmiVocabulary, InMemoryScormApi, ScormApi, ScormSession, ScormVersion};
