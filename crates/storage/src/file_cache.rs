use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::repository::{CacheKey, LocalCache, StorageError};

/// Local cache persisted as a flat JSON object on disk.
///
/// Values are held in memory and written through on every `set`. The file is replaced
/// atomically (write to a sibling temp file, then rename).
pub struct JsonFileCache {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFileCache {
    /// Open the cache at `path`, creating it lazily on first write.
    ///
    /// A file that is not a JSON object of strings is discarded and the cache starts empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!("discarding unreadable cache file {}: {err}", path.display());
                BTreeMap::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        debug!("opened local cache at {} ({} keys)", path.display(), values.len());
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let raw = serde_json::to_string_pretty(values)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl LocalCache for JsonFileCache {
    fn get(&self, key: CacheKey) -> Result<Option<String>, StorageError> {
        let guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key.as_str()).cloned())
    }

    fn set(&self, key: CacheKey, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .values
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut next = guard.clone();
        next.insert(key.as_str().to_owned(), value.to_owned());
        self.flush(&next)?;
        *guard = next;
        Ok(())
    }
}
