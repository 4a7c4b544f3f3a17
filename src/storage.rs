use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

const TEMP_SUFFIX: &str = "tmp";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("quota exceeded writing `{key}`: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },
}

/// Synchronous string key/value storage, shaped after browser local storage.
///
/// Reads never fail: a missing or unreadable key is `None`. Writes report
/// failure so the caller can log it.
pub trait KeyValueStore {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn clear(&self, key: &str);
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn load(&self, key: &str) -> Option<String> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).save(key, value)
    }

    fn clear(&self, key: &str) {
        (**self).clear(key)
    }
}

/// In-process store. An optional quota (total bytes of keys plus values) mimics
/// the browser refusing writes once full.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Some(quota),
        }
    }

    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let store = Self::new();
        {
            let mut guard = store.lock();
            for (key, value) in entries {
                guard.insert(key.into(), value.into());
            }
        }
        store
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A panic while holding the lock cannot leave a half-written entry behind.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.lock();
        if let Some(quota) = self.quota {
            let others: usize = guard
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    quota,
                });
            }
        }
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) {
        self.lock().remove(key);
    }
}

/// One file per key under `root`, replaced atomically on every write.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn read(&self, path: &Path) -> std::io::Result<String> {
        let mut file = File::open(path)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(buf)
    }

    fn write_atomic(&self, path: PathBuf, data: &[u8]) -> Result<(), StorageError> {
        let temp_path = path.with_extension(TEMP_SUFFIX);
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> Option<String> {
        match self.read(&self.path_for(key)) {
            Ok(value) => Some(value),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                log::warn!("storage read failed key={key} err={err}");
                None
            }
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.write_atomic(self.path_for(key), value.as_bytes())
    }

    fn clear(&self, key: &str) {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => log::warn!("storage clear failed key={key} err={err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_load_save_clear() {
        let store = MemoryStore::new();
        assert_eq!(store.load("tasks"), None);

        store.save("tasks", "[]").expect("save");
        assert_eq!(store.load("tasks").as_deref(), Some("[]"));
        assert!(store.contains("tasks"));

        store.clear("tasks");
        assert_eq!(store.load("tasks"), None);

        // Clearing a missing key is a no-op.
        store.clear("tasks");
    }

    #[test]
    fn memory_store_quota_rejects_oversized_writes_and_keeps_previous_value() {
        let store = MemoryStore::with_quota(16);
        store.save("theme", "{}").expect("fits");

        let err = store
            .save("theme", "{\"darkMode\":true}")
            .expect_err("over quota");
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 16, .. }));
        assert_eq!(store.load("theme").as_deref(), Some("{}"));
    }

    #[test]
    fn memory_store_quota_counts_replaced_key_once() {
        let store = MemoryStore::with_quota(10);
        store.save("k", "12345").expect("first write");
        store.save("k", "123456789").expect("replacement fits");
    }

    #[test]
    fn memory_store_with_entries_seeds_values() {
        let store = MemoryStore::with_entries([("user", "{}"), ("tasks", "[]")]);
        assert_eq!(store.load("user").as_deref(), Some("{}"));
        assert_eq!(store.load("tasks").as_deref(), Some("[]"));
    }

    #[test]
    fn file_store_round_trips_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("data"));
        store.ensure_dirs().unwrap();

        assert_eq!(store.load("tasks"), None);
        store.save("tasks", "[1,2,3]").unwrap();
        assert_eq!(store.load("tasks").as_deref(), Some("[1,2,3]"));
        assert!(!store.root().join("tasks.tmp").exists());

        store.save("tasks", "[]").unwrap();
        assert_eq!(store.load("tasks").as_deref(), Some("[]"));

        store.clear("tasks");
        assert_eq!(store.load("tasks"), None);
        store.clear("tasks");
    }

    #[test]
    fn file_store_save_fails_when_root_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("missing"));
        let err = store.save("tasks", "[]").expect_err("no directory");
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[test]
    fn reference_delegates_to_store() {
        let store = MemoryStore::new();
        let by_ref = &store;
        by_ref.save("user", "{}").unwrap();
        assert!(store.contains("user"));
    }
}
