//! Key-value persistence for client-local state.
//!
//! The local engine and the session identity provider store whole values
//! under fixed keys. [`FileStore`] keeps one file per key in a data directory
//! and [`MemoryStore`] keeps everything in process memory.

use std::collections::HashMap;
use std::fmt::Debug;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tempfile::NamedTempFile;

use crate::error::Result;

/// A string key-value store.
///
/// Uses `&self` for all methods; implementations use interior mutability.
/// A `put` replaces the whole value: there are no partial writes.
pub trait KeyValueStore: Send + Sync + Debug {
    /// Retrieve a value by key, or `None` if the key was never written.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the backing store cannot be written.
    fn put(&self, key: &str, value: &str) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        (**self).put(key, value)
    }
}

/// File-backed store: `<dir>/<key>.json`, one file per key.
///
/// Writes go to a uniquely named temporary file in the same directory that is
/// persisted over the target, so readers see either the old or the new value.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The data directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid store key: {key:?}"),
            )
            .into());
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;

        // Each writer gets its own temp file; concurrent puts are last-writer-wins
        let mut temp = NamedTempFile::new_in(&self.dir)?;
        temp.write_all(value.as_bytes())?;
        temp.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// In-process store, used for ephemeral sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::StorageError;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        assert_eq!(store.get("desicart_user_id").unwrap(), None);

        store.put("desicart_user_id", "\"abc\"").unwrap();
        assert_eq!(
            store.get("desicart_user_id").unwrap().as_deref(),
            Some("\"abc\"")
        );

        store.put("desicart_user_id", "\"def\"").unwrap();
        assert_eq!(
            store.get("desicart_user_id").unwrap().as_deref(),
            Some("\"def\"")
        );
    }

    #[test]
    fn test_file_store_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.put("desicart_carts_v2", "{}").unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["desicart_carts_v2.json".to_string()]);
    }

    #[test]
    fn test_file_store_concurrent_writers_all_succeed() {
        let dir = tempfile::tempdir().unwrap();

        let handles: Vec<_> = (0..8)
            .map(|writer| {
                let store = FileStore::new(dir.path());
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|i| {
                            store
                                .put("desicart_carts_v2", &format!("{{\"{writer}\": {i}}}"))
                                .is_err()
                        })
                        .count()
                })
            })
            .collect();
        let failures: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(failures, 0);
        let value = FileStore::new(dir.path())
            .get("desicart_carts_v2")
            .unwrap()
            .unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&value).is_ok());

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["desicart_carts_v2.json".to_string()]);
    }

    #[test]
    fn test_file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert!(matches!(store.get("../etc/passwd"), Err(StorageError::Io(_))));
        assert!(matches!(store.put("", "x"), Err(StorageError::Io(_))));
    }

    #[test]
    fn test_memory_store_shared_through_arc() {
        let store = Arc::new(MemoryStore::new());
        let handle = Arc::clone(&store);

        handle.put("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }
}
