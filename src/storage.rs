//! Storage backends the machine saves slices to and loads them from.
//!
//! The machine never interprets what a backend does with a slice; it only
//! hands over a key and a JSON value. [`MemoryStorage`] is meant for tests and
//! prototyping, [`FileStorage`] keeps one JSON document per key on disk, and
//! [`from_fns`] adapts a pair of caller-supplied async closures.

use crate::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Key-value bridge to the actual storage medium.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store `state` under `key`, replacing any previous value.
    async fn save(&self, key: &str, state: &Value) -> Result<()>;

    /// Retrieve the value stored under `key`.
    /// Returns `None` if nothing was ever saved there.
    async fn load(&self, key: &str) -> Result<Option<Value>>;
}

#[async_trait]
impl<B: StorageBackend + ?Sized> StorageBackend for Arc<B> {
    async fn save(&self, key: &str, state: &Value) -> Result<()> {
        (**self).save(key, state).await
    }

    async fn load(&self, key: &str) -> Result<Option<Value>> {
        (**self).load(key).await
    }
}

/// In-process storage. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value as if it had been saved earlier.
    pub fn insert(&self, key: impl Into<String>, state: Value) {
        self.entries.lock().unwrap().insert(key.into(), state);
    }

    /// Current value under `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn save(&self, key: &str, state: &Value) -> Result<()> {
        self.insert(key, state.clone());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.get(key))
    }
}

/// One JSON file per key inside a directory.
///
/// Keys are percent-encoded into file names, so `@user/profile` is stored as
/// `%40user%2Fprofile.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Use `root` as the storage directory. It is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File that holds the value for `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut name = String::with_capacity(key.len() + 5);
        for byte in key.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' => name.push(byte as char),
                _ => name.push_str(&format!("%{byte:02X}")),
            }
        }
        name.push_str(".json");
        self.root.join(name)
    }
}

#[async_trait]
impl StorageBackend for FileStorage {
    async fn save(&self, key: &str, state: &Value) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(state).map_err(Error::Serialize)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>> {
        let bytes = match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state = serde_json::from_slice(&bytes)
            .map_err(|e| Error::storage(format!("corrupt entry for '{key}': {e}")))?;
        Ok(Some(state))
    }
}

/// Storage backed by caller-supplied save and load closures.
pub struct FnStorage<S, L> {
    save: S,
    load: L,
}

/// Adapt a pair of async closures into a [`StorageBackend`].
///
/// # Examples
///
/// ```
/// use persist_machine::storage::from_fns;
/// use serde_json::Value;
///
/// let storage = from_fns(
///     |key: String, state: Value| async move {
///         println!("save {key}: {state}");
///         Ok::<_, persist_machine::Error>(())
///     },
///     |_key: String| async move { Ok::<_, persist_machine::Error>(None) },
/// );
/// # let _ = storage;
/// ```
pub fn from_fns<S, SF, L, LF>(save: S, load: L) -> FnStorage<S, L>
where
    S: Fn(String, Value) -> SF + Send + Sync,
    SF: Future<Output = Result<()>> + Send + 'static,
    L: Fn(String) -> LF + Send + Sync,
    LF: Future<Output = Result<Option<Value>>> + Send + 'static,
{
    FnStorage { save, load }
}

#[async_trait]
impl<S, SF, L, LF> StorageBackend for FnStorage<S, L>
where
    S: Fn(String, Value) -> SF + Send + Sync,
    SF: Future<Output = Result<()>> + Send + 'static,
    L: Fn(String) -> LF + Send + Sync,
    LF: Future<Output = Result<Option<Value>>> + Send + 'static,
{
    async fn save(&self, key: &str, state: &Value) -> Result<()> {
        (self.save)(key.to_string(), state.clone()).await
    }

    async fn load(&self, key: &str) -> Result<Option<Value>> {
        (self.load)(key.to_string()).await
    }
}

impl<S, L> std::fmt::Debug for FnStorage<S, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStorage").finish_non_exhaustive()
    }
}
