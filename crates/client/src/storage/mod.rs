//! Persistent string key-value stores.
//!
//! The cache and the cart snapshot both sit on top of [`KeyValueStore`], a
//! minimal async contract over durable string storage. Production uses
//! [`FsStore`] (one file per key under a cache directory); tests and
//! ephemeral contexts use [`MemoryStore`].
//!
//! Callers above this layer treat every `StorageError` as a miss or a no-op;
//! the store itself reports faults honestly and lets the cache decide.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

/// Errors from the backing key-value store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem I/O failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store was explicitly poisoned (test-only failure injection).
    #[error("storage unavailable")]
    Unavailable,
}

/// Async contract over durable string storage.
///
/// Futures are `Send` so stores can be shared with spawned persistence
/// tasks.
pub trait KeyValueStore: Send + Sync + 'static {
    /// Read the value stored under `key`, if any.
    fn read(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Write `value` under `key`, overwriting any existing entry.
    fn write(&self, key: &str, value: &str)
    -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Delete the entry under `key`. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// List all stored keys.
    fn keys(&self) -> impl Future<Output = Result<Vec<String>, StorageError>> + Send;
}

// =============================================================================
// Key <-> filename encoding
// =============================================================================

/// Encode a storage key into a safe filename.
///
/// Keys contain `@` and `:` namespace characters; everything outside
/// `[A-Za-z0-9._-]` is percent-encoded so the mapping is reversible.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'_' | b'-' => {
                out.push(char::from(byte));
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Decode a filename back into a storage key.
///
/// Returns `None` for filenames this store did not produce.
fn decode_key(name: &str) -> Option<String> {
    let mut out = Vec::with_capacity(name.len());
    let mut bytes = name.bytes();
    while let Some(b) = bytes.next() {
        if b == b'%' {
            let hi = bytes.next()?;
            let lo = bytes.next()?;
            let hex = [hi, lo];
            let hex = std::str::from_utf8(&hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
        } else {
            out.push(b);
        }
    }
    String::from_utf8(out).ok()
}

// =============================================================================
// FsStore
// =============================================================================

/// Filesystem-backed store: one file per key under a root directory.
///
/// Writes are last-write-wins with no locking; each key is logically owned
/// by a single UI interaction at a time.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(encode_key(key))
    }

    /// The root directory of this store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl KeyValueStore for FsStore {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        tokio::fs::write(self.path_for(key), value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str()
                && let Some(key) = decode_key(name)
            {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory store for tests and ephemeral use.
///
/// Can be poisoned to make every operation fail, which is how storage-fault
/// degradation is exercised.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    poisoned: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with `StorageError::Unavailable`.
    pub fn poison(&self) {
        self.poisoned.store(true, Ordering::SeqCst);
    }

    /// Restore normal operation after [`Self::poison`].
    pub fn heal(&self) {
        self.poisoned.store(false, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.poisoned.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable);
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned std mutex here means a test panicked mid-write; the
        // map itself is still usable.
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Direct synchronous write, bypassing the async contract.
    ///
    /// Tests use this to plant hand-crafted envelopes (e.g. already-expired
    /// cache entries).
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.lock().insert(key.to_owned(), value.to_owned());
    }

    /// Whether a key is present, without going through the async contract.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        Ok(self.lock().get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        self.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.lock().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.check()?;
        Ok(self.lock().keys().cloned().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_key_roundtrip() {
        let keys = [
            "@cache:products",
            "@cache:product:42",
            "@cache:barcode:0012345678905",
            "plain-key_1.0",
        ];
        for key in keys {
            let encoded = encode_key(key);
            assert!(
                encoded
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "._-%".contains(c)),
                "unsafe char in {encoded}"
            );
            assert_eq!(decode_key(&encoded).unwrap(), key);
        }
    }

    #[test]
    fn test_decode_key_rejects_foreign_files() {
        assert!(decode_key("%zz").is_none());
        assert!(decode_key("trailing%4").is_none());
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.write("a", "1").await.unwrap();
        assert_eq!(store.read("a").await.unwrap().as_deref(), Some("1"));
        store.delete("a").await.unwrap();
        assert_eq!(store.read("a").await.unwrap(), None);
        // deleting again is fine
        store.delete("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_poison() {
        let store = MemoryStore::new();
        store.write("a", "1").await.unwrap();
        store.poison();
        assert!(store.read("a").await.is_err());
        assert!(store.write("b", "2").await.is_err());
        store.heal();
        assert_eq!(store.read("a").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_fs_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::open(dir.path()).await.unwrap();

        store.write("@cache:products", "[1,2]").await.unwrap();
        assert_eq!(
            store.read("@cache:products").await.unwrap().as_deref(),
            Some("[1,2]")
        );

        let keys = store.keys().await.unwrap();
        assert_eq!(keys, vec!["@cache:products".to_string()]);

        store.delete("@cache:products").await.unwrap();
        assert_eq!(store.read("@cache:products").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fs_store_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::open(dir.path()).await.unwrap();
        assert_eq!(store.read("nope").await.unwrap(), None);
        store.delete("nope").await.unwrap();
    }
}
