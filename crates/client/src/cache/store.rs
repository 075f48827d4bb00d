//! Generic expiring cache over a persistent key-value store.
//!
//! Values are wrapped in a JSON envelope carrying write-time metadata:
//!
//! ```json
//! { "data": <T>, "metadata": { "timestamp": 1700000000000, "expiresAt": 1700086400000 } }
//! ```
//!
//! The envelope shape (including camelCase `expiresAt`) is a persisted
//! contract shared with earlier app versions.
//!
//! The cache is never a source of fatal errors: storage faults degrade to a
//! miss on read and a logged no-op on write, and an expired entry behaves as
//! a miss and is evicted rather than served stale.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::storage::KeyValueStore;

/// Default time-to-live for cached entries: 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Envelope persisted for every cached value.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Envelope<T> {
    data: T,
    metadata: Metadata,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    timestamp: i64,
    expires_at: i64,
}

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// TTL-bounded cache over a [`KeyValueStore`].
#[derive(Debug)]
pub struct CacheStore<S> {
    store: Arc<S>,
}

impl<S> Clone for CacheStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KeyValueStore> CacheStore<S> {
    /// Create a cache over the given store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Cache `value` under `key` for `ttl`.
    ///
    /// Best-effort: a failed write is logged and swallowed so it can never
    /// block the caller's primary operation.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let timestamp = now_ms();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let envelope = Envelope {
            data: value,
            metadata: Metadata {
                timestamp,
                expires_at: timestamp.saturating_add(ttl_ms),
            },
        };

        let serialized = match serde_json::to_string(&envelope) {
            Ok(s) => s,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = self.store.write(key, &serialized).await {
            warn!(key, error = %e, "cache write failed");
        }
    }

    /// Read the value cached under `key`.
    ///
    /// Returns `None` on a miss, on an expired entry (which is evicted), on
    /// a corrupt entry, or on a storage fault. Expired entries are never
    /// returned.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.read(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let envelope: Envelope<T> = match serde_json::from_str(&raw) {
            Ok(env) => env,
            Err(e) => {
                warn!(key, error = %e, "corrupt cache entry, evicting");
                self.evict(key).await;
                return None;
            }
        };

        if now_ms() > envelope.metadata.expires_at {
            debug!(key, "cache entry expired, evicting");
            self.evict(key).await;
            return None;
        }

        debug!(key, "cache hit");
        Some(envelope.data)
    }

    /// Explicitly remove the entry under `key`.
    pub async fn remove(&self, key: &str) {
        self.evict(key).await;
    }

    /// Remove every entry whose key starts with `prefix`.
    ///
    /// Returns the number of entries removed.
    pub async fn clear_prefix(&self, prefix: &str) -> usize {
        let keys = match self.store.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(prefix, error = %e, "cache scan failed, nothing cleared");
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys.iter().filter(|k| k.starts_with(prefix)) {
            if self.store.delete(key).await.is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Sum of serialized byte lengths of all entries under `prefix`.
    pub async fn size_of_prefix(&self, prefix: &str) -> u64 {
        let keys = match self.store.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(prefix, error = %e, "cache scan failed, reporting zero size");
                return 0;
            }
        };

        let mut total = 0u64;
        for key in keys.iter().filter(|k| k.starts_with(prefix)) {
            if let Ok(Some(raw)) = self.store.read(key).await {
                total += raw.len() as u64;
            }
        }
        total
    }

    async fn evict(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            warn!(key, error = %e, "cache eviction failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn cache() -> (Arc<MemoryStore>, CacheStore<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = CacheStore::new(Arc::clone(&store));
        (store, cache)
    }

    #[tokio::test]
    async fn test_set_then_get_returns_value() {
        let (_, cache) = cache();
        cache.set("k", &vec![1, 2, 3], DEFAULT_TTL).await;
        let got: Option<Vec<i32>> = cache.get("k").await;
        assert_eq!(got, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_persisted_shape_matches_contract() {
        let (store, cache) = cache();
        cache.set("k", &"hello", DEFAULT_TTL).await;

        let raw = store.read("k").await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["data"], "hello");
        assert!(value["metadata"]["timestamp"].is_i64());
        assert!(value["metadata"]["expiresAt"].is_i64());
        let ts = value["metadata"]["timestamp"].as_i64().unwrap();
        let exp = value["metadata"]["expiresAt"].as_i64().unwrap();
        assert_eq!(exp - ts, 24 * 60 * 60 * 1000);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss_and_evicted() {
        let (store, cache) = cache();
        // Plant an envelope that expired a minute ago.
        let past = now_ms() - 60_000;
        store.insert_raw(
            "k",
            &format!(
                r#"{{"data":"stale","metadata":{{"timestamp":{},"expiresAt":{}}}}}"#,
                past - 1000,
                past
            ),
        );

        let got: Option<String> = cache.get("k").await;
        assert_eq!(got, None);
        assert!(!store.contains("k"), "expired entry must be evicted");
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss_and_evicted() {
        let (store, cache) = cache();
        store.insert_raw("k", "{not json");

        let got: Option<String> = cache.get("k").await;
        assert_eq!(got, None);
        assert!(!store.contains("k"));
    }

    #[tokio::test]
    async fn test_storage_fault_degrades_to_miss() {
        let (store, cache) = cache();
        cache.set("k", &1, DEFAULT_TTL).await;
        store.poison();

        let got: Option<i32> = cache.get("k").await;
        assert_eq!(got, None);

        // Writes while poisoned are silent no-ops.
        cache.set("other", &2, DEFAULT_TTL).await;
        store.heal();
        let got: Option<i32> = cache.get("other").await;
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn test_remove() {
        let (store, cache) = cache();
        cache.set("k", &1, DEFAULT_TTL).await;
        cache.remove("k").await;
        assert!(!store.contains("k"));
    }

    #[tokio::test]
    async fn test_clear_prefix_removes_only_namespace() {
        let (store, cache) = cache();
        cache.set("@cache:a", &1, DEFAULT_TTL).await;
        cache.set("@cache:b", &2, DEFAULT_TTL).await;
        cache.set("@cart:items", &3, DEFAULT_TTL).await;

        let removed = cache.clear_prefix("@cache:").await;
        assert_eq!(removed, 2);
        assert!(!store.contains("@cache:a"));
        assert!(!store.contains("@cache:b"));
        assert!(store.contains("@cart:items"));
    }

    #[tokio::test]
    async fn test_size_of_prefix_counts_serialized_bytes() {
        let (store, cache) = cache();
        cache.set("@cache:a", &"x", DEFAULT_TTL).await;
        cache.set("@other:b", &"y", DEFAULT_TTL).await;

        let expected = store.read("@cache:a").await.unwrap().unwrap().len() as u64;
        assert_eq!(cache.size_of_prefix("@cache:").await, expected);
    }
}
