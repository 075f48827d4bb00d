//! Cart snapshot persistence.
//!
//! The ledger is persisted wholesale (a bare JSON array of line items, no
//! TTL envelope) under a single storage key, and rehydrated once at
//! startup. Persistence is always the full snapshot, never a diff, so a
//! rapid mutation burst collapsing into one write is harmless.

use std::sync::Arc;

use tracing::warn;

use super::ledger::CartLineItem;
use crate::storage::KeyValueStore;

/// Storage key for the persisted cart snapshot.
pub const CART_STORAGE_KEY: &str = "@cart:items";

/// Whole-snapshot persistence adapter for the cart ledger.
#[derive(Debug)]
pub struct CartSnapshotStore<S> {
    store: Arc<S>,
}

impl<S> Clone for CartSnapshotStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: KeyValueStore> CartSnapshotStore<S> {
    /// Create a snapshot store over the given backing store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Load the persisted snapshot.
    ///
    /// A missing, corrupt, or unreadable snapshot yields an empty cart;
    /// losing a cart is better than failing startup.
    pub async fn load(&self) -> Vec<CartLineItem> {
        let raw = match self.store.read(CART_STORAGE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, "cart snapshot read failed, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "corrupt cart snapshot, starting empty");
                Vec::new()
            }
        }
    }

    /// Persist the full item list. Best-effort; failures are logged.
    pub async fn save(&self, items: &[CartLineItem]) {
        let serialized = match serde_json::to_string(items) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "failed to serialize cart snapshot");
                return;
            }
        };

        if let Err(e) = self.store.write(CART_STORAGE_KEY, &serialized).await {
            warn!(error = %e, "cart snapshot write failed");
        }
    }
}
