//! Cart state: pure ledger, snapshot persistence, shared handle.
//!
//! [`ledger::CartLedger`] is the pure reducer core; [`store`] persists
//! whole snapshots; [`CartHandle`] ties them together as an explicit
//! application-state object constructed at startup and passed by the app
//! layer (no module-level globals), with a watch-based subscribe contract.

pub mod ledger;
pub mod store;

use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use kirana_core::ProductId;

use crate::backend::types::Product;
use crate::storage::KeyValueStore;
use ledger::{CartLedger, CartLineItem};
use store::CartSnapshotStore;

/// Derived cart totals pushed to subscribers after every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartSummary {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub item_count: u32,
}

impl CartSummary {
    fn of(ledger: &CartLedger) -> Self {
        Self {
            subtotal: ledger.subtotal(),
            tax: ledger.total_tax(),
            total: ledger.total(),
            item_count: ledger.item_count(),
        }
    }
}

/// Shared handle to the local cart.
///
/// Mutations apply synchronously to the in-memory ledger, notify
/// subscribers, then persist the full snapshot fire-and-forget on a spawned
/// task. A burst of mutations may collapse into fewer persisted writes;
/// since every write is the whole snapshot, the last one wins and is
/// correct.
#[derive(Debug, Clone)]
pub struct CartHandle<S> {
    inner: Arc<CartInner<S>>,
}

#[derive(Debug)]
struct CartInner<S> {
    ledger: Mutex<CartLedger>,
    snapshots: CartSnapshotStore<S>,
    tx: watch::Sender<CartSummary>,
}

impl<S: KeyValueStore> CartHandle<S> {
    /// Construct the cart handle, rehydrating the persisted snapshot once.
    pub async fn load(store: Arc<S>) -> Self {
        let snapshots = CartSnapshotStore::new(store);
        let ledger = CartLedger::from_items(snapshots.load().await);
        let (tx, _) = watch::channel(CartSummary::of(&ledger));

        Self {
            inner: Arc::new(CartInner {
                ledger: Mutex::new(ledger),
                snapshots,
                tx,
            }),
        }
    }

    /// Add `qty` of `product` (merging into an existing line).
    pub fn add_item(&self, product: &Product, qty: u32) {
        self.mutate(|ledger| ledger.add_item(product, qty));
    }

    /// Set the quantity for `product_id`; zero removes the line.
    pub fn update_quantity(&self, product_id: ProductId, qty: u32) {
        self.mutate(|ledger| ledger.update_quantity(product_id, qty));
    }

    /// Remove the line for `product_id`.
    pub fn remove_item(&self, product_id: ProductId) {
        self.mutate(|ledger| ledger.remove_item(product_id));
    }

    /// Drop all line items.
    pub fn clear(&self) {
        self.mutate(CartLedger::clear);
    }

    /// Current derived totals.
    #[must_use]
    pub fn summary(&self) -> CartSummary {
        CartSummary::of(&self.lock())
    }

    /// Clone of the current line items (checkout input).
    #[must_use]
    pub fn items(&self) -> Vec<CartLineItem> {
        self.lock().items().to_vec()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Watch receiver delivering a [`CartSummary`] after every mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSummary> {
        self.inner.tx.subscribe()
    }

    fn mutate(&self, f: impl FnOnce(&mut CartLedger)) {
        let items = {
            let mut ledger = self.lock();
            f(&mut ledger);
            self.inner.tx.send_replace(CartSummary::of(&ledger));
            ledger.items().to_vec()
        };

        // Fire-and-forget whole-snapshot persist; the mutation itself is
        // already visible in memory.
        let snapshots = self.inner.snapshots.clone();
        tokio::spawn(async move {
            snapshots.save(&items).await;
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CartLedger> {
        self.inner
            .ledger
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::types::ProductAttributes;
    use crate::storage::MemoryStore;
    use rust_decimal::dec;

    fn product(id: i64, mrp: Decimal, tax_rate: Decimal) -> Product {
        Product {
            id: ProductId::new(id),
            sku: format!("SKU-{id}"),
            barcode: None,
            name: format!("Product {id}"),
            mrp,
            tax_rate,
            category: None,
            attributes: ProductAttributes::default(),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_mutations_update_summary() {
        let cart = CartHandle::load(Arc::new(MemoryStore::new())).await;
        cart.add_item(&product(1, dec!(100), dec!(5)), 2);
        cart.add_item(&product(2, dec!(50), dec!(18)), 1);

        let summary = cart.summary();
        assert_eq!(summary.subtotal, dec!(250));
        assert_eq!(summary.tax, dec!(19));
        assert_eq!(summary.total, dec!(269));
        assert_eq!(summary.item_count, 3);
    }

    #[tokio::test]
    async fn test_subscribe_sees_mutations() {
        let cart = CartHandle::load(Arc::new(MemoryStore::new())).await;
        let mut rx = cart.subscribe();

        cart.add_item(&product(1, dec!(100), dec!(5)), 1);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().item_count, 1);
    }

    #[tokio::test]
    async fn test_rehydrates_from_persisted_snapshot() {
        let store = Arc::new(MemoryStore::new());

        {
            let cart = CartHandle::load(Arc::clone(&store)).await;
            cart.add_item(&product(1, dec!(100), dec!(5)), 2);
            // Let the spawned persist task run.
            tokio::task::yield_now().await;
        }

        let restarted = CartHandle::load(store).await;
        assert_eq!(restarted.summary().item_count, 2);
        assert_eq!(restarted.summary().total, dec!(210));
    }

    #[tokio::test]
    async fn test_clear_resets_summary() {
        let cart = CartHandle::load(Arc::new(MemoryStore::new())).await;
        cart.add_item(&product(1, dec!(100), dec!(5)), 2);
        cart.clear();

        assert_eq!(cart.summary(), CartSummary::default());
        assert!(cart.is_empty());
    }
}
