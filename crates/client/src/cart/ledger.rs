//! Pure cart ledger.
//!
//! The client-local source of truth for the in-progress cart, independent
//! of and prior to any server cart. No I/O here: persistence and change
//! notification live in the surrounding [`super::CartHandle`], which keeps
//! this core independently testable.
//!
//! Invariant: exactly one line item per distinct product id. Derived totals
//! are folds over the current lines, recomputed on every read, so they can
//! never drift out of sync with the ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kirana_core::ProductId;

use crate::backend::types::Product;

/// One product + quantity row in the local cart.
///
/// `unit_price` and `tax` are copied from the product snapshot at add time;
/// `subtotal` is the tax-inclusive line total `(unit_price + tax) * qty`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub product: Product,
    pub qty: u32,
    pub unit_price: Decimal,
    /// Tax amount per unit.
    pub tax: Decimal,
    /// Tax-inclusive line total.
    pub subtotal: Decimal,
}

impl CartLineItem {
    fn new(product: &Product, qty: u32) -> Self {
        let unit_price = product.mrp;
        let tax = unit_price * product.tax_rate / Decimal::from(100);
        Self {
            product: product.clone(),
            qty,
            unit_price,
            tax,
            subtotal: (unit_price + tax) * Decimal::from(qty),
        }
    }

    /// Recompute derived fields after a quantity change, keeping the stored
    /// product snapshot.
    fn set_qty(&mut self, qty: u32) {
        self.qty = qty;
        self.tax = self.unit_price * self.product.tax_rate / Decimal::from(100);
        self.subtotal = (self.unit_price + self.tax) * Decimal::from(qty);
    }
}

/// In-memory line-item list with merge-by-product-id semantics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartLedger {
    items: Vec<CartLineItem>,
}

impl CartLedger {
    /// Empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Rehydrate from a persisted snapshot.
    #[must_use]
    pub const fn from_items(items: Vec<CartLineItem>) -> Self {
        Self { items }
    }

    /// Add `qty` of `product`.
    ///
    /// If a line for this product already exists its quantity is
    /// incremented and the line is repriced from the *current* product
    /// snapshot, so price changes on repeated adds are picked up. A zero
    /// `qty` is a no-op.
    pub fn add_item(&mut self, product: &Product, qty: u32) {
        if qty == 0 {
            return;
        }

        if let Some(line) = self.items.iter_mut().find(|l| l.product.id == product.id) {
            let merged = line.qty.saturating_add(qty);
            *line = CartLineItem::new(product, merged);
        } else {
            self.items.push(CartLineItem::new(product, qty));
        }
    }

    /// Set the quantity of the line for `product_id`.
    ///
    /// A quantity of zero removes the line. Other lines are untouched.
    pub fn update_quantity(&mut self, product_id: ProductId, qty: u32) {
        if qty == 0 {
            self.remove_item(product_id);
            return;
        }
        if let Some(line) = self.items.iter_mut().find(|l| l.product.id == product_id) {
            line.set_qty(qty);
        }
    }

    /// Remove the line for `product_id`. No-op if absent.
    pub fn remove_item(&mut self, product_id: ProductId) {
        self.items.retain(|l| l.product.id != product_id);
    }

    /// Drop all line items (e.g. after successful checkout).
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Current line items.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // =========================================================================
    // Derived accessors (pure folds, never memoized)
    // =========================================================================

    /// `Σ unit_price * qty`, tax-exclusive.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.qty))
            .sum()
    }

    /// `Σ unit_price * tax_rate / 100 * qty`.
    #[must_use]
    pub fn total_tax(&self) -> Decimal {
        self.items
            .iter()
            .map(|l| l.unit_price * l.product.tax_rate / Decimal::from(100) * Decimal::from(l.qty))
            .sum()
    }

    /// `subtotal + total_tax`.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.subtotal() + self.total_tax()
    }

    /// `Σ qty` over all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|l| l.qty).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use kirana_core::Barcode;
    use rust_decimal::dec;

    fn product(id: i64, mrp: Decimal, tax_rate: Decimal) -> Product {
        Product {
            id: ProductId::new(id),
            sku: format!("SKU-{id}"),
            barcode: Some(Barcode::new(format!("890{id:010}"))),
            name: format!("Product {id}"),
            mrp,
            tax_rate,
            category: Some("General".to_string()),
            attributes: crate::backend::types::ProductAttributes::default(),
            image_url: None,
        }
    }

    fn assert_consistent(ledger: &CartLedger) {
        assert_eq!(ledger.total(), ledger.subtotal() + ledger.total_tax());
        assert_eq!(
            ledger.item_count(),
            ledger.items().iter().map(|l| l.qty).sum::<u32>()
        );
    }

    #[test]
    fn test_add_item_creates_line() {
        let mut ledger = CartLedger::new();
        ledger.add_item(&product(1, dec!(100), dec!(5)), 2);

        assert_eq!(ledger.items().len(), 1);
        let line = &ledger.items()[0];
        assert_eq!(line.qty, 2);
        assert_eq!(line.unit_price, dec!(100));
        assert_eq!(line.tax, dec!(5));
        assert_eq!(line.subtotal, dec!(210));
        assert_consistent(&ledger);
    }

    #[test]
    fn test_merge_by_product_id() {
        let mut ledger = CartLedger::new();
        let p = product(1, dec!(100), dec!(5));
        ledger.add_item(&p, 2);
        ledger.add_item(&p, 3);

        assert_eq!(ledger.items().len(), 1);
        assert_eq!(ledger.items()[0].qty, 5);
        assert_eq!(ledger.items()[0].subtotal, dec!(525));
        assert_consistent(&ledger);
    }

    #[test]
    fn test_merge_saturates_instead_of_overflowing() {
        let mut ledger = CartLedger::new();
        let p = product(1, dec!(1), dec!(0));
        ledger.add_item(&p, u32::MAX);
        ledger.add_item(&p, 2);

        assert_eq!(ledger.items()[0].qty, u32::MAX);
        assert_consistent(&ledger);
    }

    #[test]
    fn test_repeat_add_reprices_from_current_snapshot() {
        let mut ledger = CartLedger::new();
        ledger.add_item(&product(1, dec!(100), dec!(5)), 1);
        // Price changed upstream before the second add.
        ledger.add_item(&product(1, dec!(120), dec!(5)), 1);

        let line = &ledger.items()[0];
        assert_eq!(line.qty, 2);
        assert_eq!(line.unit_price, dec!(120));
        assert_eq!(line.product.mrp, dec!(120));
        assert_eq!(line.subtotal, dec!(252));
    }

    #[test]
    fn test_example_scenario_totals() {
        // sku A: mrp=100, tax=5%, qty=2; sku B: mrp=50, tax=18%, qty=1
        let mut ledger = CartLedger::new();
        ledger.add_item(&product(1, dec!(100), dec!(5)), 2);
        ledger.add_item(&product(2, dec!(50), dec!(18)), 1);

        assert_eq!(ledger.subtotal(), dec!(250));
        assert_eq!(ledger.total_tax(), dec!(19));
        assert_eq!(ledger.total(), dec!(269));
        assert_eq!(ledger.item_count(), 3);
        assert_consistent(&ledger);
    }

    #[test]
    fn test_update_quantity_recomputes_only_that_line() {
        let mut ledger = CartLedger::new();
        ledger.add_item(&product(1, dec!(100), dec!(5)), 2);
        ledger.add_item(&product(2, dec!(50), dec!(18)), 1);

        ledger.update_quantity(ProductId::new(1), 4);
        assert_eq!(ledger.items()[0].qty, 4);
        assert_eq!(ledger.items()[0].subtotal, dec!(420));
        assert_eq!(ledger.items()[1].subtotal, dec!(59));
        assert_consistent(&ledger);
    }

    #[test]
    fn test_update_quantity_to_zero_removes() {
        let mut ledger = CartLedger::new();
        ledger.add_item(&product(1, dec!(100), dec!(5)), 2);
        ledger.update_quantity(ProductId::new(1), 0);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_update_quantity_unknown_product_is_noop() {
        let mut ledger = CartLedger::new();
        ledger.add_item(&product(1, dec!(100), dec!(5)), 2);
        ledger.update_quantity(ProductId::new(99), 7);
        assert_eq!(ledger.items()[0].qty, 2);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut ledger = CartLedger::new();
        ledger.add_item(&product(1, dec!(100), dec!(5)), 2);

        ledger.remove_item(ProductId::new(1));
        let after_first = ledger.clone();
        ledger.remove_item(ProductId::new(1));

        assert_eq!(ledger, after_first);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut ledger = CartLedger::new();
        ledger.add_item(&product(1, dec!(100), dec!(5)), 2);
        ledger.add_item(&product(2, dec!(50), dec!(18)), 1);
        ledger.clear();
        assert!(ledger.is_empty());
        assert_eq!(ledger.total(), Decimal::ZERO);
        assert_eq!(ledger.item_count(), 0);
    }

    #[test]
    fn test_add_zero_qty_is_noop() {
        let mut ledger = CartLedger::new();
        ledger.add_item(&product(1, dec!(100), dec!(5)), 0);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_serde_snapshot_shape() {
        let mut ledger = CartLedger::new();
        ledger.add_item(&product(1, dec!(100), dec!(5)), 2);

        let json = serde_json::to_value(&ledger).unwrap();
        // Persisted as a bare JSON array of line items.
        assert!(json.is_array());
        assert_eq!(json[0]["qty"], 2);
        assert_eq!(json[0]["unit_price"], "100");
        assert_eq!(json[0]["subtotal"], "210");

        let back: CartLedger = serde_json::from_value(json).unwrap();
        assert_eq!(back, ledger);
    }
}
