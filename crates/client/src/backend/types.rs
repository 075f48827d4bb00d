//! Domain types exchanged with the hosted backend.
//!
//! These mirror the backend's relational rows (`products`, `stores`,
//! `carts`, `cart_items`, `payments`, `receipts`) as clean client-side
//! types. All money fields are `Decimal`; tax rates are percentages.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use kirana_core::{
    Barcode, CartId, CartItemId, CartStatus, PaymentId, PaymentMethod, PaymentStatus, ProductId,
    ReceiptId, ReceiptStatus, StoreId, UserId,
};

// =============================================================================
// Catalog Types
// =============================================================================

/// A retail product as served by the backend.
///
/// Cached under two keys: the primary id index and, when a barcode is
/// present, the barcode index. Both must be written together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Merchant SKU.
    pub sku: String,
    /// Scannable EAN/UPC, when the product is barcoded.
    pub barcode: Option<Barcode>,
    pub name: String,
    /// Maximum retail price per unit.
    pub mrp: Decimal,
    /// Tax rate as a percentage (e.g. `5` for 5% GST).
    pub tax_rate: Decimal,
    pub category: Option<String>,
    #[serde(default)]
    pub attributes: ProductAttributes,
    /// Primary product image, when available.
    pub image_url: Option<String>,
}

/// Known product attributes plus an open extension map.
///
/// The backend exposes attributes as an open JSON object; the fields the
/// client actually renders are typed, everything else rides along in
/// `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductAttributes {
    pub brand: Option<String>,
    /// Pack size, e.g. `"500g"` or `"1L"`.
    pub pack_size: Option<String>,
    pub country_of_origin: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A physical store the shopper can select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub is_active: bool,
}

// =============================================================================
// Checkout Rows
// =============================================================================

/// A remote cart row, created once per checkout attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartRow {
    pub id: CartId,
    pub user_id: UserId,
    pub store_id: StoreId,
    pub status: CartStatus,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Aggregate totals recomputed from the remote line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl CartTotals {
    /// Zero totals for a freshly created cart.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }

    /// Recompute totals from a set of persisted line items.
    ///
    /// `subtotal = Σ unit_price * qty`, `tax = Σ tax * qty`,
    /// `total = subtotal + tax`. Only lines that actually persisted
    /// contribute, which is what makes the sequential checkout totals
    /// trustworthy.
    #[must_use]
    pub fn from_lines(lines: &[CartItemRow]) -> Self {
        let mut subtotal = Decimal::ZERO;
        let mut tax = Decimal::ZERO;
        for line in lines {
            let qty = Decimal::from(line.qty);
            subtotal += line.unit_price * qty;
            tax += line.tax * qty;
        }
        Self {
            subtotal,
            tax,
            discount: Decimal::ZERO,
            total: subtotal + tax,
        }
    }
}

/// A persisted remote line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItemRow {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub qty: u32,
    pub unit_price: Decimal,
    /// Tax amount per unit.
    pub tax: Decimal,
}

/// Payload for inserting a remote line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub qty: u32,
    pub unit_price: Decimal,
    pub tax: Decimal,
}

/// A payment row, one-to-one with a cart in the happy path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRow {
    pub id: PaymentId,
    pub cart_id: CartId,
    pub method: PaymentMethod,
    /// Gateway payment id, or a synthesized local reference for cash.
    pub txn_ref: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
}

/// Payload for recording a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub cart_id: CartId,
    pub method: PaymentMethod,
    pub txn_ref: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
}

/// A receipt row carrying the scannable QR token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRow {
    pub id: ReceiptId,
    pub cart_id: CartId,
    pub qr_token: String,
    pub status: ReceiptStatus,
}

/// Payload for creating a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReceipt {
    pub cart_id: CartId,
    pub qr_token: String,
    pub status: ReceiptStatus,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    fn line(product_id: i64, qty: u32, unit_price: Decimal, tax: Decimal) -> CartItemRow {
        CartItemRow {
            id: CartItemId::new(product_id),
            cart_id: CartId::new(1),
            product_id: ProductId::new(product_id),
            qty,
            unit_price,
            tax,
        }
    }

    #[test]
    fn test_totals_from_lines() {
        let lines = vec![
            line(1, 2, dec!(100), dec!(5)),
            line(2, 1, dec!(50), dec!(9)),
        ];
        let totals = CartTotals::from_lines(&lines);
        assert_eq!(totals.subtotal, dec!(250));
        assert_eq!(totals.tax, dec!(19));
        assert_eq!(totals.total, dec!(269));
        assert_eq!(totals.discount, Decimal::ZERO);
    }

    #[test]
    fn test_totals_from_no_lines_is_zero() {
        assert_eq!(CartTotals::from_lines(&[]), CartTotals::zero());
    }

    #[test]
    fn test_product_attributes_open_map_roundtrip() {
        let json = r#"{"brand":"Amul","shelf":"A4","organic":true}"#;
        let attrs: ProductAttributes = serde_json::from_str(json).unwrap();
        assert_eq!(attrs.brand.as_deref(), Some("Amul"));
        assert_eq!(attrs.extra["shelf"], "A4");
        assert_eq!(attrs.extra["organic"], true);

        let back = serde_json::to_value(&attrs).unwrap();
        assert_eq!(back["shelf"], "A4");
    }
}
