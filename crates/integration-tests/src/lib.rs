//! Integration test support for Kirana.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p kirana-integration-tests
//! ```
//!
//! Everything runs in-process: [`FakeBackend`] stands in for the hosted
//! REST backend and the gateway doubles stand in for the payment SDK, so
//! the full catalog and checkout pipelines can be exercised without a
//! network.
//!
//! # Test Categories
//!
//! - `checkout_flow` - End-to-end order submission
//! - `offline_catalog` - Cache fallback behavior across restarts

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Mutex;

use rust_decimal::Decimal;

use kirana_client::backend::types::{
    CartItemRow, CartRow, CartTotals, NewCartItem, NewPayment, NewReceipt, PaymentRow, Product,
    ProductAttributes, ReceiptRow, Store,
};
use kirana_client::backend::{BackendError, CommerceBackend};
use kirana_client::payment::{CheckoutOptions, GatewayError, GatewayResponse, PaymentGateway};
use kirana_core::{
    Barcode, CartId, CartItemId, CartStatus, PaymentId, ProductId, ReceiptId, StoreId, UserId,
};

// ============================================================================
// Fixtures
// ============================================================================

/// A barcoded test product with the given price and tax percentage.
#[must_use]
pub fn product(id: i64, mrp: Decimal, tax_rate: Decimal) -> Product {
    Product {
        id: ProductId::new(id),
        sku: format!("SKU-{id}"),
        barcode: Some(Barcode::new(format!("890{id:010}"))),
        name: format!("Product {id}"),
        mrp,
        tax_rate,
        category: Some("Grocery".to_string()),
        attributes: ProductAttributes::default(),
        image_url: None,
    }
}

/// A test store.
#[must_use]
pub fn store(id: i64) -> Store {
    Store {
        id: StoreId::new(id),
        name: format!("Store {id}"),
        address: Some("12 MG Road".to_string()),
        city: Some("Bengaluru".to_string()),
        is_active: true,
    }
}

// ============================================================================
// Fake Backend
// ============================================================================

/// The backend operation at which [`FakeBackend`] should start failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    FetchProducts,
    InsertCartItem,
    UpdateCartTotals,
    FetchCart,
    CreatePayment,
    UpdateCartStatus,
    CreateReceipt,
}

#[derive(Debug, Default)]
struct BackendState {
    products: Vec<Product>,
    stores: Vec<Store>,
    categories: Vec<String>,
    carts: Vec<CartRow>,
    cart_items: Vec<CartItemRow>,
    payments: Vec<PaymentRow>,
    receipts: Vec<ReceiptRow>,
    next_id: i64,
    fail_on: Option<FailPoint>,
}

impl BackendState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, op: FailPoint) -> Result<(), BackendError> {
        if self.fail_on == Some(op) {
            return Err(BackendError::Api {
                status: 503,
                message: format!("injected failure at {op:?}"),
            });
        }
        Ok(())
    }
}

/// In-memory stand-in for the hosted backend.
///
/// Rows live in plain vectors; tests inspect them afterwards to assert what
/// the pipeline actually persisted. A single [`FailPoint`] can be armed to
/// make one operation fail with a 503.
#[derive(Debug, Default)]
pub struct FakeBackend {
    state: Mutex<BackendState>,
}

impl FakeBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend pre-seeded with catalog data.
    #[must_use]
    pub fn with_catalog(products: Vec<Product>, stores: Vec<Store>) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.lock();
            state.categories = products
                .iter()
                .filter_map(|p| p.category.clone())
                .collect();
            state.categories.dedup();
            state.products = products;
            state.stores = stores;
        }
        backend
    }

    /// Arm a failure: the named operation returns a 503 from now on.
    pub fn fail_on(&self, point: FailPoint) {
        self.lock().fail_on = Some(point);
    }

    /// Disarm any injected failure.
    pub fn heal(&self) {
        self.lock().fail_on = None;
    }

    pub fn carts(&self) -> Vec<CartRow> {
        self.lock().carts.clone()
    }

    pub fn cart_items(&self) -> Vec<CartItemRow> {
        self.lock().cart_items.clone()
    }

    pub fn payments(&self) -> Vec<PaymentRow> {
        self.lock().payments.clone()
    }

    pub fn receipts(&self) -> Vec<ReceiptRow> {
        self.lock().receipts.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl CommerceBackend for &FakeBackend {
    async fn fetch_products(&self, store_id: StoreId) -> Result<Vec<Product>, BackendError> {
        let _ = store_id;
        let state = self.lock();
        state.check(FailPoint::FetchProducts)?;
        Ok(state.products.clone())
    }

    async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, BackendError> {
        let state = self.lock();
        state.check(FailPoint::FetchProducts)?;
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }

    async fn fetch_product_by_barcode(
        &self,
        code: &Barcode,
    ) -> Result<Option<Product>, BackendError> {
        let state = self.lock();
        state.check(FailPoint::FetchProducts)?;
        Ok(state
            .products
            .iter()
            .find(|p| p.barcode.as_ref() == Some(code))
            .cloned())
    }

    async fn fetch_categories(&self) -> Result<Vec<String>, BackendError> {
        let state = self.lock();
        state.check(FailPoint::FetchProducts)?;
        Ok(state.categories.clone())
    }

    async fn fetch_stores(&self) -> Result<Vec<Store>, BackendError> {
        let state = self.lock();
        state.check(FailPoint::FetchProducts)?;
        Ok(state.stores.clone())
    }

    async fn create_cart(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<CartRow, BackendError> {
        let mut state = self.lock();
        let id = CartId::new(state.next_id());
        let cart = CartRow {
            id,
            user_id,
            store_id,
            status: CartStatus::Pending,
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
            total: Decimal::ZERO,
        };
        state.carts.push(cart.clone());
        Ok(cart)
    }

    async fn fetch_cart(&self, cart_id: CartId) -> Result<CartRow, BackendError> {
        let state = self.lock();
        state.check(FailPoint::FetchCart)?;
        state
            .carts
            .iter()
            .find(|c| c.id == cart_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("cart {cart_id}")))
    }

    async fn update_cart_totals(
        &self,
        cart_id: CartId,
        totals: &CartTotals,
    ) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.check(FailPoint::UpdateCartTotals)?;
        if let Some(cart) = state.carts.iter_mut().find(|c| c.id == cart_id) {
            cart.subtotal = totals.subtotal;
            cart.tax = totals.tax;
            cart.discount = totals.discount;
            cart.total = totals.total;
        }
        Ok(())
    }

    async fn update_cart_status(
        &self,
        cart_id: CartId,
        status: CartStatus,
    ) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.check(FailPoint::UpdateCartStatus)?;
        if let Some(cart) = state.carts.iter_mut().find(|c| c.id == cart_id) {
            cart.status = status;
        }
        Ok(())
    }

    async fn insert_cart_item(&self, item: &NewCartItem) -> Result<CartItemRow, BackendError> {
        let mut state = self.lock();
        state.check(FailPoint::InsertCartItem)?;
        let id = CartItemId::new(state.next_id());
        let row = CartItemRow {
            id,
            cart_id: item.cart_id,
            product_id: item.product_id,
            qty: item.qty,
            unit_price: item.unit_price,
            tax: item.tax,
        };
        state.cart_items.push(row.clone());
        Ok(row)
    }

    async fn list_cart_items(&self, cart_id: CartId) -> Result<Vec<CartItemRow>, BackendError> {
        let state = self.lock();
        Ok(state
            .cart_items
            .iter()
            .filter(|i| i.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn create_payment(&self, payment: &NewPayment) -> Result<PaymentRow, BackendError> {
        let mut state = self.lock();
        state.check(FailPoint::CreatePayment)?;
        let id = PaymentId::new(state.next_id());
        let row = PaymentRow {
            id,
            cart_id: payment.cart_id,
            method: payment.method,
            txn_ref: payment.txn_ref.clone(),
            amount: payment.amount,
            status: payment.status,
        };
        state.payments.push(row.clone());
        Ok(row)
    }

    async fn create_receipt(&self, receipt: &NewReceipt) -> Result<ReceiptRow, BackendError> {
        let mut state = self.lock();
        state.check(FailPoint::CreateReceipt)?;
        let id = ReceiptId::new(state.next_id());
        let row = ReceiptRow {
            id,
            cart_id: receipt.cart_id,
            qr_token: receipt.qr_token.clone(),
            status: receipt.status,
        };
        state.receipts.push(row.clone());
        Ok(row)
    }
}

// ============================================================================
// Gateway Doubles
// ============================================================================

/// Gateway that approves every payment, recording the charged amounts.
#[derive(Debug, Default)]
pub struct ApprovingGateway {
    charges: Mutex<Vec<Decimal>>,
}

impl ApprovingGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Amounts the gateway was asked to charge, in order.
    pub fn charges(&self) -> Vec<Decimal> {
        self.charges
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl PaymentGateway for &ApprovingGateway {
    async fn open(
        &self,
        options: &CheckoutOptions,
    ) -> Result<GatewayResponse, GatewayError> {
        self.charges
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(options.amount);
        Ok(GatewayResponse {
            payment_id: format!("pay_{}", options.amount),
            order_id: "order_test".to_string(),
            signature: "sig_test".to_string(),
        })
    }
}

/// Gateway that rejects every payment with the given SDK code and reason.
#[derive(Debug)]
pub struct DecliningGateway {
    code: &'static str,
    reason: Option<&'static str>,
}

impl DecliningGateway {
    /// The user dismissed the checkout sheet.
    #[must_use]
    pub const fn cancelling() -> Self {
        Self {
            code: "payment_cancelled",
            reason: None,
        }
    }

    /// The issuer declined the payment.
    #[must_use]
    pub const fn declining() -> Self {
        Self {
            code: "BAD_REQUEST_ERROR",
            reason: Some("card declined by issuer"),
        }
    }
}

impl PaymentGateway for &DecliningGateway {
    async fn open(
        &self,
        _options: &CheckoutOptions,
    ) -> Result<GatewayResponse, GatewayError> {
        Err(GatewayError::from_sdk(
            self.code,
            "Payment failed",
            self.reason.map(str::to_string),
        ))
    }
}
