//! Order submission flow.
//!
//! Checkout is a strictly sequential pipeline against the remote backend:
//! create a pending cart, push line items one at a time (re-deriving the
//! cart's totals from the remote rows after every insert), collect payment,
//! then mark the cart paid and issue a receipt. There is no rollback: a
//! failure at any step aborts the pipeline and leaves the cart `pending`
//! remotely, which back-office tooling sweeps up. The local cart is never
//! cleared here; the caller clears it only after a confirmation comes back.

pub mod qr;

use rand::Rng;
use rand::distr::Alphanumeric;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use kirana_core::{
    CartId, CartStatus, PaymentMethod, PaymentStatus, Phone, ReceiptId, ReceiptStatus, StoreId,
    UserId,
};

use crate::backend::CommerceBackend;
use crate::backend::types::{CartTotals, NewCartItem, NewPayment, NewReceipt};
use crate::cart::ledger::CartLineItem;
use crate::error::{AppError, Result};
use crate::payment::{CheckoutOptions, PaymentGateway};

/// Everything the confirmation screen needs after a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConfirmation {
    pub order_id: CartId,
    pub receipt_id: ReceiptId,
    /// Token rendered as the exit-gate QR code.
    pub qr_token: String,
    /// Amount actually charged, from the remote cart.
    pub total: Decimal,
    /// Gateway payment id, or the synthesized cash reference.
    pub txn_ref: String,
}

/// Sequential checkout pipeline over a backend and a payment gateway.
#[derive(Debug, Clone)]
pub struct CheckoutFlow<B, G> {
    backend: B,
    gateway: G,
    /// Gateway merchant key shown to the checkout sheet.
    key_id: String,
}

impl<B: CommerceBackend, G: PaymentGateway> CheckoutFlow<B, G> {
    pub fn new(backend: B, gateway: G, key_id: impl Into<String>) -> Self {
        Self {
            backend,
            gateway,
            key_id: key_id.into(),
        }
    }

    /// Submit the local cart as an order.
    ///
    /// # Errors
    ///
    /// Fails with [`AppError::EmptyCart`] for an empty item list, with
    /// [`AppError::Payment`] when the gateway declines or the user cancels,
    /// and with [`AppError::Backend`] when any remote step fails. In every
    /// failure case the remote cart (if one was created) stays `pending` and
    /// no payment or receipt row exists for it.
    #[instrument(
        skip(self, items, contact),
        fields(user_id = %user_id, store_id = %store_id, method = ?method, lines = items.len())
    )]
    pub async fn submit(
        &self,
        user_id: UserId,
        store_id: StoreId,
        method: PaymentMethod,
        items: &[CartLineItem],
        contact: Option<&Phone>,
    ) -> Result<OrderConfirmation> {
        if items.is_empty() {
            return Err(AppError::EmptyCart);
        }

        let cart = self.backend.create_cart(user_id, store_id).await?;
        info!(cart_id = %cart.id, "created pending cart");

        // Push lines one at a time; after each insert the totals are
        // recomputed from the rows the backend confirms, so a line that
        // fails to persist never inflates the amount charged.
        for line in items {
            self.backend
                .insert_cart_item(&NewCartItem {
                    cart_id: cart.id,
                    product_id: line.product.id,
                    qty: line.qty,
                    unit_price: line.unit_price,
                    tax: line.tax,
                })
                .await?;

            let persisted = self.backend.list_cart_items(cart.id).await?;
            let totals = CartTotals::from_lines(&persisted);
            self.backend.update_cart_totals(cart.id, &totals).await?;
        }

        // Charge what the backend says the cart is worth, not what the
        // local ledger computed.
        let cart = self.backend.fetch_cart(cart.id).await?;
        let amount = cart.total;

        let txn_ref = if method.is_electronic() {
            let options = CheckoutOptions {
                amount,
                currency: "INR".to_string(),
                key_id: self.key_id.clone(),
                description: format!("Order for cart {}", cart.id),
                contact: contact.cloned(),
            };
            let response = self.gateway.open(&options).await.map_err(|e| {
                warn!(cart_id = %cart.id, code = ?e.code, "payment aborted, cart left pending");
                e
            })?;
            response.payment_id
        } else {
            cash_reference()
        };

        self.backend
            .create_payment(&NewPayment {
                cart_id: cart.id,
                method,
                txn_ref: txn_ref.clone(),
                amount,
                status: PaymentStatus::Captured,
            })
            .await?;
        self.backend
            .update_cart_status(cart.id, CartStatus::Paid)
            .await?;

        let qr_token = qr::QrPayload::issue(cart.id, store_id, user_id, amount).encode();
        let receipt = self
            .backend
            .create_receipt(&NewReceipt {
                cart_id: cart.id,
                qr_token: qr_token.clone(),
                status: ReceiptStatus::Valid,
            })
            .await?;

        info!(cart_id = %cart.id, receipt_id = %receipt.id, %amount, "checkout complete");
        Ok(OrderConfirmation {
            order_id: cart.id,
            receipt_id: receipt.id,
            qr_token,
            total: amount,
            txn_ref,
        })
    }
}

/// Local reference for over-the-counter cash payments, e.g. `CASH-X7K2P9QM4T`.
fn cash_reference() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    format!("CASH-{}", suffix.to_uppercase())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cash_reference_shape() {
        let reference = cash_reference();
        assert!(reference.starts_with("CASH-"));
        assert_eq!(reference.len(), 15);
        assert!(
            reference[5..]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_lowercase())
        );
    }

    #[test]
    fn test_cash_references_are_unique() {
        assert_ne!(cash_reference(), cash_reference());
    }
}
