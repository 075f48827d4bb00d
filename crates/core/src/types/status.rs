//! Status enums for carts, payments, receipts, and connectivity.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a remote cart.
///
/// A cart is created `pending` at checkout time and transitions to `paid`
/// on successful payment. No writer may mutate a cart after its status
/// leaves `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CartStatus {
    #[default]
    Pending,
    Paid,
    Cleared,
    Cancelled,
}

impl CartStatus {
    /// Whether the cart may still be mutated.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Payment method selected at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Upi,
    Card,
    Cash,
}

impl PaymentMethod {
    /// Whether this method goes through the external payment gateway.
    ///
    /// Cash is settled at the counter and never touches the gateway.
    #[must_use]
    pub const fn is_electronic(self) -> bool {
        matches!(self, Self::Upi | Self::Card)
    }
}

/// Status of a payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Created,
    Captured,
    Failed,
}

/// Status of a receipt / exit-gate QR pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    #[default]
    Valid,
    Used,
    Expired,
}

/// Link-layer connection type reported by the OS connectivity callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    Wifi,
    Cellular,
    Ethernet,
    None,
    #[default]
    Unknown,
}
