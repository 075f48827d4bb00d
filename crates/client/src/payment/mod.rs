//! Payment gateway contract and error translation.
//!
//! The gateway itself is a platform SDK that opens a checkout sheet; this
//! crate only fixes the contract: [`PaymentGateway::open`] either yields
//! the gateway's ids or a structured [`GatewayError`]. The app layer
//! bridges the SDK into this trait; tests use in-memory doubles.
//!
//! Gateway errors are the one error class that must reach the user
//! verbatim-ish, so [`GatewayError::user_message`] translates the SDK's
//! code/reason taxonomy into actionable text before the UI rethrows it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use kirana_core::Phone;

/// Options passed to the gateway checkout sheet.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOptions {
    /// Authoritative amount from the remote cart (not the local ledger).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Gateway key id identifying the merchant account.
    pub key_id: String,
    /// Human-readable order description shown on the sheet.
    pub description: String,
    /// Prefill for the contact field, when the user is known.
    pub contact: Option<Phone>,
}

/// Successful gateway response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayResponse {
    pub payment_id: String,
    pub order_id: String,
    pub signature: String,
}

/// Classified gateway failure causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// User dismissed the checkout sheet.
    Cancelled,
    /// Device or gateway network failure mid-payment.
    NetworkFailure,
    InsufficientFunds,
    Timeout,
    /// Issuer declined the payment.
    Declined,
    /// Anything the SDK reports that we do not classify.
    Other,
}

/// Structured gateway error: `{code, description, reason}`.
#[derive(Debug, Clone, Error)]
#[error("payment failed ({code:?}): {description}")]
pub struct GatewayError {
    pub code: GatewayErrorCode,
    pub description: String,
    pub reason: Option<String>,
}

impl GatewayError {
    /// Build from the raw code/reason strings the SDK reports.
    #[must_use]
    pub fn from_sdk(code: &str, description: impl Into<String>, reason: Option<String>) -> Self {
        let classified = Self::classify(code, reason.as_deref());
        Self {
            code: classified,
            description: description.into(),
            reason,
        }
    }

    fn classify(code: &str, reason: Option<&str>) -> GatewayErrorCode {
        let needle = |s: &str, what: &str| s.to_lowercase().contains(what);

        if needle(code, "cancel") || reason.is_some_and(|r| needle(r, "cancel")) {
            GatewayErrorCode::Cancelled
        } else if needle(code, "network") || reason.is_some_and(|r| needle(r, "network")) {
            GatewayErrorCode::NetworkFailure
        } else if reason.is_some_and(|r| needle(r, "insufficient")) {
            GatewayErrorCode::InsufficientFunds
        } else if needle(code, "timeout") || reason.is_some_and(|r| needle(r, "timeout")) {
            GatewayErrorCode::Timeout
        } else if reason.is_some_and(|r| needle(r, "declined")) {
            GatewayErrorCode::Declined
        } else {
            GatewayErrorCode::Other
        }
    }

    /// User-facing message for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.code {
            GatewayErrorCode::Cancelled => "Payment was cancelled.".to_string(),
            GatewayErrorCode::NetworkFailure => {
                "Network issue during payment. Please check your connection and try again."
                    .to_string()
            }
            GatewayErrorCode::InsufficientFunds => {
                "Payment declined due to insufficient funds.".to_string()
            }
            GatewayErrorCode::Timeout => "Payment timed out. Please try again.".to_string(),
            GatewayErrorCode::Declined => {
                "Payment was declined by your bank. Try another method.".to_string()
            }
            GatewayErrorCode::Other => "Payment failed. Please try again.".to_string(),
        }
    }
}

/// Contract consumed from the external payment gateway.
pub trait PaymentGateway: Send + Sync {
    /// Open the checkout sheet and collect a payment.
    fn open(
        &self,
        options: &CheckoutOptions,
    ) -> impl Future<Output = Result<GatewayResponse, GatewayError>> + Send;
}
