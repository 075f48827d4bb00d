//! Receipt QR tokens.
//!
//! The exit-gate scanner reads a base64-encoded JSON payload identifying the
//! paid cart. The token is opaque to the scanner firmware; both ends agree
//! only on this module's encoding. Decoding never panics: any malformed
//! input maps to [`InvalidToken`].

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use kirana_core::{CartId, StoreId, UserId};

use crate::cache::store::now_ms;

/// The token was not valid base64-encoded JSON of the expected shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid receipt token")]
pub struct InvalidToken;

/// Decoded contents of a receipt QR token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrPayload {
    pub cart_id: CartId,
    pub store_id: StoreId,
    pub user_id: UserId,
    /// Amount actually paid, from the authoritative remote cart.
    pub amount: Decimal,
    /// Milliseconds since the Unix epoch at generation time.
    pub timestamp: i64,
    /// Random nonce so two receipts for identical carts differ.
    pub nonce: String,
}

impl QrPayload {
    /// Build a payload for a freshly paid cart, stamping time and nonce.
    #[must_use]
    pub fn issue(cart_id: CartId, store_id: StoreId, user_id: UserId, amount: Decimal) -> Self {
        Self {
            cart_id,
            store_id,
            user_id,
            amount,
            timestamp: now_ms(),
            nonce: Uuid::new_v4().to_string(),
        }
    }

    /// Encode as the token string embedded in the QR code.
    #[must_use]
    pub fn encode(&self) -> String {
        // Serialization of a plain struct with no map keys cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        STANDARD.encode(json)
    }
}

/// Decode a scanned token back into its payload.
///
/// # Errors
///
/// Returns [`InvalidToken`] for anything that is not base64 JSON of the
/// expected shape. Arbitrary scanner input must never panic.
pub fn decode_token(token: &str) -> Result<QrPayload, InvalidToken> {
    let bytes = STANDARD.decode(token.trim()).map_err(|_| InvalidToken)?;
    serde_json::from_slice(&bytes).map_err(|_| InvalidToken)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    fn payload() -> QrPayload {
        QrPayload::issue(
            CartId::new(91),
            StoreId::new(3),
            UserId::new(7),
            dec!(269.00),
        )
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let issued = payload();
        let decoded = decode_token(&issued.encode()).unwrap();
        assert_eq!(decoded, issued);
    }

    #[test]
    fn test_token_is_base64_json() {
        let token = payload().encode();
        let bytes = STANDARD.decode(&token).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["cart_id"], 91);
        assert_eq!(value["amount"], "269.00");
        assert!(value["nonce"].is_string());
    }

    #[test]
    fn test_two_tokens_for_same_cart_differ() {
        assert_ne!(payload().encode(), payload().encode());
    }

    #[test]
    fn test_garbage_is_rejected_not_panicked() {
        assert_eq!(decode_token("not base64 at all!!"), Err(InvalidToken));
        // Valid base64, not JSON.
        assert_eq!(decode_token(&STANDARD.encode("hello")), Err(InvalidToken));
        // Valid JSON, wrong shape.
        assert_eq!(decode_token(&STANDARD.encode("{\"a\":1}")), Err(InvalidToken));
        assert_eq!(decode_token(""), Err(InvalidToken));
    }

    #[test]
    fn test_decode_tolerates_surrounding_whitespace() {
        let token = payload().encode();
        assert!(decode_token(&format!("  {token}\n")).is_ok());
    }
}
