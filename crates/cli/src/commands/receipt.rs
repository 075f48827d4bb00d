//! Receipt token inspection.
//!
//! # Usage
//!
//! ```bash
//! kirana-cli receipt decode -t "eyJjYXJ0X2lkIjo5MSwi..."
//! ```

use thiserror::Error;

use kirana_client::checkout::qr::{self, InvalidToken};

/// Errors that can occur while decoding a receipt token.
#[derive(Debug, Error)]
pub enum ReceiptCmdError {
    /// Token is not valid base64 JSON of the expected shape.
    #[error(transparent)]
    Invalid(#[from] InvalidToken),

    /// Payload could not be re-serialized for display.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Decode a scanned QR token and log its payload.
pub fn decode(token: &str) -> Result<(), ReceiptCmdError> {
    let payload = qr::decode_token(token)?;
    tracing::info!("Decoded receipt token:");
    tracing::info!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode("???"),
            Err(ReceiptCmdError::Invalid(InvalidToken))
        ));
    }
}
