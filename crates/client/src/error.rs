//! Unified error handling for the client core.
//!
//! Each subsystem defines its own error enum; `AppError` unifies them at the
//! boundary the app layer sees. Cache faults never appear here: by design the
//! cache degrades to a miss instead of erroring. Only checkout and payment
//! errors are meant to surface as blocking alerts; everything else should be
//! rendered through [`AppError::user_message`] or silently absorbed by a
//! cache fallback.

use thiserror::Error;

use crate::backend::BackendError;
use crate::backend::auth::AuthError;
use crate::checkout::qr::InvalidToken;
use crate::payment::GatewayError;

/// Application-level error type for the commerce client.
#[derive(Debug, Error)]
pub enum AppError {
    /// Remote backend operation failed (and no cache could cover for it).
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// OTP authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Payment gateway operation failed or was cancelled.
    #[error("Payment error: {0}")]
    Payment(#[from] GatewayError),

    /// Device is offline and the cache holds nothing for this resource.
    #[error("No internet connection and no cached {0} available")]
    NoCachedData(&'static str),

    /// A QR receipt token failed to decode.
    #[error("Invalid receipt token")]
    InvalidToken(#[from] InvalidToken),

    /// Attempted to check out an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// User-facing message for this error.
    ///
    /// Payment errors carry through the gateway's translated message since
    /// money is at stake; data errors stay generic because the UI prefers
    /// stale cache over alarming the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Payment(err) => err.user_message(),
            Self::NoCachedData(what) => {
                format!("You're offline and no saved {what} are available yet.")
            }
            Self::Auth(_) => "Could not verify your phone number. Please try again.".to_string(),
            Self::EmptyCart => "Your cart is empty.".to_string(),
            Self::InvalidToken(_) => "This receipt code is not valid.".to_string(),
            Self::Backend(_) | Self::Internal(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
