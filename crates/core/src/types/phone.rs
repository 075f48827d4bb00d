//! Phone number type for OTP authentication.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The number is missing the leading + country prefix.
    #[error("phone number must start with a + country code")]
    MissingCountryCode,
    /// The number contains characters other than digits after the prefix.
    #[error("phone number may only contain digits after the country code")]
    InvalidCharacter,
    /// The number has the wrong number of digits.
    #[error("phone number must have between {min} and {max} digits")]
    BadLength {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
    },
}

/// A phone number in E.164 form, used as the account identifier for
/// OTP authentication.
///
/// ## Constraints
///
/// - Must start with `+` followed by digits only
/// - 8-15 digits total (E.164 limit)
///
/// ## Examples
///
/// ```
/// use kirana_core::Phone;
///
/// assert!(Phone::parse("+919876543210").is_ok());
/// assert!(Phone::parse("9876543210").is_err());  // missing country code
/// assert!(Phone::parse("+91 98765").is_err());   // whitespace
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Minimum number of digits (E.164 practical floor).
    pub const MIN_DIGITS: usize = 8;
    /// Maximum number of digits (E.164 limit).
    pub const MAX_DIGITS: usize = 15;

    /// Parse a `Phone` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, lacks the `+` prefix,
    /// contains non-digit characters, or has an out-of-range digit count.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        let digits = s.strip_prefix('+').ok_or(PhoneError::MissingCountryCode)?;

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneError::InvalidCharacter);
        }

        if digits.len() < Self::MIN_DIGITS || digits.len() > Self::MAX_DIGITS {
            return Err(PhoneError::BadLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the phone number as a string slice (with the `+` prefix).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Phone` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Phone {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
