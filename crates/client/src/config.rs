//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `KIRANA_API_URL` - Base URL of the hosted backend (REST + auth)
//! - `KIRANA_API_KEY` - Backend API key (sent as `apikey` header)
//! - `RAZORPAY_KEY_ID` - Payment gateway key id
//! - `RAZORPAY_KEY_SECRET` - Payment gateway key secret
//!
//! ## Optional
//! - `KIRANA_CACHE_DIR` - Directory for the persistent cache (default: `.kirana/cache`)
//! - `KIRANA_PROBE_URL` - Reachability probe endpoint (default: generate_204)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

/// Default reachability probe endpoint (expects 204 No Content).
const DEFAULT_PROBE_URL: &str = "https://clients3.google.com/generate_204";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Top-level client configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Hosted backend configuration
    pub backend: BackendConfig,
    /// Payment gateway configuration
    pub razorpay: RazorpayConfig,
    /// Directory for the persistent key-value cache
    pub cache_dir: PathBuf,
    /// Endpoint used by the forced reachability probe
    pub probe_url: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Hosted backend (REST + OTP auth) configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://api.kirana.app`
    pub url: String,
    /// API key sent with every request
    pub api_key: SecretString,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("url", &self.url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Payment gateway (Razorpay) configuration.
///
/// Implements `Debug` manually to redact the key secret.
#[derive(Clone)]
pub struct RazorpayConfig {
    /// Public key id (safe to embed in checkout options)
    pub key_id: String,
    /// Key secret (server-side verification only)
    pub key_secret: SecretString,
}

impl std::fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or if secrets
    /// look like unreplaced placeholders.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let backend = BackendConfig {
            url: get_required_env("KIRANA_API_URL")?,
            api_key: get_validated_secret("KIRANA_API_KEY")?,
        };

        let razorpay = RazorpayConfig {
            key_id: get_required_env("RAZORPAY_KEY_ID")?,
            key_secret: get_validated_secret("RAZORPAY_KEY_SECRET")?,
        };

        let cache_dir = PathBuf::from(get_env_or_default("KIRANA_CACHE_DIR", ".kirana/cache"));
        let probe_url = get_env_or_default("KIRANA_PROBE_URL", DEFAULT_PROBE_URL);
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            backend,
            razorpay,
            cache_dir,
            probe_url,
            sentry_dsn,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a secret is not an unreplaced placeholder.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
