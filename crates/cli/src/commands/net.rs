//! Connectivity check command.
//!
//! # Usage
//!
//! ```bash
//! kirana-cli net check
//! ```
//!
//! # Environment Variables
//!
//! - `KIRANA_PROBE_URL` - Probe endpoint (default: generate_204)

use thiserror::Error;

use kirana_client::net::ReachabilityTracker;

const DEFAULT_PROBE_URL: &str = "https://clients3.google.com/generate_204";

/// Errors that can occur during the connectivity check.
#[derive(Debug, Error)]
pub enum NetCmdError {
    /// The probe HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Probe the reachability endpoint once and report the result.
pub async fn check() -> Result<(), NetCmdError> {
    dotenvy::dotenv().ok();
    let probe_url =
        std::env::var("KIRANA_PROBE_URL").unwrap_or_else(|_| DEFAULT_PROBE_URL.to_string());

    tracing::info!("Probing {probe_url}...");
    let tracker = ReachabilityTracker::new(probe_url)?;
    let reachable = tracker.check_connection().await;

    let state = tracker.state();
    tracing::info!(
        "Internet reachable: {reachable} (checked at epoch ms {})",
        state.last_checked
    );
    Ok(())
}
