//! Network reachability tracking.
//!
//! Keeps a process-wide, always-current connectivity flag. State changes
//! come exclusively from the OS connectivity callback (bridged into
//! [`ReachabilityTracker::update`]) or from an explicit
//! [`ReachabilityTracker::check_connection`] probe; reads never trigger
//! network I/O.
//!
//! Every remote-data accessor branches on [`ReachabilityTracker::is_online`]
//! before attempting a call: offline means serve from cache, and only a
//! cache miss on top of that surfaces an error.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, instrument};

use kirana_core::ConnectionType;

use crate::cache::store::now_ms;

/// How long the forced probe waits before declaring the internet
/// unreachable.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Last-known connectivity state.
///
/// Two independent axes: `is_connected` is link-layer (we have a network
/// interface up), `is_internet_reachable` is whether packets actually get
/// out (`None` until first verified).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
    pub is_connected: bool,
    pub is_internet_reachable: Option<bool>,
    pub connection_type: ConnectionType,
    /// Epoch milliseconds of the last callback or probe.
    pub last_checked: i64,
}

impl NetworkState {
    /// Whether this state counts as online.
    ///
    /// Link up and internet not known-unreachable. `None` reachability is
    /// treated optimistically so the first fetch after startup is attempted
    /// rather than served stale.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.is_connected && self.is_internet_reachable != Some(false)
    }
}

impl Default for NetworkState {
    fn default() -> Self {
        Self {
            is_connected: true,
            is_internet_reachable: None,
            connection_type: ConnectionType::Unknown,
            last_checked: 0,
        }
    }
}

/// Process-wide connectivity tracker.
///
/// Cheaply cloneable; all clones share the same state.
#[derive(Debug, Clone)]
pub struct ReachabilityTracker {
    inner: Arc<TrackerInner>,
}

#[derive(Debug)]
struct TrackerInner {
    tx: watch::Sender<NetworkState>,
    client: reqwest::Client,
    probe_url: String,
}

impl ReachabilityTracker {
    /// Create a tracker probing `probe_url` (a generate-204 style endpoint).
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client fails to build.
    pub fn new(probe_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build()?;
        let (tx, _) = watch::channel(NetworkState::default());

        Ok(Self {
            inner: Arc::new(TrackerInner {
                tx,
                client,
                probe_url: probe_url.into(),
            }),
        })
    }

    /// Synchronous, non-blocking read of the last-known online state.
    ///
    /// Trusts the most recent callback or probe; never touches the network.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.inner.tx.borrow().is_online()
    }

    /// Snapshot of the full last-known state.
    #[must_use]
    pub fn state(&self) -> NetworkState {
        *self.inner.tx.borrow()
    }

    /// Entry point for the OS connectivity callback.
    ///
    /// Replaces the tracked state and wakes any [`Self::wait_for_connection`]
    /// callers.
    pub fn update(
        &self,
        is_connected: bool,
        is_internet_reachable: Option<bool>,
        connection_type: ConnectionType,
    ) {
        let state = NetworkState {
            is_connected,
            is_internet_reachable,
            connection_type,
            last_checked: now_ms(),
        };
        debug!(?state, "connectivity changed");
        self.inner.tx.send_replace(state);
    }

    /// Force an immediate reachability probe outside the callback cadence.
    ///
    /// Issues a HEAD request against the probe endpoint, folds the result
    /// into the tracked state, and returns whether the internet was
    /// reachable.
    #[instrument(skip(self))]
    pub async fn check_connection(&self) -> bool {
        let reachable = self
            .inner
            .client
            .head(&self.inner.probe_url)
            .send()
            .await
            .is_ok_and(|resp| resp.status().is_success());

        let previous = *self.inner.tx.borrow();
        let state = NetworkState {
            // A successful probe proves the link is up regardless of what
            // the last callback said.
            is_connected: reachable || previous.is_connected,
            is_internet_reachable: Some(reachable),
            connection_type: previous.connection_type,
            last_checked: now_ms(),
        };
        self.inner.tx.send_replace(state);
        reachable
    }

    /// Wait until a connectivity callback reports online, bounded by
    /// `timeout`.
    ///
    /// Resolves `true` immediately if already online; otherwise `true` on
    /// the first state change that is online, or `false` once `timeout`
    /// elapses.
    pub async fn wait_for_connection(&self, timeout: Duration) -> bool {
        if self.is_online() {
            return true;
        }

        let mut rx = self.inner.tx.subscribe();
        let wait = async {
            loop {
                if rx.changed().await.is_err() {
                    return false;
                }
                if rx.borrow().is_online() {
                    return true;
                }
            }
        };

        (tokio::time::timeout(timeout, wait).await).unwrap_or(false)
    }

    /// Watch receiver for components that render connectivity.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<NetworkState> {
        self.inner.tx.subscribe()
    }
}
