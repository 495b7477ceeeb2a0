//! Device link supervision.
//!
//! A [`Link`] is the slot holding the transport currently in use. The
//! [`LinkSupervisor`] fills it: connect, publish, run the inbound loop until
//! the transport fails, clear the slot, back off, and try again. After
//! `max_retries` consecutive failed connection attempts it gives up and the
//! link stays [`LinkState::Failed`]; the state store keeps serving the last
//! known values.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use climalink_core::SerialSettings;
use climalink_transport::{Connector, LineTransport};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::inbound::InboundSync;

// =============================================================================
// Link State
// =============================================================================

/// Where the link is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Serial is disabled in configuration.
    Disabled,
    /// A connection attempt is under way.
    Connecting,
    /// A transport is published and the inbound loop is running.
    Connected,
    /// Waiting before the next connection attempt.
    Backoff,
    /// Retries exhausted; the supervisor has stopped.
    Failed,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Disabled => write!(f, "disabled"),
            LinkState::Connecting => write!(f, "connecting"),
            LinkState::Connected => write!(f, "connected"),
            LinkState::Backoff => write!(f, "backoff"),
            LinkState::Failed => write!(f, "failed"),
        }
    }
}

// =============================================================================
// Link
// =============================================================================

/// Slot for the transport currently connected to the device.
pub struct Link<T> {
    current: RwLock<Option<Arc<T>>>,
    state: watch::Sender<LinkState>,
}

impl<T> fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("state", &self.state())
            .field("connected", &self.current.read().is_some())
            .finish()
    }
}

impl<T> Link<T> {
    pub fn new(initial: LinkState) -> Self {
        Self {
            current: RwLock::new(None),
            state: watch::Sender::new(initial),
        }
    }

    /// The connected transport, if any.
    pub fn current(&self) -> Option<Arc<T>> {
        self.current.read().clone()
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// Receiver for state transitions.
    pub fn watch_state(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    pub(crate) fn publish(&self, transport: Arc<T>) {
        *self.current.write() = Some(transport);
    }

    pub(crate) fn clear(&self) {
        self.current.write().take();
    }

    pub(crate) fn set_state(&self, state: LinkState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Link state changed");
        }
    }
}

// =============================================================================
// Reconnect Policy
// =============================================================================

/// Reconnection timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Consecutive failed attempts before giving up (0 = never).
    pub max_retries: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&SerialSettings::default())
    }
}

impl From<&SerialSettings> for ReconnectPolicy {
    fn from(settings: &SerialSettings) -> Self {
        Self {
            initial_backoff: settings.initial_backoff(),
            max_backoff: settings.max_backoff(),
            max_retries: settings.max_retries,
        }
    }
}

impl ReconnectPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    fn exhausted(&self, failures: u32) -> bool {
        self.max_retries > 0 && failures >= self.max_retries
    }
}

// =============================================================================
// Supervisor
// =============================================================================

/// Keeps a [`Link`] connected.
pub struct LinkSupervisor<C: Connector> {
    connector: C,
    link: Arc<Link<C::Transport>>,
    inbound: InboundSync,
    policy: ReconnectPolicy,
}

impl<C: Connector> LinkSupervisor<C> {
    pub fn new(
        connector: C,
        link: Arc<Link<C::Transport>>,
        inbound: InboundSync,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            connector,
            link,
            inbound,
            policy,
        }
    }

    /// Supervise until retries are exhausted.
    ///
    /// Returns the error of the last failed connection attempt. With
    /// `max_retries == 0` it never returns.
    pub async fn run(self) -> Result<()> {
        info!(target_device = %self.connector.describe(), "Link supervisor starting");

        let mut backoff = self.policy.backoff();
        let mut failures = 0u32;

        loop {
            self.link.set_state(LinkState::Connecting);

            match self.connector.connect().await {
                Ok(transport) => {
                    let transport = Arc::new(transport);
                    info!(device = %transport.describe(), "Device connected");

                    backoff.reset();
                    failures = 0;

                    self.link.publish(transport.clone());
                    self.link.set_state(LinkState::Connected);

                    let err = self.inbound.run(transport.as_ref()).await;

                    self.link.clear();
                    warn!(device = %transport.describe(), error = %err, "Device link lost");
                }
                Err(e) => {
                    failures += 1;
                    error!(
                        target_device = %self.connector.describe(),
                        attempt = failures,
                        error = %e,
                        "Connection attempt failed"
                    );

                    if self.policy.exhausted(failures) {
                        self.link.set_state(LinkState::Failed);
                        error!(
                            max_retries = self.policy.max_retries,
                            "Max reconnection attempts reached, giving up on device"
                        );
                        return Err(e.into());
                    }
                }
            }

            self.link.set_state(LinkState::Backoff);
            let delay = backoff.next_backoff().unwrap_or(self.policy.max_backoff);
            debug!(?delay, attempt = failures, "Waiting before reconnect");
            tokio::time::sleep(delay).await;
        }
    }
}

/// Wait until the link reaches `state`.
///
/// Returns `false` if the link was dropped first.
pub async fn wait_for_state(mut states: watch::Receiver<LinkState>, state: LinkState) -> bool {
    states.wait_for(|current| *current == state).await.is_ok()
}
