//! Host to device direction.
//!
//! Every desired-state write triggers one short-lived task. Tasks take turns
//! on the outbound mutex and each one sends whatever is desired *now*, not
//! what was desired when it was spawned. A task that finds its generation
//! already sent by an earlier task does nothing, so a burst of writes
//! collapses into few commands and the last command sent always matches the
//! last desired state.
//!
//! Delivery is fire-and-forget: the device does not acknowledge commands and
//! a failed write is neither retried nor rolled back in the store.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use climalink_core::DesiredState;
use climalink_protocol::Frame;
use climalink_transport::LineTransport;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::link::Link;
use crate::store::StateStore;

/// How one outbound attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundOutcome {
    /// The command was written to the device.
    Written {
        desired: DesiredState,
        generation: u64,
    },
    /// A previous attempt already covered the current generation.
    Superseded,
    /// No device is connected; nothing was written.
    NotConnected,
    /// The command could not be encoded or written.
    Failed,
}

/// Outbound counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutboundStats {
    pub commands_written: u64,
    pub superseded: u64,
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    commands_written: AtomicU64,
    superseded: AtomicU64,
    failures: AtomicU64,
}

/// Sends desired state to the device.
pub struct OutboundSync<T> {
    store: Arc<StateStore>,
    link: Arc<Link<T>>,
    /// Highest generation any attempt has taken responsibility for.
    last_attempted: Arc<Mutex<u64>>,
    counters: Arc<Counters>,
}

impl<T> Clone for OutboundSync<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            link: self.link.clone(),
            last_attempted: self.last_attempted.clone(),
            counters: self.counters.clone(),
        }
    }
}

impl<T> std::fmt::Debug for OutboundSync<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundSync")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<T> OutboundSync<T> {
    pub fn stats(&self) -> OutboundStats {
        OutboundStats {
            commands_written: self.counters.commands_written.load(Ordering::Relaxed),
            superseded: self.counters.superseded.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }
}

impl<T: LineTransport + 'static> OutboundSync<T> {
    pub fn new(store: Arc<StateStore>, link: Arc<Link<T>>) -> Self {
        Self {
            store,
            link,
            last_attempted: Arc::new(Mutex::new(0)),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Spawn one attempt and return without waiting for it.
    pub fn trigger(&self) -> JoinHandle<OutboundOutcome> {
        let this = self.clone();
        tokio::spawn(async move { this.sync_once().await })
    }

    /// Send the current desired state unless it was already attempted.
    pub async fn sync_once(&self) -> OutboundOutcome {
        let mut last_attempted = self.last_attempted.lock().await;

        let (state, generation) = self.store.desired_snapshot();
        if generation <= *last_attempted {
            self.counters.superseded.fetch_add(1, Ordering::Relaxed);
            debug!(generation, last_attempted = *last_attempted, "Outbound sync superseded");
            return OutboundOutcome::Superseded;
        }
        *last_attempted = generation;

        let desired = state.desired();

        let Some(transport) = self.link.current() else {
            self.counters.failures.fetch_add(1, Ordering::Relaxed);
            warn!(generation, ?desired, "No device connected, command dropped");
            return OutboundOutcome::NotConnected;
        };

        let line = match Frame::command(desired).encode() {
            Ok(line) => line,
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                error!(error = %e, "Failed to encode command");
                return OutboundOutcome::Failed;
            }
        };

        match transport.write_line(&line).await {
            Ok(()) => {
                self.counters.commands_written.fetch_add(1, Ordering::Relaxed);
                info!(generation, led = desired.led, fan = desired.fan, "Command sent to device");
                OutboundOutcome::Written {
                    desired,
                    generation,
                }
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    device = %transport.describe(),
                    generation,
                    error = %e,
                    "Failed to send command"
                );
                OutboundOutcome::Failed
            }
        }
    }
}
