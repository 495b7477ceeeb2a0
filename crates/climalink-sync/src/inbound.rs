//! Device to host direction.
//!
//! Reads lines from the transport and folds every telemetry frame into the
//! [`StateStore`]. Lines that do not decode, and frames the device should not
//! send, are dropped and the loop moves on to the next line.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use climalink_protocol::Frame;
use climalink_transport::{LineTransport, TransportError};
use tracing::{debug, warn};

use crate::store::StateStore;

/// What happened to one received line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineOutcome {
    /// Telemetry was applied to the store.
    Applied,
    /// The line was not a decodable frame.
    Malformed,
    /// A valid frame of a kind the host does not accept.
    Unexpected,
}

/// Inbound counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InboundStats {
    pub lines_received: u64,
    pub frames_applied: u64,
    pub frames_discarded: u64,
}

#[derive(Debug, Default)]
struct Counters {
    lines_received: AtomicU64,
    frames_applied: AtomicU64,
    frames_discarded: AtomicU64,
}

/// Runs the read side of a link.
#[derive(Debug, Clone)]
pub struct InboundSync {
    store: Arc<StateStore>,
    counters: Arc<Counters>,
}

impl InboundSync {
    pub fn new(store: Arc<StateStore>) -> Self {
        Self {
            store,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Read and apply lines until the transport fails.
    ///
    /// Only a transport error ends the loop, and it is returned so the caller
    /// can decide whether to reconnect.
    pub async fn run<T: LineTransport>(&self, transport: &T) -> TransportError {
        debug!(device = %transport.describe(), "Inbound sync started");

        loop {
            match transport.read_line().await {
                Ok(line) => {
                    self.handle_line(&line);
                }
                Err(e) => {
                    warn!(device = %transport.describe(), error = %e, "Inbound sync stopped");
                    return e;
                }
            }
        }
    }

    /// Decode one line and apply it if it is telemetry.
    pub fn handle_line(&self, line: &str) -> LineOutcome {
        self.counters.lines_received.fetch_add(1, Ordering::Relaxed);

        match Frame::decode(line) {
            Ok(Frame::Telemetry(telemetry)) => {
                let state = self.store.apply_telemetry(telemetry);
                self.counters.frames_applied.fetch_add(1, Ordering::Relaxed);
                debug!(?state, "Telemetry received");
                LineOutcome::Applied
            }
            Ok(frame) => {
                self.counters.frames_discarded.fetch_add(1, Ordering::Relaxed);
                debug!(msg_type = %frame.message_type(), "Ignoring frame from device");
                LineOutcome::Unexpected
            }
            Err(e) => {
                self.counters.frames_discarded.fetch_add(1, Ordering::Relaxed);
                debug!(error = %e, line = %line, "Discarding malformed line");
                LineOutcome::Malformed
            }
        }
    }

    pub fn stats(&self) -> InboundStats {
        InboundStats {
            lines_received: self.counters.lines_received.load(Ordering::Relaxed),
            frames_applied: self.counters.frames_applied.load(Ordering::Relaxed),
            frames_discarded: self.counters.frames_discarded.load(Ordering::Relaxed),
        }
    }
}
