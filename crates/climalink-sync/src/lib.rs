//! Synchronization engine between the board and its clients.
//!
//! ```text
//!              set_desired                      state
//!   client ──────────────┐            ┌─────────────────► client
//!                        ▼            │
//!                  ┌─────────────────────┐
//!                  │     StateStore      │◄──── PersistenceLoop ──► readings
//!                  └─────────────────────┘         (every N s)
//!                    │              ▲
//!        OutboundSync│              │InboundSync
//!     (latest wins)  ▼              │(telemetry)
//!                  ┌─────────────────────┐
//!                  │  Link (supervised)  │
//!                  └─────────────────────┘
//!                            │ serial
//!                          board
//! ```
//!
//! # Components
//!
//! - [`StateStore`]: the device state behind one lock
//! - [`InboundSync`]: applies telemetry lines, drops malformed ones
//! - [`OutboundSync`]: sends the desired state, coalescing bursts
//! - [`LinkSupervisor`]: connects, reconnects with exponential backoff, gives
//!   up after `max_retries`
//! - [`PersistenceLoop`]: samples the store into the readings table
//! - [`Bridge`]: owns all of the above

pub mod bridge;
pub mod error;
pub mod inbound;
pub mod link;
pub mod logging;
pub mod outbound;
pub mod persistence;
pub mod store;

pub use bridge::Bridge;
pub use error::{BridgeError, Result};
pub use inbound::{InboundStats, InboundSync, LineOutcome};
pub use link::{Link, LinkState, LinkSupervisor, ReconnectPolicy, wait_for_state};
pub use logging::init_tracing;
pub use outbound::{OutboundOutcome, OutboundStats, OutboundSync};
pub use persistence::PersistenceLoop;
pub use store::{DesiredUpdate, StateStore};
