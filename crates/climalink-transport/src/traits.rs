//! Transport trait definitions.
//!
//! Methods are declared as returning `impl Future + Send` so that loops
//! generic over a transport can be handed to `tokio::spawn`. Implementations
//! still write plain `async fn`.

use std::future::Future;

use crate::error::Result;

/// Bidirectional line channel to the board.
///
/// Methods take `&self`: a single reader and a single writer may use the same
/// transport concurrently, and concurrent writers are serialized.
pub trait LineTransport: Send + Sync {
    /// Wait for the next complete line, terminator stripped.
    ///
    /// # Errors
    ///
    /// Any error means the transport is unusable.
    fn read_line(&self) -> impl Future<Output = Result<String>> + Send;

    /// Write one line; the terminator is appended.
    fn write_line(&self, line: &str) -> impl Future<Output = Result<()>> + Send;

    /// Human-readable name for logs.
    fn describe(&self) -> String;
}

/// Opens transports.
pub trait Connector: Send + Sync {
    type Transport: LineTransport + 'static;

    /// Open a new transport. The caller decides about retries.
    fn connect(&self) -> impl Future<Output = Result<Self::Transport>> + Send;

    /// Human-readable target for logs.
    fn describe(&self) -> String;
}
