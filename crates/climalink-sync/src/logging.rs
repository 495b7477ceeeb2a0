//! Process-wide tracing setup.

use tracing_subscriber::EnvFilter;

use crate::error::{BridgeError, Result};

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` (for example
/// `"info,climalink_transport=debug"`) is used. Fails if the filter does not
/// parse or a global subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| BridgeError::Logging(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| BridgeError::Logging(e.to_string()))
}
