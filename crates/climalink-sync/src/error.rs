use climalink_storage::StorageError;
use climalink_transport::TransportError;
use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors surfaced by the bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Serial is disabled in configuration; there is no device to read or
    /// command.
    #[error("Device unavailable: serial link is disabled")]
    DeviceUnavailable,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] climalink_core::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            BridgeError::DeviceUnavailable.to_string(),
            "Device unavailable: serial link is disabled"
        );

        let err: BridgeError = TransportError::NotConnected.into();
        assert!(err.to_string().starts_with("Transport error:"));

        let err: BridgeError = StorageError::Validation("limit must be positive".into()).into();
        assert!(err.to_string().contains("limit must be positive"));
    }
}
