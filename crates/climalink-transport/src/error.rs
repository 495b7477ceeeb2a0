//! Error types for transport operations.
//!
//! Every error is fatal to the transport instance that produced it. Whether a
//! new one is opened is decided by the link supervisor.

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while opening or using a line transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The port could not be opened.
    #[error("Failed to open {port}: {message}")]
    Open { port: String, message: String },

    /// The device went away or the stream reached end of file.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// A line could not be written within the configured bound.
    #[error("Write timeout after {duration_ms}ms")]
    WriteTimeout { duration_ms: u64 },

    /// No transport is currently attached.
    #[error("Not connected")]
    NotConnected,

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Create a new open error.
    pub fn open(port: impl Into<String>, message: impl ToString) -> Self {
        Self::Open {
            port: port.into(),
            message: message.to_string(),
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new write timeout error.
    pub fn write_timeout(duration_ms: u64) -> Self {
        Self::WriteTimeout { duration_ms }
    }
}
