//! Core constants for the climalink device bridge.
//!
//! The board speaks newline-delimited JSON over a USB serial port. Every
//! default that touches the wire or the sampling cadence lives here so the
//! configuration layer, the transport and the sync loops agree on them.
//!
//! # Usage
//!
//! ```
//! use climalink_core::constants::*;
//!
//! assert_eq!(DEFAULT_BAUD_RATE, 115_200);
//! assert_eq!(FRAME_DELIMITER, b'\n');
//! ```

// ============================================================================
// Serial Link
// ============================================================================

/// Default serial device path of the board.
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyACM0";

/// Default serial baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Delay after opening the port before the link is used.
///
/// Opening the port resets most USB boards; they drop whatever arrives while
/// the bootloader runs.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1_000;

/// Upper bound for a single line write.
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 3_000;

/// Consecutive failed connection attempts before the link gives up.
///
/// `0` means retry forever.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// First reconnect delay.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;

/// Reconnect delay cap.
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 30;

// ============================================================================
// Framing
// ============================================================================

/// Line terminator of every frame.
pub const FRAME_DELIMITER: u8 = b'\n';

/// Longest accepted line, terminator excluded.
///
/// Real frames are well under 100 bytes.
pub const MAX_LINE_LENGTH: usize = 1_024;

// ============================================================================
// Persistence
// ============================================================================

/// Seconds between two persisted readings.
pub const DEFAULT_DB_STORE_INTERVAL_SECS: u64 = 5;

/// Longest accepted store interval (one week).
pub const MAX_DB_STORE_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Default SQLite database path.
pub const DEFAULT_DATABASE_PATH: &str = "climalink.db";

/// Default connection pool size.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

// ============================================================================
// Authentication
// ============================================================================

/// Secret shipped in the sample configuration. Must be replaced before
/// deployment.
pub const PLACEHOLDER_JWT_SECRET: &str = "ENTER_YOUR_SECRET_HERE";

/// Default token lifetime (24 hours).
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

/// Longest accepted token lifetime (one year).
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

// ============================================================================
// Environment
// ============================================================================

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "CLIMALINK_";
