//! Bridge configuration.
//!
//! Configuration is static for the lifetime of the process. Sources are
//! layered, later ones winning:
//!
//! 1. Default values
//! 2. TOML file
//! 3. `CLIMALINK_*` environment variables
//!
//! The result is validated before it is returned.
//!
//! ```toml
//! [serial]
//! enabled = true
//! port = "/dev/ttyACM0"
//! baud_rate = 115200
//!
//! [app]
//! db_store_interval_secs = 5
//! signup_enabled = true
//!
//! [jwt]
//! secret = "change-me"
//! token_lifetime_secs = 86400
//!
//! [database]
//! path = "climalink.db"
//! max_connections = 5
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::*;
use crate::error::{Error, Result};

// =============================================================================
// Serial Settings
// =============================================================================

/// Serial link to the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    /// When false the device is treated as absent: no link is opened and
    /// state reads and writes are refused.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Wait after opening the port before it is used.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_write_timeout")]
    pub write_timeout_ms: u64,

    /// Consecutive failed connection attempts before giving up (0 = never).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_port() -> String {
    DEFAULT_SERIAL_PORT.to_string()
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_settle_delay() -> u64 {
    DEFAULT_SETTLE_DELAY_MS
}

fn default_write_timeout() -> u64 {
    DEFAULT_WRITE_TIMEOUT_MS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_initial_backoff() -> u64 {
    DEFAULT_INITIAL_BACKOFF_MS
}

fn default_max_backoff() -> u64 {
    DEFAULT_MAX_BACKOFF_SECS
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_port(),
            baud_rate: default_baud_rate(),
            settle_delay_ms: default_settle_delay(),
            write_timeout_ms: default_write_timeout(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
        }
    }
}

impl SerialSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

// =============================================================================
// Application Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Seconds between two persisted readings.
    #[serde(default = "default_store_interval")]
    pub db_store_interval_secs: u64,

    /// Read by the account routes; the bridge itself does not use it.
    #[serde(default = "default_true")]
    pub signup_enabled: bool,
}

fn default_store_interval() -> u64 {
    DEFAULT_DB_STORE_INTERVAL_SECS
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            db_store_interval_secs: default_store_interval(),
            signup_enabled: true,
        }
    }
}

impl AppSettings {
    pub fn db_store_interval(&self) -> Duration {
        Duration::from_secs(self.db_store_interval_secs)
    }
}

// =============================================================================
// Token Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtSettings {
    #[serde(default = "default_secret")]
    pub secret: String,

    #[serde(default = "default_token_lifetime")]
    pub token_lifetime_secs: i64,
}

fn default_secret() -> String {
    PLACEHOLDER_JWT_SECRET.to_string()
}

fn default_token_lifetime() -> i64 {
    DEFAULT_TOKEN_LIFETIME_SECS
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            token_lifetime_secs: default_token_lifetime(),
        }
    }
}

impl JwtSettings {
    /// True while the shipped sample secret is still in use.
    pub fn uses_placeholder_secret(&self) -> bool {
        self.secret == PLACEHOLDER_JWT_SECRET
    }
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_path")]
    pub path: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    DEFAULT_DATABASE_PATH.to_string()
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Bridge Configuration
// =============================================================================

/// Complete bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub serial: SerialSettings,

    #[serde(default)]
    pub app: AppSettings,

    #[serde(default)]
    pub jwt: JwtSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl BridgeConfig {
    /// Load configuration from an optional file, then the process
    /// environment, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                info!(?path, "Loading configuration from file");
                Self::from_toml_str(&std::fs::read_to_string(path)?)?
            }
            Some(path) => {
                debug!(?path, "Configuration file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document. Missing sections and keys take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply `CLIMALINK_*` overrides read through `lookup`.
    ///
    /// Values that fail to parse are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(value) = var("SERIAL_ENABLED") {
            override_parsed("SERIAL_ENABLED", &value, &mut self.serial.enabled);
        }

        if let Some(port) = var("SERIAL_PORT") {
            debug!(port = %port, "Overriding serial port from environment");
            self.serial.port = port;
        }

        if let Some(value) = var("BAUD_RATE") {
            override_parsed("BAUD_RATE", &value, &mut self.serial.baud_rate);
        }

        if let Some(value) = var("DB_STORE_INTERVAL") {
            override_parsed(
                "DB_STORE_INTERVAL",
                &value,
                &mut self.app.db_store_interval_secs,
            );
        }

        if let Some(value) = var("SIGNUP_ENABLED") {
            override_parsed("SIGNUP_ENABLED", &value, &mut self.app.signup_enabled);
        }

        if let Some(secret) = var("JWT_SECRET") {
            debug!("Overriding token secret from environment");
            self.jwt.secret = secret;
        }

        if let Some(path) = var("DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = path;
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.serial.enabled {
            if self.serial.port.trim().is_empty() {
                return Err(Error::config("serial.port must not be empty"));
            }
            if self.serial.baud_rate == 0 {
                return Err(Error::invalid_value(
                    "serial.baud_rate",
                    self.serial.baud_rate,
                ));
            }
        }

        if self.app.db_store_interval_secs == 0
            || self.app.db_store_interval_secs > MAX_DB_STORE_INTERVAL_SECS
        {
            return Err(Error::invalid_value(
                "app.db_store_interval_secs",
                self.app.db_store_interval_secs,
            ));
        }

        if self.jwt.secret.is_empty() {
            return Err(Error::MissingConfig("jwt.secret".to_string()));
        }

        if self.jwt.token_lifetime_secs <= 0
            || self.jwt.token_lifetime_secs > MAX_TOKEN_LIFETIME_SECS
        {
            return Err(Error::invalid_value(
                "jwt.token_lifetime_secs",
                self.jwt.token_lifetime_secs,
            ));
        }

        if self.database.max_connections == 0 {
            return Err(Error::invalid_value(
                "database.max_connections",
                self.database.max_connections,
            ));
        }

        if self.jwt.uses_placeholder_secret() {
            warn!("jwt.secret still holds the sample value; tokens are forgeable");
        }

        Ok(())
    }
}

fn override_parsed<T: FromStr>(name: &str, raw: &str, target: &mut T) {
    match raw.trim().parse::<T>() {
        Ok(value) => {
            debug!(key = %name, value = %raw, "Overriding setting from environment");
            *target = value;
        }
        Err(_) => warn!(key = %name, value = %raw, "Ignoring unparseable environment override"),
    }
}
