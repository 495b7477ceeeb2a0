use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration key: {0}")]
    MissingConfig(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new invalid value error.
    pub fn invalid_value(key: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = Error::config("serial.port must not be empty");
        assert_eq!(
            err.to_string(),
            "Configuration error: serial.port must not be empty"
        );
    }

    #[test]
    fn test_invalid_value_display() {
        let err = Error::invalid_value("serial.baud_rate", 0);
        assert_eq!(err.to_string(), "Invalid value for serial.baud_rate: 0");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.toml");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
