use thiserror::Error;

/// Why a request was not let through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credential was presented.
    #[error("Authentication required")]
    Unauthenticated,

    /// A credential was presented but failed signature, expiry or claim checks.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// A token could not be produced.
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            AuthError::Unauthenticated.to_string(),
            "Authentication required"
        );
        assert_eq!(
            AuthError::InvalidToken("ExpiredSignature".into()).to_string(),
            "Invalid token: ExpiredSignature"
        );
    }
}
