//! Bearer-token gate in front of the state API.
//!
//! Tokens are HS256 JWTs signed with the configured secret. The gate only
//! issues and verifies them; credential checks and account storage live with
//! the login routes.
//!
//! ```
//! use climalink_auth::{AuthError, AuthGate, Subject};
//! use chrono::Duration;
//!
//! let gate = AuthGate::new("s3cret", Duration::hours(1));
//! let token = gate.issue(&Subject::new(7, "ana"))?;
//!
//! let subject = gate.verify(Some(format!("Bearer {token}").as_str()))?;
//! assert_eq!(subject.id, 7);
//!
//! assert!(matches!(gate.verify(None), Err(AuthError::Unauthenticated)));
//! # Ok::<(), AuthError>(())
//! ```

mod error;
mod gate;

pub use error::AuthError;
pub use gate::{AuthGate, Claims, Subject, extract_bearer_token};
