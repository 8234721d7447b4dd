//! auth::errors
//!
//! Authentication error types.
//!
//! # Design
//!
//! Error messages MUST NOT contain tokens or identity values. All variants
//! carry enough context to act on without exposing secrets.
//!
//! # Example
//!
//! ```
//! use gitsnap::auth::AuthError;
//!
//! let err = AuthError::NotLinked;
//! assert!(err.to_string().contains("GitHub"));
//! ```

use thiserror::Error;

/// Errors from credential acquisition.
///
/// Every variant is fatal for a publish run; none is retried.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Neither `REPL_IDENTITY` nor `WEB_REPL_RENEWAL` is set.
    #[error("no identity available: set REPL_IDENTITY or WEB_REPL_RENEWAL")]
    MissingIdentity,

    /// Identity value cannot be sent as an HTTP header.
    #[error("identity value contains characters not allowed in an HTTP header")]
    InvalidIdentity,

    /// No connector hostname configured.
    #[error("no connector hostname: set REPLIT_CONNECTORS_HOSTNAME or [auth] connectors_hostname")]
    MissingHostname,

    /// The connector service has no GitHub connection for this identity.
    #[error("GitHub not connected for this identity")]
    NotLinked,

    /// A connection exists but its settings match no known token shape.
    #[error("GitHub connection settings carry no access token in a recognized shape")]
    UnrecognizedSettings,

    /// Connector service answered with a non-success status.
    #[error("connector API error: {status} - {message}")]
    ConnectorApi {
        /// HTTP status code
        status: u16,
        /// Error message (never contains secrets)
        message: String,
    },

    /// Connector response body could not be decoded.
    #[error("invalid connector response: {0}")]
    InvalidResponse(String),

    /// Network error while talking to the connector service.
    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.without_url().to_string())
    }
}
