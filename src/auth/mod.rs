//! auth - bearer token acquisition
//!
//! A publish run needs exactly one bearer token for the hosting API. It is
//! obtained through the environment's connector service at the start of the
//! run and discarded when the process exits. Nothing is persisted.
//!
//! # Components
//!
//! - [`Token`] - Opaque token with redacted `Debug`/`Display`
//! - [`Authenticator`] - Trait the sync pipeline acquires tokens through
//! - [`ConnectorAuthenticator`] - Connector service implementation
//! - [`StaticAuthenticator`] - Fixed token, for tests and scripted use
//!
//! # Security
//!
//! Tokens and identity values MUST never appear in:
//! - logs (including --debug)
//! - error messages
//! - debug output

mod connector;
mod errors;
mod token;

pub use connector::{
    extract_token, ConnectorAuthenticator, ConnectorIdentity, HOSTNAME_ENV, IDENTITY_ENV,
    RENEWAL_ENV,
};
pub use errors::AuthError;
pub use token::Token;

/// Source of a bearer token for the hosting API.
///
/// # Example
///
/// ```ignore
/// use gitsnap::auth::Authenticator;
///
/// async fn connect(auth: &dyn Authenticator) -> Result<(), AuthError> {
///     let token = auth.acquire_token().await?;
///     // Hand the token to the forge
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    /// Acquire a bearer token.
    ///
    /// # Errors
    ///
    /// Any [`AuthError`]; all are fatal for a publish run.
    async fn acquire_token(&self) -> Result<Token, AuthError>;
}

/// Authenticator that hands out a fixed token.
#[derive(Debug, Clone)]
pub struct StaticAuthenticator {
    token: Token,
}

impl StaticAuthenticator {
    /// Wrap an existing token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Token::new(token),
        }
    }
}

#[async_trait::async_trait]
impl Authenticator for StaticAuthenticator {
    async fn acquire_token(&self) -> Result<Token, AuthError> {
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_authenticator_returns_its_token() {
        let auth = StaticAuthenticator::new("ghs_fixed");
        let token = auth.acquire_token().await.unwrap();
        assert_eq!(token.expose(), "ghs_fixed");
        assert!(!format!("{:?}", auth).contains("ghs_fixed"));
    }
}
