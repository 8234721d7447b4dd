//! auth::connector
//!
//! Bearer token acquisition through the hosting environment's connector
//! service.
//!
//! # Flow
//!
//! 1. Build the identity header from `REPL_IDENTITY` (`repl <value>`) or,
//!    failing that, `WEB_REPL_RENEWAL` (`depl <value>`)
//! 2. `GET https://<host>/api/v2/connection?include_secrets=true&connector_names=github`
//!    with `Accept: application/json` and `X_REPLIT_TOKEN: <identity>`
//! 3. Decode the first connection item's settings into one of the two
//!    known token shapes
//!
//! # Token Shapes
//!
//! A connection's `settings` object carries the access token either
//! directly (`settings.access_token`) or nested under OAuth credentials
//! (`settings.oauth.credentials.access_token`). The direct shape wins when
//! both are present and non-empty. Anything else is
//! [`AuthError::UnrecognizedSettings`].
//!
//! # Example
//!
//! ```ignore
//! use gitsnap::auth::{Authenticator, ConnectorAuthenticator};
//!
//! let auth = ConnectorAuthenticator::from_env(None)?;
//! let token = auth.acquire_token().await?;
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;

use super::errors::AuthError;
use super::token::Token;
use super::Authenticator;

/// Environment variable naming the connector service host.
pub const HOSTNAME_ENV: &str = "REPLIT_CONNECTORS_HOSTNAME";

/// Environment variable carrying the workspace identity.
pub const IDENTITY_ENV: &str = "REPL_IDENTITY";

/// Environment variable carrying the deployment renewal credential.
pub const RENEWAL_ENV: &str = "WEB_REPL_RENEWAL";

/// Header the connector service reads the identity from.
const IDENTITY_HEADER: &str = "x_replit_token";

/// User-Agent header value for connector requests.
const USER_AGENT_VALUE: &str = "gitsnap";

/// Which local credential identifies this process to the connector service.
#[derive(Clone, PartialEq, Eq)]
pub enum ConnectorIdentity {
    /// Interactive workspace identity.
    Workspace(String),
    /// Deployment renewal credential.
    Deployment(String),
}

impl ConnectorIdentity {
    /// Read the identity from the process environment.
    ///
    /// # Errors
    ///
    /// [`AuthError::MissingIdentity`] if neither variable is set.
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_values(
            std::env::var(IDENTITY_ENV).ok(),
            std::env::var(RENEWAL_ENV).ok(),
        )
    }

    /// Pick an identity from the two candidate values.
    ///
    /// Empty values count as unset. The workspace identity takes precedence.
    pub fn from_values(
        identity: Option<String>,
        renewal: Option<String>,
    ) -> Result<Self, AuthError> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

        if let Some(value) = non_empty(identity) {
            Ok(ConnectorIdentity::Workspace(value))
        } else if let Some(value) = non_empty(renewal) {
            Ok(ConnectorIdentity::Deployment(value))
        } else {
            Err(AuthError::MissingIdentity)
        }
    }

    /// The identity header value (`repl <v>` or `depl <v>`).
    pub fn header_value(&self) -> String {
        match self {
            ConnectorIdentity::Workspace(v) => format!("repl {}", v),
            ConnectorIdentity::Deployment(v) => format!("depl {}", v),
        }
    }
}

impl std::fmt::Debug for ConnectorIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectorIdentity::Workspace(_) => f.write_str("Workspace([REDACTED])"),
            ConnectorIdentity::Deployment(_) => f.write_str("Deployment([REDACTED])"),
        }
    }
}

/// Authenticator backed by the connector service.
#[derive(Clone)]
pub struct ConnectorAuthenticator {
    client: Client,
    /// Scheme and host, e.g. `https://connectors.example.net`
    base_url: String,
    identity: ConnectorIdentity,
}

// Custom Debug to avoid exposing the identity
impl std::fmt::Debug for ConnectorAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorAuthenticator")
            .field("base_url", &self.base_url)
            .field("identity", &self.identity)
            .finish()
    }
}

impl ConnectorAuthenticator {
    /// Create an authenticator for `hostname` over HTTPS.
    pub fn new(hostname: &str, identity: ConnectorIdentity) -> Self {
        Self::with_base_url(format!("https://{}", hostname), identity)
    }

    /// Create an authenticator against an explicit base URL.
    ///
    /// Used by tests to point at a local mock server.
    pub fn with_base_url(base_url: impl Into<String>, identity: ConnectorIdentity) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            identity,
        }
    }

    /// Build an authenticator from the environment.
    ///
    /// `hostname_override` (from configuration) takes precedence over
    /// `REPLIT_CONNECTORS_HOSTNAME`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingHostname`] if no hostname is available
    /// - [`AuthError::MissingIdentity`] if no identity is available
    pub fn from_env(hostname_override: Option<&str>) -> Result<Self, AuthError> {
        let hostname = hostname_override
            .map(str::to_string)
            .or_else(|| std::env::var(HOSTNAME_ENV).ok())
            .filter(|h| !h.is_empty())
            .ok_or(AuthError::MissingHostname)?;
        let identity = ConnectorIdentity::from_env()?;
        Ok(Self::new(&hostname, identity))
    }

    /// Connection lookup URL.
    fn connection_url(&self) -> String {
        format!(
            "{}/api/v2/connection?include_secrets=true&connector_names=github",
            self.base_url
        )
    }

    fn headers(&self) -> Result<HeaderMap, AuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let mut identity = HeaderValue::from_str(&self.identity.header_value())
            .map_err(|_| AuthError::InvalidIdentity)?;
        identity.set_sensitive(true);
        headers.insert(HeaderName::from_static(IDENTITY_HEADER), identity);

        Ok(headers)
    }
}

#[async_trait]
impl Authenticator for ConnectorAuthenticator {
    async fn acquire_token(&self) -> Result<Token, AuthError> {
        let response = self
            .client
            .get(self.connection_url())
            .headers(self.headers()?)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AuthError::ConnectorApi {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        extract_token(&body)
    }
}

/// Pull a short, secret-free message out of an error body.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        message: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => err.message,
        Err(_) => "Unknown error".to_string(),
    }
}

// --------------------------------------------------------------------------
// Response decoding
// --------------------------------------------------------------------------

#[derive(Deserialize)]
struct ConnectionList {
    #[serde(default)]
    items: Vec<Connection>,
}

#[derive(Deserialize)]
struct Connection {
    #[serde(default)]
    settings: Option<serde_json::Value>,
}

/// The token shapes a GitHub connection's settings can take.
#[derive(Deserialize)]
#[serde(untagged)]
enum ConnectionSettings {
    Direct { access_token: NonEmpty },
    OAuth { oauth: OAuthSettings },
}

#[derive(Deserialize)]
struct OAuthSettings {
    credentials: OAuthCredentials,
}

#[derive(Deserialize)]
struct OAuthCredentials {
    access_token: NonEmpty,
}

/// A string that fails to deserialize when empty, so an empty direct token
/// falls through to the OAuth shape.
#[derive(Deserialize)]
#[serde(try_from = "String")]
struct NonEmpty(String);

impl TryFrom<String> for NonEmpty {
    type Error = &'static str;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.is_empty() {
            Err("empty string")
        } else {
            Ok(NonEmpty(s))
        }
    }
}

impl ConnectionSettings {
    fn into_token(self) -> Token {
        match self {
            ConnectionSettings::Direct { access_token } => Token::new(access_token.0),
            ConnectionSettings::OAuth { oauth } => Token::new(oauth.credentials.access_token.0),
        }
    }
}

/// Decode a connection lookup body into a token.
///
/// # Errors
///
/// - [`AuthError::InvalidResponse`] if the body is not a connection list
/// - [`AuthError::NotLinked`] if the list is empty
/// - [`AuthError::UnrecognizedSettings`] if the first item matches no shape
pub fn extract_token(body: &str) -> Result<Token, AuthError> {
    // Position only: serde messages can echo field values.
    let list: ConnectionList = serde_json::from_str(body).map_err(|e| {
        AuthError::InvalidResponse(format!("line {} column {}", e.line(), e.column()))
    })?;

    let connection = list.items.into_iter().next().ok_or(AuthError::NotLinked)?;
    let settings = connection
        .settings
        .ok_or(AuthError::UnrecognizedSettings)?;

    serde_json::from_value::<ConnectionSettings>(settings)
        .map(ConnectionSettings::into_token)
        .map_err(|_| AuthError::UnrecognizedSettings)
}
