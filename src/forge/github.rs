//! forge::github
//!
//! GitHub object store over the REST git data API.
//!
//! # Design
//!
//! This module implements the `ObjectStore` trait for GitHub. Every trait
//! method is a single REST call:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | `authenticated_user` | `GET /user` |
//! | `create_blob` | `POST /repos/{o}/{r}/git/blobs` |
//! | `create_tree` | `POST /repos/{o}/{r}/git/trees` |
//! | `create_commit` | `POST /repos/{o}/{r}/git/commits` |
//! | `get_ref` | `GET /repos/{o}/{r}/git/ref/heads/{b}` |
//! | `update_ref` | `PATCH /repos/{o}/{r}/git/refs/heads/{b}` |
//! | `create_ref` | `POST /repos/{o}/{r}/git/refs` |
//!
//! Trees are always created without a `base_tree`, so each one is a full
//! snapshot of the published files.
//!
//! # Rate Limiting
//!
//! GitHub has rate limits. This implementation:
//! - Returns `ForgeError::RateLimited` when limits are hit
//! - Does not implement automatic retry (the run fails)
//!
//! # Example
//!
//! ```ignore
//! use gitsnap::forge::github::GitHubObjectStore;
//! use gitsnap::forge::ObjectStore;
//!
//! let store = GitHubObjectStore::new(token, "octocat", "hello-world");
//! let sha = store.create_blob(b"hello\n").await?;
//! ```

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::traits::{CreateCommitRequest, ForgeError, ObjectStore};
use crate::auth::Token;
use crate::core::config::{DEFAULT_API_BASE, DEFAULT_WEB_BASE};
use crate::core::types::{BlobRef, BranchName, CommitRef, Oid, TreeRef};

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "gitsnap";

/// REST API version pinned in every request.
const API_VERSION: &str = "2022-11-28";

/// Characters escaped inside one segment of a ref path.
const REF_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// `heads/<branch>` with each `/`-separated segment percent-encoded, so a
/// branch containing `#`, `%` or non-ASCII text addresses the right ref.
fn encoded_ref_path(branch: &BranchName) -> String {
    branch
        .ref_path()
        .split('/')
        .map(|segment| utf8_percent_encode(segment, REF_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// GitHub object store.
///
/// Holds the single bearer token acquired for this run.
pub struct GitHubObjectStore {
    /// HTTP client for making requests
    client: Client,
    token: Token,
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
    /// Web base URL used for the browsable repository link
    web_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubObjectStore")
            .field("token", &self.token)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .field("web_base", &self.web_base)
            .finish()
    }
}

impl GitHubObjectStore {
    /// Create a store for `owner/repo` on github.com.
    pub fn new(token: Token, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self::with_api_base(token, owner, repo, DEFAULT_API_BASE)
    }

    /// Create a store with a custom API base URL.
    ///
    /// Use this for GitHub Enterprise installations, or to point at a mock
    /// server in tests.
    pub fn with_api_base(
        token: Token,
        owner: impl Into<String>,
        repo: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            token,
            owner: owner.into(),
            repo: repo.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            web_base: DEFAULT_WEB_BASE.to_string(),
        }
    }

    /// Override the web base used by [`ObjectStore::web_url`].
    pub fn with_web_base(mut self, web_base: impl Into<String>) -> Self {
        self.web_base = web_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.token.expose()))
            .map_err(|_| ForgeError::AuthFailed("token is not a valid header value".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        Ok(headers)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    /// Attach headers, send, and decode the response.
    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ForgeError> {
        let response = request
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.without_url().to_string()))?;
        self.handle_response(response).await
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e.without_url()),
            })
        } else {
            self.handle_error_response(response, status).await
        }
    }

    /// Handle an error response from the API.
    async fn handle_error_response<T>(
        &self,
        response: Response,
        status: StatusCode,
    ) -> Result<T, ForgeError> {
        // Fine-grained permissions a GitHub App token would need
        let required_permissions = response
            .headers()
            .get("X-Accepted-GitHub-Permissions")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        // Try to get error message from body
        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        Err(match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN => {
                let mut err_msg = format!("Permission denied: {}", message);
                if let Some(perms) = required_permissions.filter(|p| !p.is_empty()) {
                    err_msg.push_str(&format!(" [required: {}]", perms));
                }
                ForgeError::AuthFailed(err_msg)
            }
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }
}

/// Reinterpret a 422 on a ref write as a conflict when GitHub says the ref
/// is in the wrong state.
fn ref_conflict(err: ForgeError) -> ForgeError {
    match err {
        ForgeError::ApiError { status: 422, message }
            if message.contains("already exists") || message.contains("does not exist") =>
        {
            ForgeError::RefConflict(message)
        }
        other => other,
    }
}

#[async_trait]
impl ObjectStore for GitHubObjectStore {
    fn name(&self) -> &'static str {
        "github"
    }

    fn web_url(&self) -> String {
        format!("{}/{}/{}", self.web_base, self.owner, self.repo)
    }

    async fn authenticated_user(&self) -> Result<String, ForgeError> {
        let url = format!("{}/user", self.api_base);
        let user: GitHubUser = self.send(self.client.get(&url)).await?;
        Ok(user.login)
    }

    async fn create_blob(&self, content: &[u8]) -> Result<Oid, ForgeError> {
        let body = CreateBlobBody {
            content: BASE64.encode(content),
            encoding: "base64",
        };
        let created: GitHubSha = self
            .send(self.client.post(self.repo_url("git/blobs")).json(&body))
            .await?;
        created.into_oid()
    }

    async fn create_tree(&self, entries: &[BlobRef]) -> Result<TreeRef, ForgeError> {
        let body = CreateTreeBody {
            tree: entries
                .iter()
                .map(|blob| TreeEntryBody {
                    path: &blob.path,
                    mode: blob.mode.as_str(),
                    kind: blob.kind.as_str(),
                    sha: blob.content_hash.as_str(),
                })
                .collect(),
        };
        let created: GitHubSha = self
            .send(self.client.post(self.repo_url("git/trees")).json(&body))
            .await?;
        Ok(TreeRef {
            tree_hash: created.into_oid()?,
        })
    }

    async fn create_commit(&self, request: CreateCommitRequest) -> Result<CommitRef, ForgeError> {
        let parents = request.parents();
        let body = CreateCommitBody {
            message: &request.message,
            tree: request.tree.as_str(),
            parents: parents.iter().map(Oid::as_str).collect(),
        };
        let created: GitHubSha = self
            .send(self.client.post(self.repo_url("git/commits")).json(&body))
            .await?;
        Ok(CommitRef {
            commit_hash: created.into_oid()?,
            tree_hash: request.tree,
            parent_hash: request.parent,
            message: request.message,
        })
    }

    async fn get_ref(&self, branch: &BranchName) -> Result<Option<Oid>, ForgeError> {
        let url = self.repo_url(&format!("git/ref/{}", encoded_ref_path(branch)));
        match self.send::<GitHubRef>(self.client.get(&url)).await {
            Ok(found) => found.object.into_oid().map(Some),
            Err(ForgeError::NotFound(_)) => Ok(None),
            // An empty repository answers 409 for every ref read
            Err(ForgeError::ApiError { status: 409, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn update_ref(
        &self,
        branch: &BranchName,
        sha: &Oid,
        force: bool,
    ) -> Result<(), ForgeError> {
        let url = self.repo_url(&format!("git/refs/{}", encoded_ref_path(branch)));
        let body = UpdateRefBody {
            sha: sha.as_str(),
            force,
        };
        self.send::<GitHubRef>(self.client.patch(&url).json(&body))
            .await
            .map(|_| ())
            .map_err(ref_conflict)
    }

    async fn create_ref(&self, branch: &BranchName, sha: &Oid) -> Result<(), ForgeError> {
        let full_ref = branch.full_ref();
        let body = CreateRefBody {
            ref_name: &full_ref,
            sha: sha.as_str(),
        };
        self.send::<GitHubRef>(self.client.post(self.repo_url("git/refs")).json(&body))
            .await
            .map(|_| ())
            .map_err(ref_conflict)
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

/// Request body for creating a blob.
#[derive(Serialize)]
struct CreateBlobBody {
    content: String,
    encoding: &'static str,
}

/// Request body for creating a tree.
#[derive(Serialize)]
struct CreateTreeBody<'a> {
    tree: Vec<TreeEntryBody<'a>>,
}

/// One tree entry.
#[derive(Serialize)]
struct TreeEntryBody<'a> {
    path: &'a str,
    mode: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    sha: &'a str,
}

/// Request body for creating a commit.
#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
}

/// Request body for moving a ref.
#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
    force: bool,
}

/// Request body for creating a ref.
#[derive(Serialize)]
struct CreateRefBody<'a> {
    #[serde(rename = "ref")]
    ref_name: &'a str,
    sha: &'a str,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// Any response carrying a `sha` (blobs, trees, commits, ref targets).
#[derive(Deserialize)]
struct GitHubSha {
    sha: String,
}

impl GitHubSha {
    fn into_oid(self) -> Result<Oid, ForgeError> {
        Oid::new(self.sha).map_err(|e| ForgeError::ApiError {
            status: 200,
            message: format!("GitHub returned a malformed sha: {}", e),
        })
    }
}

/// GitHub ref response format.
#[derive(Deserialize)]
struct GitHubRef {
    object: GitHubSha,
}

/// GitHub user response format.
#[derive(Deserialize)]
struct GitHubUser {
    login: String,
}

/// Parse a GitHub remote URL into (owner, repo).
///
/// Supports SSH (`git@github.com:owner/repo.git`) and HTTPS
/// (`https://github.com/owner/repo`) forms, with or without `.git`.
///
/// # Example
///
/// ```
/// use gitsnap::forge::github::parse_github_url;
///
/// assert_eq!(
///     parse_github_url("git@github.com:octocat/hello-world.git"),
///     Some(("octocat".to_string(), "hello-world".to_string()))
/// );
/// assert_eq!(parse_github_url("https://gitlab.com/owner/repo"), None);
/// ```
pub fn parse_github_url(url: &str) -> Option<(String, String)> {
    let rest = url
        .strip_prefix("git@github.com:")
        .or_else(|| url.strip_prefix("ssh://git@github.com/"))
        .or_else(|| url.strip_prefix("https://github.com/"))
        .or_else(|| url.strip_prefix("http://github.com/"))?;

    let rest = rest.trim_end_matches('/');
    let rest = rest.strip_suffix(".git").unwrap_or(rest);
    let (owner, repo) = rest.split_once('/')?;

    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}
