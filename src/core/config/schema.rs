//! core::config::schema
//!
//! Configuration schema types.
//!
//! The same schema is used for the global file and the repo file; every
//! field is optional so a repo file only needs to name what it overrides.
//!
//! # Example
//!
//! ```toml
//! [target]
//! owner = "octocat"
//! repo = "hello-world"
//! branch = "main"
//!
//! [publish]
//! message = "Publish landing page"
//! concurrency = 8
//! best_effort = false
//!
//! [auth]
//! connectors_hostname = "connectors.example.net"
//!
//! [site]
//! base_url = "https://www.example.com"
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing (branch names, concurrency bounds,
//! URL shapes) so that a bad file fails at load time, not mid-run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// One configuration file (global or repo scope).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Where to publish
    pub target: Option<TargetSection>,

    /// How to publish
    pub publish: Option<PublishSection>,

    /// Credential acquisition
    pub auth: Option<AuthSection>,

    /// Site endpoints (robots.txt / sitemap.xml)
    pub site: Option<SiteSection>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(target) = &self.target {
            if let Some(branch) = &target.branch {
                BranchName::new(branch.as_str())
                    .map_err(|e| ConfigError::InvalidValue(format!("target.branch: {}", e)))?;
            }
            for (key, value) in [
                ("target.owner", &target.owner),
                ("target.repo", &target.repo),
            ] {
                if let Some(v) = value {
                    if v.is_empty() || v.contains('/') || v.contains(char::is_whitespace) {
                        return Err(ConfigError::InvalidValue(format!(
                            "{} must be a single path segment, got '{}'",
                            key, v
                        )));
                    }
                }
            }
            for (key, value) in [
                ("target.api_base", &target.api_base),
                ("target.web_base", &target.web_base),
            ] {
                if let Some(v) = value {
                    validate_http_url(key, v)?;
                }
            }
        }

        if let Some(publish) = &self.publish {
            if publish.concurrency == Some(0) {
                return Err(ConfigError::InvalidValue(
                    "publish.concurrency must be at least 1".into(),
                ));
            }
            if let Some(message) = &publish.message {
                if message.trim().is_empty() {
                    return Err(ConfigError::InvalidValue(
                        "publish.message cannot be empty".into(),
                    ));
                }
            }
        }

        if let Some(site) = &self.site {
            if let Some(base) = &site.base_url {
                validate_http_url("site.base_url", base)?;
            }
            for path in site.disallow.iter().flatten() {
                if !path.starts_with('/') {
                    return Err(ConfigError::InvalidValue(format!(
                        "site.disallow entries must start with '/', got '{}'",
                        path
                    )));
                }
            }
        }

        Ok(())
    }
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("https://") || value.starts_with("http://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue(format!(
            "{} must be an http(s) URL, got '{}'",
            key, value
        )))
    }
}

/// `[target]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TargetSection {
    /// Repository owner (user or organization)
    pub owner: Option<String>,
    /// Repository name
    pub repo: Option<String>,
    /// Branch to publish to
    pub branch: Option<String>,
    /// REST API base URL (GitHub Enterprise)
    pub api_base: Option<String>,
    /// Web base URL used for the browsable link
    pub web_base: Option<String>,
}

/// `[publish]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PublishSection {
    /// Working tree to publish (defaults to the discovered repository)
    pub workdir: Option<PathBuf>,
    /// Commit message
    pub message: Option<String>,
    /// Maximum number of blob uploads in flight
    pub concurrency: Option<usize>,
    /// Publish the successfully uploaded subset when some uploads fail
    pub best_effort: Option<bool>,
}

/// `[auth]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuthSection {
    /// Connector service hostname (overrides `REPLIT_CONNECTORS_HOSTNAME`)
    pub connectors_hostname: Option<String>,
}

/// `[site]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSection {
    /// Canonical site URL, e.g. `https://www.example.com`
    pub base_url: Option<String>,
    /// Paths disallowed for all crawlers
    pub disallow: Option<Vec<String>>,
    /// Crawlers that get an explicit allow group
    pub crawlers: Option<Vec<String>>,
    /// Images listed in the sitemap
    pub images: Option<Vec<SitemapImageEntry>>,
}

/// One `<image:image>` entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SitemapImageEntry {
    /// Path relative to the site root, e.g. `/0.webp`
    pub loc: String,
    pub caption: String,
    pub title: String,
    #[serde(default)]
    pub geo_location: Option<String>,
}
