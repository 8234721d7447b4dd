//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! gitsnap has two configuration scopes:
//! - **Global**: User-level settings
//! - **Repo**: Working-tree overrides
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Global config file
//! 3. Repo config file
//! 4. CLI flags (not handled here)
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$GITSNAP_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/gitsnap/config.toml`
//! 3. `~/.gitsnap/config.toml`
//!
//! # Repo Config Location
//!
//! `<workdir>/.gitsnap.toml`
//!
//! # Example
//!
//! ```no_run
//! use gitsnap::core::config::Config;
//! use std::path::Path;
//!
//! let config = Config::load(Some(Path::new("/path/to/repo"))).unwrap();
//! println!("Branch: {}", config.branch());
//! println!("Concurrency: {}", config.concurrency());
//! ```

pub mod schema;

pub use schema::{
    AuthSection, FileConfig, PublishSection, SiteSection, SitemapImageEntry, TargetSection,
};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::types::BranchName;

/// Default GitHub REST API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default GitHub web base URL.
pub const DEFAULT_WEB_BASE: &str = "https://github.com";

/// Default commit message for published snapshots.
pub const DEFAULT_MESSAGE: &str = "Publish repository snapshot";

/// Default number of blob uploads in flight.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// File name of the repo-scoped config.
pub const REPO_CONFIG_FILE: &str = ".gitsnap.toml";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Merged configuration from all sources.
///
/// Accessors apply precedence automatically: repo file, then global file,
/// then the built-in default.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: FileConfig,
    /// Repository configuration (if present)
    pub repo: Option<FileConfig>,
    global_path: Option<PathBuf>,
    repo_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// If `workdir` is provided, also loads `<workdir>/.gitsnap.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if config files exist but cannot be parsed or fail
    /// validation. Missing config files are not an error.
    pub fn load(workdir: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(Self::find_global().as_deref(), workdir)
    }

    /// Load configuration from an explicit global file path.
    pub fn load_from(global: Option<&Path>, workdir: Option<&Path>) -> Result<Self, ConfigError> {
        let (global, global_path) = match global {
            Some(path) => (Self::read_file(path)?, Some(path.to_path_buf())),
            None => (FileConfig::default(), None),
        };

        let (repo, repo_path) = match workdir.map(|w| w.join(REPO_CONFIG_FILE)) {
            Some(path) if path.is_file() => (Some(Self::read_file(&path)?), Some(path)),
            _ => (None, None),
        };

        global.validate()?;
        if let Some(ref r) = repo {
            r.validate()?;
        }

        Ok(Config {
            global,
            repo,
            global_path,
            repo_path,
        })
    }

    /// Locate the global config file, if any.
    fn find_global() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("GITSNAP_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("gitsnap/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".gitsnap/config.toml"))
            .filter(|path| path.exists())
    }

    fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Look a value up in the repo file first, then the global file.
    fn lookup<'a, T: 'a>(&'a self, get: impl Fn(&'a FileConfig) -> Option<T>) -> Option<T> {
        self.repo.as_ref().and_then(&get).or_else(|| get(&self.global))
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Repository owner, if configured.
    pub fn owner(&self) -> Option<&str> {
        self.lookup(|c| c.target.as_ref()?.owner.as_deref())
    }

    /// Repository name, if configured.
    pub fn repo_name(&self) -> Option<&str> {
        self.lookup(|c| c.target.as_ref()?.repo.as_deref())
    }

    /// Target branch.
    ///
    /// Defaults to `main`. Values were validated at load time.
    pub fn branch(&self) -> BranchName {
        self.lookup(|c| c.target.as_ref()?.branch.as_deref())
            .and_then(|b| BranchName::new(b).ok())
            .unwrap_or_default()
    }

    /// REST API base URL, without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.lookup(|c| c.target.as_ref()?.api_base.as_deref())
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
    }

    /// Web base URL, without a trailing slash.
    pub fn web_base(&self) -> &str {
        self.lookup(|c| c.target.as_ref()?.web_base.as_deref())
            .unwrap_or(DEFAULT_WEB_BASE)
            .trim_end_matches('/')
    }

    /// Explicit working tree, if configured.
    pub fn workdir(&self) -> Option<&Path> {
        self.lookup(|c| c.publish.as_ref()?.workdir.as_deref())
    }

    /// Commit message.
    pub fn message(&self) -> &str {
        self.lookup(|c| c.publish.as_ref()?.message.as_deref())
            .unwrap_or(DEFAULT_MESSAGE)
    }

    /// Maximum number of blob uploads in flight.
    pub fn concurrency(&self) -> usize {
        self.lookup(|c| c.publish.as_ref()?.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY)
    }

    /// Whether partial upload failures still publish the uploaded subset.
    ///
    /// Defaults to `false` (fail fast).
    pub fn best_effort(&self) -> bool {
        self.lookup(|c| c.publish.as_ref()?.best_effort)
            .unwrap_or(false)
    }

    /// Connector hostname override.
    pub fn connectors_hostname(&self) -> Option<&str> {
        self.lookup(|c| c.auth.as_ref()?.connectors_hostname.as_deref())
    }

    /// Site section, repo scope taking precedence per field.
    pub fn site(&self) -> SiteSection {
        SiteSection {
            base_url: self.lookup(|c| c.site.as_ref()?.base_url.clone()),
            disallow: self.lookup(|c| c.site.as_ref()?.disallow.clone()),
            crawlers: self.lookup(|c| c.site.as_ref()?.crawlers.clone()),
            images: self.lookup(|c| c.site.as_ref()?.images.clone()),
        }
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }

    /// Get the path to the loaded repo config file.
    pub fn repo_config_loaded_from(&self) -> Option<&Path> {
        self.repo_path.as_deref()
    }
}
