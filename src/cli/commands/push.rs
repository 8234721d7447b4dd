//! cli::commands::push
//!
//! Publish the tracked files of the repository as one commit.
//!
//! # Algorithm
//!
//! 1. Open the repository and load configuration (global, then repo file);
//!    a configured `workdir` must be the root of the working tree to publish
//! 2. Resolve the target `owner/repo`
//! 3. Take the publish lock for the whole run
//! 4. Build the connector authenticator from the environment
//! 5. Run the synchronizer against the GitHub object store
//! 6. Report objects created, the commit hash and the repository URL

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::auth::ConnectorAuthenticator;
use crate::cli::Context;
use crate::core::config::{Config, REPO_CONFIG_FILE};
use crate::core::lock::PublishLock;
use crate::forge::github::{parse_github_url, GitHubObjectStore};
use crate::forge::ObjectStore;
use crate::git::Git;
use crate::sync::{IndexEnumerator, RefUpdate, SyncError, SyncOptions, Synchronizer};
use crate::ui::output::{self, TerminalProgress};

/// Run `push`.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn push(ctx: &Context) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(push_async(ctx))
}

async fn push_async(ctx: &Context) -> Result<()> {
    let verbosity = ctx.verbosity();

    let git = Git::open(&ctx.start_dir()?)?;
    let repo_root = git.work_dir()?.to_path_buf();
    let config = Config::load(Some(repo_root.as_path()))?;
    if let Some(path) = config.global_config_loaded_from() {
        output::debug(format!("global config: {}", path.display()), verbosity);
    }
    if let Some(path) = config.repo_config_loaded_from() {
        output::debug(format!("repo config: {}", path.display()), verbosity);
    }

    // A configured workdir names another working tree to publish from
    let git = match config.workdir() {
        Some(dir) => Git::open_work_tree(&repo_root.join(dir))?,
        None => git,
    };
    let workdir = git.work_dir()?.to_path_buf();

    let remote_url = git.default_remote_url()?;
    let (owner, repo) = resolve_target(&config, remote_url.as_deref())?;
    let options = SyncOptions::from_config(&config);
    output::debug(
        format!(
            "target {}/{} branch {} from {}",
            owner,
            repo,
            options.branch,
            workdir.display()
        ),
        verbosity,
    );

    let _lock = PublishLock::acquire(git.git_dir())?;

    let authenticator =
        ConnectorAuthenticator::from_env(config.connectors_hostname()).map_err(SyncError::Auth)?;
    let enumerator = IndexEnumerator::new(&git).map_err(SyncError::Enumerate)?;
    let synchronizer = Synchronizer::new(&authenticator, &enumerator, options)
        .with_progress(Arc::new(TerminalProgress::new(verbosity)));

    let api_base = config.api_base().to_string();
    let web_base = config.web_base().to_string();
    let report = synchronizer
        .run(move |token| -> Arc<dyn ObjectStore> {
            Arc::new(
                GitHubObjectStore::with_api_base(token, owner, repo, api_base)
                    .with_web_base(web_base),
            )
        })
        .await?;

    let branch = &synchronizer.options().branch;
    output::print(
        format!("Created {} objects", report.objects_created()),
        verbosity,
    );
    let action = match report.update {
        RefUpdate::Created => "created",
        RefUpdate::Forced => "updated",
    };
    output::success(
        format!(
            "Published {} to {} ({} {})",
            report.commit.commit_hash.short(7),
            report.url,
            action,
            branch
        ),
        verbosity,
    );
    output::debug(format!("commit {}", report.commit.commit_hash), verbosity);

    Ok(())
}

/// Determine `owner/repo` to publish to.
///
/// Configured values win; anything missing is taken from the GitHub remote.
pub fn resolve_target(config: &Config, remote_url: Option<&str>) -> Result<(String, String)> {
    let from_remote = remote_url.and_then(parse_github_url);

    let owner = config
        .owner()
        .map(str::to_string)
        .or_else(|| from_remote.as_ref().map(|(o, _)| o.clone()));
    let repo = config
        .repo_name()
        .map(str::to_string)
        .or_else(|| from_remote.as_ref().map(|(_, r)| r.clone()));

    match (owner, repo) {
        (Some(owner), Some(repo)) => Ok((owner, repo)),
        _ => bail!(
            "no target repository: set [target] owner and repo in {} or add a GitHub remote",
            REPO_CONFIG_FILE
        ),
    }
}
