//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Default listen address for `serve`.
pub const DEFAULT_SERVE_ADDR: &str = "127.0.0.1:5000";

/// gitsnap - publish the tracked files of a repository as one GitHub commit
#[derive(Parser, Debug)]
#[command(name = "gitsnap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if gitsnap was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Defaults to `push` when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Publish every tracked file as one commit on the target branch
    #[command(
        name = "push",
        long_about = "Publish every tracked file as one commit on the target branch.\n\n\
            Each file listed in the index is uploaded as a blob through the GitHub \
            git data API. The blobs are assembled into a single tree, a commit is \
            created on top of the current branch tip (or as a root commit if the \
            branch does not exist), and the branch is moved to it. The remote \
            branch is force-moved: its previous content is replaced by this \
            snapshot.\n\n\
            The token comes from the connector service configured through \
            REPLIT_CONNECTORS_HOSTNAME and REPL_IDENTITY or WEB_REPL_RENEWAL.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Publish the current repository (owner/repo from origin)
    gitsnap push

    # Same thing; push is the default command
    gitsnap

    # Publish another checkout
    gitsnap --cwd ../site push

CONFIGURATION (.gitsnap.toml):
    [target]
    owner = \"octocat\"
    repo = \"site\"
    branch = \"main\"

    [publish]
    concurrency = 8
    best_effort = false"
    )]
    Push,

    /// Serve robots.txt and sitemap.xml over HTTP
    #[command(
        name = "serve",
        after_help = "\
WORKFLOW EXAMPLES:
    # Serve on the default address
    gitsnap serve

    # Listen on all interfaces
    gitsnap serve --addr 0.0.0.0:8080"
    )]
    Serve {
        /// Address to listen on
        #[arg(long, default_value = DEFAULT_SERVE_ADDR)]
        addr: SocketAddr,
    },

    /// Print robots.txt
    #[command(name = "robots")]
    Robots,

    /// Print sitemap.xml
    #[command(
        name = "sitemap",
        after_help = "\
WORKFLOW EXAMPLES:
    # Sitemap dated today (UTC)
    gitsnap sitemap

    # Reproduce the sitemap for a given day
    gitsnap sitemap --date 2024-03-09"
    )]
    Sitemap {
        /// Value for <lastmod> (YYYY-MM-DD); defaults to today in UTC
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash
    gitsnap completion bash > ~/.local/share/bash-completion/completions/gitsnap

    # Zsh
    gitsnap completion zsh > ~/.zfunc/_gitsnap

    # Fish
    gitsnap completion fish > ~/.config/fish/completions/gitsnap.fish

    # PowerShell
    gitsnap completion powershell >> $PROFILE"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
