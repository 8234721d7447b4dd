//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Async Commands
//!
//! `push` talks to the connector service and the GitHub API, so it builds
//! a tokio runtime and blocks on the async implementation. The site
//! commands are synchronous.

mod completion;
mod push;
mod site;

pub use completion::completion;
pub use push::{push, resolve_target};
pub use site::{robots, serve, sitemap};

use super::args::Command;
use super::Context;
use anyhow::Result;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Push => push::push(ctx),
        Command::Serve { addr } => site::serve(ctx, addr),
        Command::Robots => site::robots(ctx),
        Command::Sitemap { date } => site::sitemap(ctx, date),
        Command::Completion { shell } => completion::completion(shell),
    }
}
