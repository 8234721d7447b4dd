//! cli::commands::site
//!
//! `robots`, `sitemap` and `serve`: the crawler documents.
//!
//! These commands do not need a repository. When run inside one, the
//! `[site]` section of its `.gitsnap.toml` is honored.

use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;

use crate::cli::Context;
use crate::core::config::Config;
use crate::git::Git;
use crate::seo::{robots_txt, sitemap_xml, today_utc, Site, SiteServer};
use crate::ui::output;

/// Load the site description for the directory the command runs in.
fn load_site(ctx: &Context) -> Result<Site> {
    let start = ctx.start_dir()?;
    let root = Git::open(&start)
        .ok()
        .and_then(|git| git.work_dir().ok().map(PathBuf::from))
        .unwrap_or(start);
    let config = Config::load(Some(root.as_path()))?;
    Ok(Site::from_section(&config.site()))
}

/// Print `robots.txt`.
pub fn robots(ctx: &Context) -> Result<()> {
    let site = load_site(ctx)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(robots_txt(&site).as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Print `sitemap.xml` dated `date`, or today in UTC.
pub fn sitemap(ctx: &Context, date: Option<NaiveDate>) -> Result<()> {
    let site = load_site(ctx)?;
    let xml = sitemap_xml(&site, date.unwrap_or_else(today_utc));
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", xml)?;
    stdout.flush()?;
    Ok(())
}

/// Serve both documents until interrupted.
pub fn serve(ctx: &Context, addr: SocketAddr) -> Result<()> {
    let verbosity = ctx.verbosity();
    let site = load_site(ctx)?;
    output::debug(format!("site base URL {}", site.base_url), verbosity);

    let server = SiteServer::bind(addr, site)?;
    output::success(
        format!(
            "Serving /robots.txt and /sitemap.xml on http://{}",
            server.addr()
        ),
        verbosity,
    );

    server.run(|e| output::warn(format!("request failed: {:#}", e), verbosity));
    Ok(())
}
