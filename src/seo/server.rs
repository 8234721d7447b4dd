//! seo::server
//!
//! Minimal blocking HTTP server for the crawler documents.

use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use super::{robots_txt, sitemap_xml, today_utc, Site};

const PLAIN: &str = "text/plain; charset=utf-8";
const XML: &str = "application/xml; charset=utf-8";

/// A rendered response, independent of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    fn ok(content_type: &'static str, body: String) -> Self {
        Self {
            status: 200,
            content_type,
            body,
        }
    }

    fn not_found() -> Self {
        Self {
            status: 404,
            content_type: PLAIN,
            body: "Not Found".to_string(),
        }
    }
}

/// Resolve a request line to a reply. `today` becomes the sitemap's `lastmod`.
///
/// `HEAD` is answered like `GET`; the transport drops the body.
pub fn route(site: &Site, method: &Method, url: &str, today: NaiveDate) -> Reply {
    if !matches!(method, Method::Get | Method::Head) {
        return Reply::not_found();
    }

    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path {
        "/robots.txt" => Reply::ok(PLAIN, robots_txt(site)),
        "/sitemap.xml" => Reply::ok(XML, sitemap_xml(site, today)),
        _ => Reply::not_found(),
    }
}

/// A bound server ready to answer requests.
pub struct SiteServer {
    server: Server,
    addr: SocketAddr,
    site: Site,
}

impl SiteServer {
    /// Bind to `addr`. Port `0` picks a free port; see [`SiteServer::addr`].
    pub fn bind(addr: SocketAddr, site: Site) -> Result<Self> {
        let server =
            Server::http(addr).map_err(|e| anyhow!("failed to bind {}: {}", addr, e))?;
        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| anyhow!("server is not listening on an IP address"))?;

        Ok(Self { server, addr, site })
    }

    /// The address actually bound.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Answer requests until the listener shuts down (blocking).
    ///
    /// A failure to answer one request is passed to `on_error` and does not
    /// stop the loop.
    pub fn run(&self, mut on_error: impl FnMut(anyhow::Error)) {
        for request in self.server.incoming_requests() {
            if let Err(e) = self.handle(request) {
                on_error(e);
            }
        }
    }

    fn handle(&self, request: Request) -> Result<()> {
        let reply = route(&self.site, request.method(), request.url(), today_utc());
        respond(request, reply)
    }
}

fn respond(request: Request, reply: Reply) -> Result<()> {
    let content_type = Header::from_bytes("Content-Type", reply.content_type)
        .map_err(|_| anyhow!("invalid content type header"))?;
    let response = Response::from_string(reply.body)
        .with_status_code(StatusCode(reply.status))
        .with_header(content_type);

    request.respond(response).context("failed to send response")
}
