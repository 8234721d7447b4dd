//! seo
//!
//! Crawler-facing documents for the published site: `robots.txt` and
//! `sitemap.xml`.
//!
//! # Design
//!
//! Both documents are pure functions of a [`Site`] description. The only
//! dynamic field is the sitemap's `<lastmod>`, which is passed in as a
//! [`NaiveDate`] so that output for a given day is reproducible. The HTTP
//! side lives in [`server`].

pub mod server;

use std::fmt::Write as _;

use chrono::{NaiveDate, Utc};

use crate::core::config::{SiteSection, SitemapImageEntry};

pub use server::{route, Reply, SiteServer};

/// Canonical URL of the site when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://www.perfectpany.com";

const DEFAULT_DISALLOW: [&str; 4] = ["/admin/", "/private/", "/api/", "/temp/"];
const DEFAULT_CRAWLERS: [&str; 3] = ["Googlebot", "Yeti", "Bingbot"];
const DEFAULT_GEO_LOCATION: &str = "서울특별시 강남구";

const DEFAULT_IMAGES: [(&str, &str, &str); 7] = [
    (
        "/0.webp",
        "강남 퍼펙트 대형 룸 업장 전경 - 70개 룸 규모 프리미엄 인테리어",
        "강남 퍼펙트 프리미엄 업장 전경",
    ),
    (
        "/1.webp",
        "강남 퍼펙트 프리미엄 룸 내부 인테리어 - 고급 블랙 골드 톤",
        "강남 퍼펙트 고급 룸 인테리어",
    ),
    (
        "/2.webp",
        "강남 퍼펙트 이용 시스템 안내 - 초이스 진행 방식",
        "강남 퍼펙트 룸초이스 시스템 안내",
    ),
    (
        "/3.webp",
        "강남 퍼펙트 가격 안내 - 주대 룸티 티시 상세 정보",
        "강남 퍼펙트 가격 구조 안내",
    ),
    (
        "/4.webp",
        "강남 퍼펙트 서비스 안내 - 주류 킵술 픽업 서비스",
        "강남 퍼펙트 주류 서비스 안내",
    ),
    (
        "/5.webp",
        "강남 퍼펙트 자주 묻는 질문 FAQ - 처음 방문 가격 시스템",
        "강남 퍼펙트 FAQ 질문 답변",
    ),
    (
        "/6.webp",
        "강남 퍼펙트 예약 문의 안내 - 전화 텔레그램 카카오톡",
        "강남 퍼펙트 예약 문의 안내",
    ),
];

/// Everything the crawler documents are rendered from.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    /// Canonical URL without a trailing slash.
    pub base_url: String,
    /// Paths disallowed for every crawler.
    pub disallow: Vec<String>,
    /// Crawlers that get their own allow group.
    pub crawlers: Vec<String>,
    /// Images attached to the root `<url>` entry.
    pub images: Vec<SitemapImageEntry>,
}

impl Default for Site {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            disallow: DEFAULT_DISALLOW.iter().map(|s| s.to_string()).collect(),
            crawlers: DEFAULT_CRAWLERS.iter().map(|s| s.to_string()).collect(),
            images: default_images(),
        }
    }
}

impl Site {
    /// Build a site from configuration, falling back to the defaults
    /// field by field.
    pub fn from_section(section: &SiteSection) -> Self {
        let defaults = Site::default();
        Self {
            base_url: section
                .base_url
                .as_deref()
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            disallow: section.disallow.clone().unwrap_or(defaults.disallow),
            crawlers: section.crawlers.clone().unwrap_or(defaults.crawlers),
            images: section.images.clone().unwrap_or(defaults.images),
        }
    }

    /// Absolute URL for a path under the site root.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

fn default_images() -> Vec<SitemapImageEntry> {
    DEFAULT_IMAGES
        .iter()
        .map(|(loc, caption, title)| SitemapImageEntry {
            loc: loc.to_string(),
            caption: caption.to_string(),
            title: title.to_string(),
            geo_location: Some(DEFAULT_GEO_LOCATION.to_string()),
        })
        .collect()
}

/// Current date in UTC, the value used for `<lastmod>`.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// Render `robots.txt`.
pub fn robots_txt(site: &Site) -> String {
    let mut out = String::from("User-agent: *\nAllow: /\n\n");
    for path in &site.disallow {
        let _ = writeln!(out, "Disallow: {}", path);
    }
    let _ = writeln!(out, "\nSitemap: {}", site.url("/sitemap.xml"));
    for crawler in &site.crawlers {
        let _ = write!(out, "\nUser-agent: {}\nAllow: /\nCrawl-delay: 0\n", crawler);
    }
    out
}

/// Render `sitemap.xml` with `lastmod` as the modification date.
pub fn sitemap_xml(site: &Site, lastmod: NaiveDate) -> String {
    let root = site.url("/");
    let mut out = String::from(concat!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
        "<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\"\n",
        "        xmlns:image=\"http://www.google.com/schemas/sitemap-image/1.1\"\n",
        "        xmlns:xhtml=\"http://www.w3.org/1999/xhtml\">\n",
        "  <url>\n",
    ));

    let _ = writeln!(out, "    <loc>{}</loc>", escape_xml(&root));
    let _ = writeln!(out, "    <lastmod>{}</lastmod>", lastmod.format("%Y-%m-%d"));
    out.push_str("    <changefreq>weekly</changefreq>\n");
    out.push_str("    <priority>1.0</priority>\n");
    let _ = writeln!(
        out,
        "    <xhtml:link rel=\"alternate\" hreflang=\"ko\" href=\"{}\" />",
        escape_xml(&root)
    );

    for image in &site.images {
        out.push_str("    <image:image>\n");
        let _ = writeln!(
            out,
            "      <image:loc>{}</image:loc>",
            escape_xml(&site.url(&image.loc))
        );
        let _ = writeln!(
            out,
            "      <image:caption>{}</image:caption>",
            escape_xml(&image.caption)
        );
        let _ = writeln!(
            out,
            "      <image:title>{}</image:title>",
            escape_xml(&image.title)
        );
        if let Some(geo) = &image.geo_location {
            let _ = writeln!(
                out,
                "      <image:geo_location>{}</image:geo_location>",
                escape_xml(geo)
            );
        }
        out.push_str("    </image:image>\n");
    }

    out.push_str("  </url>\n</urlset>");
    out
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
