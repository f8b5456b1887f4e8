//! Sitemap generation.
//!
//! Generates `sitemap.xml` and the optional `CNAME` marker for custom domains.

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
};

use chrono::{DateTime, Utc};
use pressroom_core::{Content, Section};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::urls::UrlTopology;

/// Sitemap generation errors.
#[derive(Debug, Error)]
pub enum SitemapError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured base URL cannot be parsed.
    #[error("invalid base URL {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Result type for sitemap operations.
pub type Result<T> = std::result::Result<T, SitemapError>;

/// Change frequency for sitemap entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFreq {
    Daily,
    Weekly,
    Monthly,
}

impl ChangeFreq {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

/// A sitemap URL entry.
#[derive(Debug, Clone)]
pub struct SitemapUrl {
    /// URL location.
    pub loc: String,

    /// Last modification date.
    pub lastmod: Option<DateTime<Utc>>,

    /// Change frequency.
    pub changefreq: ChangeFreq,

    /// Priority (0.0 to 1.0).
    pub priority: f32,
}

/// Whether a content item may appear in the sitemap at `now`.
pub fn is_eligible(content: &Content, now: DateTime<Utc>) -> bool {
    !content.draft
        && content.published_at.is_some_and(|published| published <= now)
        && !content.meta.excluded_from_sitemap()
}

/// Last modification of a content item: `updated_at`, or `published_at` when later.
pub fn last_modified(content: &Content) -> DateTime<Utc> {
    match content.published_at {
        Some(published) if published > content.updated_at => published,
        _ => content.updated_at,
    }
}

/// Sitemap builder.
#[derive(Debug, Clone)]
pub struct SitemapBuilder {
    base_url: String,
    urls: UrlTopology,
}

impl SitemapBuilder {
    /// Create a sitemap builder for a site served at `base_url` under `base_path`.
    #[must_use]
    pub fn new(base_url: &str, base_path: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            urls: UrlTopology::new(base_path),
        }
    }

    /// Entries for the homepage, sections with eligible content and eligible items.
    pub fn entries(
        &self,
        contents: &[Content],
        sections: &[Section],
        now: DateTime<Utc>,
    ) -> Vec<SitemapUrl> {
        let blocked: HashSet<i64> = sections
            .iter()
            .filter(|s| !s.has_safe_path())
            .map(|s| s.id)
            .collect();
        let section_paths: HashMap<i64, &str> = sections
            .iter()
            .filter(|s| !blocked.contains(&s.id))
            .map(|s| (s.id, s.normalized_path()))
            .collect();

        let eligible: Vec<&Content> = contents
            .iter()
            .filter(|c| is_eligible(c, now) && !blocked.contains(&c.section_id))
            .collect();

        let mut entries = vec![SitemapUrl {
            loc: self.absolute(self.urls.base_path()),
            lastmod: eligible.iter().map(|c| last_modified(c)).max(),
            changefreq: ChangeFreq::Daily,
            priority: 1.0,
        }];

        for section in sections.iter().filter(|s| !s.is_root() && !blocked.contains(&s.id)) {
            let lastmod = eligible
                .iter()
                .filter(|c| c.section_id == section.id)
                .map(|c| last_modified(c))
                .max();
            if lastmod.is_none() {
                continue;
            }
            entries.push(SitemapUrl {
                loc: self.absolute(&self.urls.section_url(section.normalized_path())),
                lastmod,
                changefreq: ChangeFreq::Weekly,
                priority: 0.6,
            });
        }

        for content in eligible {
            let section_path = section_paths
                .get(&content.section_id)
                .copied()
                .unwrap_or_default();
            entries.push(SitemapUrl {
                loc: self.absolute(&self.urls.content_url(section_path, &content.slug())),
                lastmod: Some(last_modified(content)),
                changefreq: ChangeFreq::Monthly,
                priority: 0.8,
            });
        }

        entries
    }

    /// Generate sitemap XML.
    pub fn generate(&self, contents: &[Content], sections: &[Section], now: DateTime<Utc>) -> String {
        let entries = self.entries(contents, sections, now);
        debug!(count = entries.len(), "generating sitemap");

        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
        xml.push('\n');

        for entry in &entries {
            xml.push_str(&url_to_xml(entry));
        }

        xml.push_str("</urlset>\n");
        xml
    }

    /// Write `sitemap.xml` into `output_dir`.
    pub fn write(
        &self,
        output_dir: &Path,
        contents: &[Content],
        sections: &[Section],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let xml = self.generate(contents, sections, now);
        let path = output_dir.join("sitemap.xml");
        fs::write(&path, xml)?;
        info!(path = %path.display(), "generated sitemap");
        Ok(())
    }

    fn absolute(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Convert a URL entry to XML.
fn url_to_xml(url: &SitemapUrl) -> String {
    let mut xml = String::from("  <url>\n");

    xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&url.loc)));

    if let Some(lastmod) = &url.lastmod {
        xml.push_str(&format!(
            "    <lastmod>{}</lastmod>\n",
            lastmod.format("%Y-%m-%d")
        ));
    }

    xml.push_str(&format!(
        "    <changefreq>{}</changefreq>\n",
        url.changefreq.as_str()
    ));
    xml.push_str(&format!("    <priority>{:.1}</priority>\n", url.priority));

    xml.push_str("  </url>\n");
    xml
}

/// Write a `CNAME` file holding the host of `base_url`.
///
/// Nothing is written for `localhost` or a URL without a host. Returns the
/// host written.
pub fn generate_cname(output_dir: &Path, base_url: &str) -> Result<Option<String>> {
    let parsed = Url::parse(base_url.trim()).map_err(|source| SitemapError::InvalidBaseUrl {
        url: base_url.to_string(),
        source,
    })?;

    let Some(host) = parsed.host_str() else {
        debug!(url = base_url, "base URL has no host, skipping CNAME");
        return Ok(None);
    };
    if host.eq_ignore_ascii_case("localhost") {
        debug!("base URL is localhost, skipping CNAME");
        return Ok(None);
    }

    fs::write(output_dir.join("CNAME"), host)?;
    info!(host, "generated CNAME");
    Ok(Some(host.to_string()))
}

/// Escape special XML characters.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
