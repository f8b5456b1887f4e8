//! YAML front matter for exported content source records.
//!
//! Backups store each content item as a markdown file whose header carries
//! the record fields, so a backup branch stays readable and diffable.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{CoreError, Result},
    model::{Content, ContentKind, ContentMeta},
};

const DELIMITER: &str = "---";

/// Front matter of an exported content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    pub id: i64,
    pub short_id: String,
    pub title: String,
    pub kind: ContentKind,
    pub section_id: i64,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,

    #[serde(default)]
    pub draft: bool,

    #[serde(default)]
    pub featured: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub series: String,

    #[serde(default)]
    pub series_order: i32,

    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Tag slugs.
    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub contributor_id: Option<i64>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub meta: ContentMeta,
}

impl From<&Content> for Frontmatter {
    fn from(content: &Content) -> Self {
        Self {
            id: content.id,
            short_id: content.short_id.clone(),
            title: content.heading.clone(),
            kind: content.kind,
            section_id: content.section_id,
            summary: content.summary.clone(),
            draft: content.draft,
            featured: content.featured,
            series: content.series.clone(),
            series_order: content.series_order,
            published_at: content.published_at,
            created_at: content.created_at,
            updated_at: content.updated_at,
            tags: content.tags.iter().map(|t| t.slug.clone()).collect(),
            contributor_id: content.contributor_id,
            author: content.author_username.clone(),
            image: content.image.clone(),
            meta: content.meta.clone(),
        }
    }
}

/// Render a markdown document with a YAML front matter header.
pub fn render_document(frontmatter: &Frontmatter, body: &str) -> Result<String> {
    let header = serde_yaml::to_string(frontmatter)?;
    let mut doc = String::with_capacity(header.len() + body.len() + 16);
    doc.push_str(DELIMITER);
    doc.push('\n');
    doc.push_str(&header);
    if !header.ends_with('\n') {
        doc.push('\n');
    }
    doc.push_str(DELIMITER);
    doc.push_str("\n\n");
    doc.push_str(body);
    if !body.ends_with('\n') {
        doc.push('\n');
    }
    Ok(doc)
}

/// Split a document into front matter text and body.
pub fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let content = content.trim_start();
    let after_first = content.strip_prefix(DELIMITER)?;
    let closing_pos = after_first.find(&format!("\n{DELIMITER}"))?;

    let frontmatter = after_first[..closing_pos].trim();
    let body = after_first[closing_pos + 1 + DELIMITER.len()..].trim_start();

    Some((frontmatter, body))
}

/// Parse an exported document back into front matter and body.
pub fn parse_document(content: &str, path: &Path) -> Result<(Frontmatter, String)> {
    let (fm_str, body) = split_frontmatter(content)
        .ok_or_else(|| CoreError::frontmatter(path, "missing front matter header"))?;

    let frontmatter: Frontmatter =
        serde_yaml::from_str(fm_str).map_err(|e| CoreError::frontmatter(path, e.to_string()))?;

    Ok((frontmatter, body.to_string()))
}
