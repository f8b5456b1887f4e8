//! Site content records consumed by the generation pipeline.
//!
//! These mirror what the admin layer persists. The pipeline only reads them;
//! nothing here is ever written back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::slug::content_slug;

/// How a site organizes its content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteMode {
    /// Single stream of posts.
    Blog,
    /// Sectioned site with per-section indexes.
    #[default]
    Structured,
}

/// A site owning sections, content, layouts and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,

    /// Workspace directory name and default display name.
    pub slug: String,

    /// Human readable site name.
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub mode: SiteMode,

    #[serde(default = "default_true")]
    pub active: bool,

    /// Layout used for sections without their own.
    #[serde(default)]
    pub default_layout_id: Option<i64>,
}

impl Site {
    /// Name shown in page titles; falls back to the slug.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.slug
        } else {
            &self.name
        }
    }
}

/// A URL-path-scoped grouping of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    pub site_id: i64,
    pub name: String,

    /// URL path segment; empty or `/` is the site root.
    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub layout_id: Option<i64>,
}

impl Section {
    /// Path without surrounding slashes (`""` for the root section).
    pub fn normalized_path(&self) -> &str {
        self.path.trim_matches('/')
    }

    /// Whether this is the site root section.
    pub fn is_root(&self) -> bool {
        self.normalized_path().is_empty()
    }

    /// Whether the path stays inside the directory it is joined onto.
    ///
    /// `.` and `..` segments and backslashes are rejected.
    pub fn has_safe_path(&self) -> bool {
        self.normalized_path()
            .split('/')
            .all(|segment| segment != "." && segment != ".." && !segment.contains('\\'))
    }
}

/// Kind of a content item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Post,
    Page,
    Article,
    Blog,
    Series,
}

/// The two families related-content selection prioritizes between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindFamily {
    Blog,
    Article,
}

impl ContentKind {
    /// Lowercase name as used in templates and exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Page => "page",
            Self::Article => "article",
            Self::Blog => "blog",
            Self::Series => "series",
        }
    }

    /// Family for related-content tiers; pages and series belong to neither.
    pub fn family(&self) -> Option<KindFamily> {
        match self {
            Self::Blog => Some(KindFamily::Blog),
            Self::Article | Self::Post => Some(KindFamily::Article),
            Self::Page | Self::Series => None,
        }
    }
}

/// A taxonomy tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub site_id: i64,
    pub name: String,
    pub slug: String,
}

/// SEO and indexing metadata attached to a content item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMeta {
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub keywords: String,

    #[serde(default)]
    pub robots: String,

    /// `exclude` or `noindex` keeps the item out of the sitemap.
    #[serde(default)]
    pub sitemap: String,
}

impl ContentMeta {
    /// Whether the sitemap flag opts this item out.
    pub fn excluded_from_sitemap(&self) -> bool {
        matches!(
            self.sitemap.trim().to_ascii_lowercase().as_str(),
            "exclude" | "noindex"
        )
    }
}

/// A content item authored in the admin surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: i64,
    pub site_id: i64,
    pub section_id: i64,

    /// Short identifier appended to the slug.
    pub short_id: String,

    #[serde(default)]
    pub kind: ContentKind,

    pub heading: String,

    #[serde(default)]
    pub summary: String,

    /// Markdown body.
    #[serde(default)]
    pub body: String,

    #[serde(default)]
    pub draft: bool,

    #[serde(default)]
    pub featured: bool,

    /// Series name; empty when the item is standalone.
    #[serde(default)]
    pub series: String,

    #[serde(default)]
    pub series_order: i32,

    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,

    /// Unix epoch when the record carries none.
    #[serde(default)]
    pub created_at: DateTime<Utc>,

    /// Unix epoch when the record carries none, so `published_at` wins for
    /// the sitemap and repeated runs stay byte-identical.
    #[serde(default)]
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub tags: Vec<Tag>,

    #[serde(default)]
    pub contributor_id: Option<i64>,

    /// Raw author identity used when no contributor record exists.
    #[serde(default)]
    pub author_username: Option<String>,

    /// Header image path relative to the site workspace.
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub meta: ContentMeta,
}

impl Content {
    /// URL slug: slugified heading plus short id.
    pub fn slug(&self) -> String {
        content_slug(&self.heading, &self.short_id)
    }

    /// Whether the item shares at least one tag id with `other`.
    pub fn shares_tag_with(&self, other: &Content) -> bool {
        self.tags
            .iter()
            .any(|tag| other.tags.iter().any(|t| t.id == tag.id))
    }

    /// Whether the item belongs to a series.
    pub fn in_series(&self) -> bool {
        !self.series.trim().is_empty()
    }
}

/// A site-authored template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub id: i64,
    pub site_id: i64,
    pub name: String,

    /// Template source compiled at generation time.
    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub header_image: Option<String>,
}

/// A key/value configuration record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    #[serde(default)]
    pub site_id: i64,
    pub ref_key: String,
    pub value: String,
    #[serde(default)]
    pub category: String,
}

/// A social profile link on a contributor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLink {
    pub name: String,
    pub url: String,
}

/// A named author with a public profile page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contributor {
    pub id: i64,
    pub site_id: i64,
    pub handle: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub surname: String,

    #[serde(default)]
    pub bio: String,

    #[serde(default)]
    pub social_links: Vec<SocialLink>,

    /// Photo path relative to the site workspace.
    #[serde(default)]
    pub photo_path: Option<String>,
}

impl Contributor {
    /// Full name, falling back to the handle.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.name.trim(), self.surname.trim());
        let full = full.trim();
        if full.is_empty() {
            self.handle.clone()
        } else {
            full.to_string()
        }
    }
}

/// Profile data for a raw `author_username`, looked up in the user store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserAuthor {
    pub username: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub bio: String,

    #[serde(default)]
    pub photo_path: Option<String>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: i64) -> Tag {
        Tag {
            id,
            site_id: 1,
            name: format!("tag-{id}"),
            slug: format!("tag-{id}"),
        }
    }

    fn content(heading: &str, short_id: &str, tags: Vec<Tag>) -> Content {
        Content {
            id: 1,
            site_id: 1,
            section_id: 1,
            short_id: short_id.to_string(),
            kind: ContentKind::Article,
            heading: heading.to_string(),
            summary: String::new(),
            body: String::new(),
            draft: false,
            featured: false,
            series: String::new(),
            series_order: 0,
            published_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            tags,
            contributor_id: None,
            author_username: None,
            image: None,
            meta: ContentMeta::default(),
        }
    }

    #[test]
    fn test_section_root_detection() {
        let mut section = Section {
            id: 1,
            site_id: 1,
            name: "Main".to_string(),
            path: "/".to_string(),
            description: String::new(),
            layout_id: None,
        };
        assert!(section.is_root());

        section.path = "/blog/".to_string();
        assert!(!section.is_root());
        assert_eq!(section.normalized_path(), "blog");
    }

    #[test]
    fn test_section_path_safety() {
        let mut section = Section {
            id: 1,
            site_id: 1,
            name: "Docs".to_string(),
            path: "/docs/guides/".to_string(),
            description: String::new(),
            layout_id: None,
        };
        assert!(section.has_safe_path());

        section.path = "/".to_string();
        assert!(section.has_safe_path());

        for bad in ["../../escaped", "docs/../..", "./docs", "docs\\..\\x"] {
            section.path = bad.to_string();
            assert!(!section.has_safe_path(), "{bad}");
        }
    }

    #[test]
    fn test_kind_families() {
        assert_eq!(ContentKind::Blog.family(), Some(KindFamily::Blog));
        assert_eq!(ContentKind::Post.family(), Some(KindFamily::Article));
        assert_eq!(ContentKind::Article.family(), Some(KindFamily::Article));
        assert_eq!(ContentKind::Page.family(), None);
    }

    #[test]
    fn test_shares_tag_by_id_only() {
        let a = content("A", "a", vec![tag(1)]);
        let mut renamed = tag(2);
        renamed.name = "tag-1".to_string();
        renamed.slug = "tag-1".to_string();
        let b = content("B", "b", vec![renamed]);
        let c = content("C", "c", vec![tag(1), tag(3)]);

        assert!(!a.shares_tag_with(&b));
        assert!(a.shares_tag_with(&c));
    }

    #[test]
    fn test_sitemap_exclusion_flag() {
        let mut meta = ContentMeta::default();
        assert!(!meta.excluded_from_sitemap());
        meta.sitemap = "exclude".to_string();
        assert!(meta.excluded_from_sitemap());
        meta.sitemap = "NoIndex".to_string();
        assert!(meta.excluded_from_sitemap());
    }

    #[test]
    fn test_missing_timestamps_are_stable() {
        let raw = "{ id: 1, site_id: 1, section_id: 1, short_id: a, heading: Hi }";
        let first: Content = serde_yaml::from_str(raw).unwrap();
        let second: Content = serde_yaml::from_str(raw).unwrap();

        assert_eq!(first.updated_at, DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(first.created_at, second.created_at);
        assert_eq!(first.updated_at, second.updated_at);
    }

    #[test]
    fn test_contributor_display_name() {
        let mut c = Contributor {
            id: 1,
            site_id: 1,
            handle: "jdoe".to_string(),
            name: String::new(),
            surname: String::new(),
            bio: String::new(),
            social_links: vec![],
            photo_path: None,
        };
        assert_eq!(c.display_name(), "jdoe");
        c.name = "Jane".to_string();
        c.surname = "Doe".to_string();
        assert_eq!(c.display_name(), "Jane Doe");
    }
}
