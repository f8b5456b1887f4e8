//! Rendered content and the data handed to templates.

use chrono::{DateTime, Utc};
use pressroom_core::{Content, ContentMeta, Section, Site, model::SocialLink};
use serde::Serialize;

use crate::{
    authors::AuthorSubject,
    blocks::GeneratedBlocks,
    urls::{PageWindow, UrlTopology},
};

/// A non-draft content item with its body rendered and its URL computed.
///
/// Built once per run and shared by page rendering and blocks selection.
#[derive(Debug, Clone)]
pub struct RenderedContent<'a> {
    pub content: &'a Content,
    pub html: String,
    pub url: String,
    pub section_path: String,
}

impl RenderedContent<'_> {
    pub fn id(&self) -> i64 {
        self.content.id
    }
}

/// Kind of page being rendered, exposed to templates as `page_kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Content,
    Index,
    Author,
}

#[derive(Debug, Clone, Serialize)]
pub struct SiteView {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub mode: String,
}

impl From<&Site> for SiteView {
    fn from(site: &Site) -> Self {
        Self {
            id: site.id,
            slug: site.slug.clone(),
            name: site.display_name().to_string(),
            mode: match site.mode {
                pressroom_core::SiteMode::Blog => "blog".to_string(),
                pressroom_core::SiteMode::Structured => "structured".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub url: String,
    pub description: String,
}

impl SectionView {
    pub fn new(section: &Section, urls: &UrlTopology) -> Self {
        Self {
            id: section.id,
            name: section.name.clone(),
            path: section.normalized_path().to_string(),
            url: urls.section_url(section.normalized_path()),
            description: section.description.clone(),
        }
    }
}

/// Navigation menu entry.
#[derive(Debug, Clone, Serialize)]
pub struct MenuItem {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagView {
    pub name: String,
    pub slug: String,
}

/// Link to an author page.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorLink {
    pub name: String,
    pub url: String,
}

/// Full content record as seen by templates.
#[derive(Debug, Clone, Serialize)]
pub struct ContentView {
    pub id: i64,
    pub heading: String,
    pub slug: String,
    pub summary: String,
    pub kind: &'static str,
    pub url: String,
    pub html: String,
    pub featured: bool,
    pub series: String,
    pub series_order: i32,
    pub published_at: Option<String>,
    pub published_date: Option<String>,
    pub tags: Vec<TagView>,
    pub image: Option<String>,
    pub author: Option<AuthorLink>,
    pub meta: ContentMeta,
}

impl ContentView {
    pub fn new(item: &RenderedContent<'_>, author: Option<AuthorLink>) -> Self {
        let content = item.content;
        Self {
            id: content.id,
            heading: content.heading.clone(),
            slug: content.slug(),
            summary: content.summary.clone(),
            kind: content.kind.as_str(),
            url: item.url.clone(),
            html: item.html.clone(),
            featured: content.featured,
            series: content.series.clone(),
            series_order: content.series_order,
            published_at: content.published_at.map(|d| d.to_rfc3339()),
            published_date: content.published_at.map(|d| d.format("%Y-%m-%d").to_string()),
            tags: content
                .tags
                .iter()
                .map(|t| TagView {
                    name: t.name.clone(),
                    slug: t.slug.clone(),
                })
                .collect(),
            image: content.image.clone(),
            author,
            meta: content.meta.clone(),
        }
    }
}

/// Short reference used in blocks.
#[derive(Debug, Clone, Serialize)]
pub struct ContentLink {
    pub id: i64,
    pub heading: String,
    pub summary: String,
    pub kind: &'static str,
    pub url: String,
    pub series_order: i32,
}

impl From<&RenderedContent<'_>> for ContentLink {
    fn from(item: &RenderedContent<'_>) -> Self {
        Self {
            id: item.content.id,
            heading: item.content.heading.clone(),
            summary: item.content.summary.clone(),
            kind: item.content.kind.as_str(),
            url: item.url.clone(),
            series_order: item.content.series_order,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesView {
    pub name: String,
    pub prev: Option<ContentLink>,
    pub next: Option<ContentLink>,
    pub forward: Vec<ContentLink>,
    pub backward: Vec<ContentLink>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BlocksView {
    pub related: Vec<ContentLink>,
    pub series: Option<SeriesView>,
}

impl From<&GeneratedBlocks<'_>> for BlocksView {
    fn from(blocks: &GeneratedBlocks<'_>) -> Self {
        Self {
            related: blocks.related.iter().map(|r| ContentLink::from(*r)).collect(),
            series: blocks.series.as_ref().map(|nav| SeriesView {
                name: nav.name.clone(),
                prev: nav.prev.map(ContentLink::from),
                next: nav.next.map(ContentLink::from),
                forward: nav.forward.iter().map(|r| ContentLink::from(*r)).collect(),
                backward: nav.backward.iter().map(|r| ContentLink::from(*r)).collect(),
            }),
        }
    }
}

/// Author profile as seen by templates.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorView {
    pub key: String,
    pub name: String,
    pub bio: String,
    pub photo: Option<String>,
    pub url: String,
    pub social_links: Vec<SocialLink>,
    pub contributor: bool,
}

impl AuthorView {
    pub fn new(subject: &AuthorSubject<'_>, urls: &UrlTopology) -> Self {
        Self {
            key: subject.key(),
            name: subject.display_name(),
            bio: subject.bio().to_string(),
            photo: subject.photo_path().map(|p| p.trim_start_matches('/').to_string()),
            url: urls.author_url(&subject.key()),
            social_links: subject.social_links().to_vec(),
            contributor: matches!(subject, AuthorSubject::Contributor(_)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationView {
    #[serde(flatten)]
    pub window: PageWindow,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

impl PaginationView {
    pub fn new(window: PageWindow, urls: &UrlTopology, section_path: &str) -> Self {
        Self {
            window,
            prev_url: window
                .has_prev
                .then(|| urls.pagination_url(section_path, window.number - 1)),
            next_url: window
                .has_next
                .then(|| urls.pagination_url(section_path, window.number + 1)),
        }
    }
}

/// Everything a template can see.
///
/// Optional parts are null for page kinds that do not carry them.
#[derive(Debug, Clone, Serialize)]
pub struct PageData {
    pub page_kind: PageKind,
    pub title: String,
    pub site: SiteView,
    pub base_path: String,
    pub asset_path: String,
    pub menu: Vec<MenuItem>,
    pub now: String,
    pub content: Option<ContentView>,
    pub section: Option<SectionView>,
    pub blocks: Option<BlocksView>,
    pub items: Vec<ContentView>,
    pub pagination: Option<PaginationView>,
    pub author: Option<AuthorView>,
}

impl PageData {
    /// Page data with the shared site-wide parts filled in.
    pub fn new(
        page_kind: PageKind,
        title: impl Into<String>,
        site: &SiteView,
        menu: &[MenuItem],
        base_path: &str,
        asset_path: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            page_kind,
            title: title.into(),
            site: site.clone(),
            base_path: base_path.to_string(),
            asset_path,
            menu: menu.to_vec(),
            now: now.to_rfc3339(),
            content: None,
            section: None,
            blocks: None,
            items: Vec::new(),
            pagination: None,
            author: None,
        }
    }
}
