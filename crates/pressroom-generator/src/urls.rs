//! URL topology under a configurable base path.
//!
//! Every URL the generator emits goes through [`UrlTopology`], and every
//! output file location goes through the matching `*_output` method, so the
//! link graph and the directory tree cannot drift apart.

use std::path::PathBuf;

use serde::Serialize;

/// Directory holding author pages.
pub const AUTHORS_DIR: &str = "authors";

/// Canonical URL and output path computation for one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTopology {
    base_path: String,
}

impl UrlTopology {
    /// Create a topology, normalizing `base_path` to start and end with `/`.
    #[must_use]
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: normalize_base_path(base_path),
        }
    }

    /// The normalized base path.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Index URL of a section (`""` is the site root).
    #[must_use]
    pub fn section_url(&self, section_path: &str) -> String {
        let section = section_path.trim_matches('/');
        if section.is_empty() {
            self.base_path.clone()
        } else {
            format!("{}{section}/", self.base_path)
        }
    }

    /// Canonical URL of a content item.
    #[must_use]
    pub fn content_url(&self, section_path: &str, slug: &str) -> String {
        format!("{}{slug}/", self.section_url(section_path))
    }

    /// URL of an index page; page 1 is the section index itself.
    #[must_use]
    pub fn pagination_url(&self, section_path: &str, page: usize) -> String {
        let index = self.section_url(section_path);
        if page <= 1 {
            index
        } else {
            format!("{index}page/{page}/")
        }
    }

    /// URL of an author page.
    #[must_use]
    pub fn author_url(&self, key: &str) -> String {
        format!("{}{AUTHORS_DIR}/{key}/", self.base_path)
    }

    /// Output file of a content page, relative to the output root.
    #[must_use]
    pub fn content_output(&self, section_path: &str, slug: &str) -> PathBuf {
        section_dir(section_path).join(slug).join("index.html")
    }

    /// Output file of an index page, relative to the output root.
    #[must_use]
    pub fn index_output(&self, section_path: &str, page: usize) -> PathBuf {
        let dir = section_dir(section_path);
        if page <= 1 {
            dir.join("index.html")
        } else {
            dir.join("page").join(page.to_string()).join("index.html")
        }
    }

    /// Output file of an author page, relative to the output root.
    #[must_use]
    pub fn author_output(&self, key: &str) -> PathBuf {
        PathBuf::from(AUTHORS_DIR).join(key).join("index.html")
    }
}

/// Relative prefix from a page directory back to the output root.
///
/// One `../` per path segment, at least one.
#[must_use]
pub fn asset_path(path: &str) -> String {
    let depth = path.split('/').filter(|s| !s.is_empty()).count().max(1);
    "../".repeat(depth)
}

fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{trimmed}/")
    }
}

/// Output directory of a section; `.` and `..` segments are dropped.
fn section_dir(section_path: &str) -> PathBuf {
    let mut dir = PathBuf::new();
    for segment in section_path
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
    {
        dir.push(segment);
    }
    dir
}

/// Pagination arithmetic for index listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    total_items: usize,
    page_size: usize,
}

impl Paginator {
    /// Create a paginator; a zero page size is treated as one.
    #[must_use]
    pub fn new(total_items: usize, page_size: usize) -> Self {
        Self {
            total_items,
            page_size: page_size.max(1),
        }
    }

    /// Number of pages, never less than one.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.total_items.div_ceil(self.page_size).max(1)
    }

    /// Item range and navigation flags of a 1-based page.
    #[must_use]
    pub fn page(&self, number: usize) -> PageWindow {
        let total_pages = self.total_pages();
        let number = number.clamp(1, total_pages);
        let start = ((number - 1) * self.page_size).min(self.total_items);
        let end = (start + self.page_size).min(self.total_items);

        PageWindow {
            number,
            total_pages,
            start,
            end,
            has_prev: number > 1,
            has_next: number < total_pages,
        }
    }
}

/// One page of an index listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    pub number: usize,
    pub total_pages: usize,
    #[serde(skip)]
    pub start: usize,
    #[serde(skip)]
    pub end: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

impl PageWindow {
    /// Slice the items that fall on this page.
    #[must_use]
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.start.min(items.len())..self.end.min(items.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_path_normalization() {
        assert_eq!(UrlTopology::new("").base_path(), "/");
        assert_eq!(UrlTopology::new("/").base_path(), "/");
        assert_eq!(UrlTopology::new("docs").base_path(), "/docs/");
        assert_eq!(UrlTopology::new("/docs/").base_path(), "/docs/");
        assert_eq!(UrlTopology::new(" /a/b ").base_path(), "/a/b/");
    }

    #[test]
    fn test_content_url() {
        let urls = UrlTopology::new("/");
        assert_eq!(urls.content_url("", "hello-ab12"), "/hello-ab12/");
        assert_eq!(urls.content_url("blog", "hello-ab12"), "/blog/hello-ab12/");

        let urls = UrlTopology::new("site");
        assert_eq!(urls.content_url("/blog/", "x-1"), "/site/blog/x-1/");
    }

    #[test]
    fn test_pagination_url() {
        let urls = UrlTopology::new("/");
        assert_eq!(urls.pagination_url("", 1), "/");
        assert_eq!(urls.pagination_url("", 2), "/page/2/");
        assert_eq!(urls.pagination_url("news", 1), "/news/");
        assert_eq!(urls.pagination_url("news", 3), "/news/page/3/");
    }

    #[test]
    fn test_output_paths() {
        let urls = UrlTopology::new("/ignored/");
        assert_eq!(
            urls.content_output("blog", "a-1"),
            PathBuf::from("blog/a-1/index.html")
        );
        assert_eq!(urls.index_output("", 1), PathBuf::from("index.html"));
        assert_eq!(
            urls.index_output("blog", 2),
            PathBuf::from("blog/page/2/index.html")
        );
        assert_eq!(
            urls.author_output("jane"),
            PathBuf::from("authors/jane/index.html")
        );
        assert_eq!(urls.author_url("jane"), "/ignored/authors/jane/");
    }

    #[test]
    fn test_output_paths_stay_inside() {
        let urls = UrlTopology::new("/");
        assert_eq!(
            urls.content_output("../../escaped", "hi-a1"),
            PathBuf::from("escaped/hi-a1/index.html")
        );
        assert_eq!(
            urls.index_output("docs/./..", 1),
            PathBuf::from("docs/index.html")
        );
    }

    #[test]
    fn test_asset_path_depth() {
        assert_eq!(asset_path(""), "../");
        assert_eq!(asset_path("blog"), "../");
        assert_eq!(asset_path("blog/post-1"), "../../");
        assert_eq!(asset_path("/a/b/c/"), "../../../");
    }

    #[test]
    fn test_pagination_empty() {
        let pager = Paginator::new(0, 9);
        assert_eq!(pager.total_pages(), 1);
        let page = pager.page(1);
        assert!(!page.has_prev);
        assert!(!page.has_next);
        assert_eq!(page.slice::<u8>(&[]).len(), 0);
    }

    #[test]
    fn test_pagination_boundaries() {
        let items: Vec<usize> = (0..10).collect();
        let pager = Paginator::new(items.len(), 9);
        assert_eq!(pager.total_pages(), 2);

        let first = pager.page(1);
        assert_eq!(first.slice(&items).len(), 9);
        assert!(first.has_next);
        assert!(!first.has_prev);

        let second = pager.page(2);
        assert_eq!(second.slice(&items), &[9]);
        assert!(!second.has_next);
        assert!(second.has_prev);
    }

    #[test]
    fn test_exact_multiple() {
        assert_eq!(Paginator::new(18, 9).total_pages(), 2);
        assert_eq!(Paginator::new(19, 9).total_pages(), 3);
        assert_eq!(Paginator::new(5, 0).total_pages(), 5);
    }
}
