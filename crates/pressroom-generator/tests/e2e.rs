//! End-to-end generation tests.
//!
//! These tests build small sites from snapshot documents and inspect the
//! generated tree.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use chrono::{TimeZone, Utc};
use pressroom_core::{SiteSnapshot, SiteWorkspace};
use pressroom_generator::{Builder, GenerationContext, GenerationReport};
use tempfile::TempDir;
use walkdir::WalkDir;

fn context() -> GenerationContext {
    GenerationContext {
        now: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    }
}

fn generate(snapshot: &SiteSnapshot, root: &Path) -> GenerationReport {
    Builder::new(snapshot, SiteWorkspace::new(root))
        .with_context(context())
        .build()
        .expect("generation")
}

/// Relative path to file bytes for every file in a tree.
fn read_tree(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

const BLOG: &str = r#"
site:
  id: 1
  slug: acme
  name: Acme
sections:
  - { id: 1, site_id: 1, name: Home, path: "/" }
  - { id: 2, site_id: 1, name: Guides, path: guides }
  - { id: 3, site_id: 1, name: News, path: news }
tags:
  - { id: 1, site_id: 1, name: Rust, slug: rust }
contents:
  - { id: 1, site_id: 1, section_id: 2, short_id: a, kind: article, heading: Alpha, body: "A", tag_ids: [1], published_at: "2024-01-01T00:00:00Z", updated_at: "2024-01-01T00:00:00Z" }
  - { id: 2, site_id: 1, section_id: 2, short_id: b, kind: article, heading: Beta, body: "B", tag_ids: [1], published_at: "2024-01-02T00:00:00Z", updated_at: "2024-01-02T00:00:00Z" }
  - { id: 3, site_id: 1, section_id: 2, short_id: c, kind: blog, heading: Gamma, body: "C", tag_ids: [1], published_at: "2024-01-03T00:00:00Z", updated_at: "2024-01-03T00:00:00Z" }
  - { id: 4, site_id: 1, section_id: 3, short_id: d, kind: article, heading: Delta, body: "D", tag_ids: [1], published_at: "2024-01-04T00:00:00Z", updated_at: "2024-01-04T00:00:00Z" }
  - { id: 5, site_id: 1, section_id: 3, short_id: e, heading: Draft, draft: true, body: "E", published_at: "2024-01-05T00:00:00Z", updated_at: "2024-01-05T00:00:00Z" }
  - { id: 6, site_id: 1, section_id: 3, short_id: f, heading: Future, body: "F", published_at: "2030-01-01T00:00:00Z", updated_at: "2024-01-05T00:00:00Z" }
  - { id: 7, site_id: 1, section_id: 3, short_id: g, heading: Hidden, body: "G", published_at: "2024-01-06T00:00:00Z", updated_at: "2024-01-06T00:00:00Z", meta: { sitemap: exclude } }
settings:
  - { ref_key: ssg.site.base_url, value: "https://acme.example" }
  - { ref_key: ssg.blocks.multisection, value: "true" }
  - { ref_key: ssg.blocks.maxitems, value: "2" }
"#;

#[test]
fn test_generation_is_idempotent() {
    let snapshot = SiteSnapshot::from_yaml_str(BLOG).unwrap();
    let dir = TempDir::new().unwrap();

    generate(&snapshot, dir.path());
    let first = read_tree(&dir.path().join("html"));

    generate(&snapshot, dir.path());
    let second = read_tree(&dir.path().join("html"));

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_related_blocks_follow_tiers() {
    let snapshot = SiteSnapshot::from_yaml_str(BLOG).unwrap();
    let dir = TempDir::new().unwrap();
    generate(&snapshot, dir.path());

    let alpha = fs::read_to_string(dir.path().join("html/guides/alpha-a/index.html")).unwrap();
    let related = &alpha[alpha.find("class=\"related\"").expect("related block")..];

    // Same family first, then the other family; maxitems=2 stops before other sections.
    let beta = related.find("/guides/beta-b/").expect("beta");
    let gamma = related.find("/guides/gamma-c/").expect("gamma");
    assert!(beta < gamma);
    assert!(!related.contains("/news/delta-d/"));
}

#[test]
fn test_sitemap_exclusions() {
    let snapshot = SiteSnapshot::from_yaml_str(BLOG).unwrap();
    let dir = TempDir::new().unwrap();
    generate(&snapshot, dir.path());

    let xml = fs::read_to_string(dir.path().join("html/sitemap.xml")).unwrap();
    assert!(xml.contains("<loc>https://acme.example/guides/alpha-a/</loc>"));
    assert!(xml.contains("<loc>https://acme.example/news/delta-d/</loc>"));
    assert!(xml.contains("<lastmod>2024-01-04</lastmod>"));
    assert!(!xml.contains("draft-e"));
    assert!(!xml.contains("future-f"));
    assert!(!xml.contains("hidden-g"));

    // Future content is still rendered as a page, only kept out of the sitemap.
    assert!(dir.path().join("html/news/future-f/index.html").exists());
    assert!(!dir.path().join("html/news/draft-e").exists());
}

const SERIES: &str = r#"
site: { id: 1, slug: docs }
sections:
  - { id: 1, site_id: 1, name: Course, path: course }
contents:
  - { id: 1, site_id: 1, section_id: 1, short_id: p3, heading: Part Three, series: intro, series_order: 3 }
  - { id: 2, site_id: 1, section_id: 1, short_id: p1, heading: Part One, series: intro, series_order: 1 }
  - { id: 3, site_id: 1, section_id: 1, short_id: p2, heading: Part Two, series: intro, series_order: 2 }
"#;

#[test]
fn test_series_navigation_rendered() {
    let snapshot = SiteSnapshot::from_yaml_str(SERIES).unwrap();
    let dir = TempDir::new().unwrap();
    let report = generate(&snapshot, dir.path());
    assert!(report.errors.is_empty(), "{:?}", report.errors);

    let page =
        fs::read_to_string(dir.path().join("html/course/part-two-p2/index.html")).unwrap();
    assert!(page.contains(r#"<a class="prev" href="/course/part-one-p1/">"#));
    assert!(page.contains(r#"<a class="next" href="/course/part-three-p3/">"#));
}

fn paged_snapshot(count: usize, page_size: Option<usize>) -> SiteSnapshot {
    let mut yaml = String::from(
        "site: { id: 1, slug: paged }\nsections:\n  - { id: 1, site_id: 1, name: Blog, path: blog }\ncontents:",
    );
    if count == 0 {
        yaml.push_str(" []");
    }
    yaml.push('\n');
    for i in 0..count {
        yaml.push_str(&format!(
            "  - {{ id: {id}, site_id: 1, section_id: 1, short_id: x{id}, heading: Post, published_at: \"2024-01-{day:02}T00:00:00Z\" }}\n",
            id = i + 1,
            day = i + 1,
        ));
    }
    if let Some(size) = page_size {
        yaml.push_str(&format!(
            "settings:\n  - {{ ref_key: ssg.index.maxitems, value: \"{size}\" }}\n"
        ));
    }
    SiteSnapshot::from_yaml_str(&yaml).unwrap()
}

#[test]
fn test_pagination_pages() {
    let dir = TempDir::new().unwrap();
    let report = generate(&paged_snapshot(10, None), dir.path());
    let html = dir.path().join("html");

    // Main index and blog index, two pages each.
    assert_eq!(report.index_pages, 4);
    assert!(html.join("blog/index.html").exists());
    assert!(html.join("blog/page/2/index.html").exists());
    assert!(!html.join("blog/page/3").exists());
    assert!(html.join("page/2/index.html").exists());

    let first = fs::read_to_string(html.join("blog/index.html")).unwrap();
    assert_eq!(first.matches("class=\"listing-item").count(), 9);
    assert!(first.contains(r#"<a class="next" href="/blog/page/2/">"#));
    assert!(!first.contains("class=\"prev\""));

    let second = fs::read_to_string(html.join("blog/page/2/index.html")).unwrap();
    assert_eq!(second.matches("class=\"listing-item").count(), 1);
    assert!(second.contains(r#"<a class="prev" href="/blog/">"#));
}

#[test]
fn test_empty_site_still_has_index() {
    let dir = TempDir::new().unwrap();
    let report = generate(&paged_snapshot(0, Some(3)), dir.path());

    assert_eq!(report.pages_generated, 0);
    assert_eq!(report.index_pages, 1);
    let index = fs::read_to_string(dir.path().join("html/index.html")).unwrap();
    assert!(index.contains("Nothing published yet."));
    assert!(!index.contains("class=\"pagination\""));
}

const LAYOUTS: &str = r#"
site: { id: 1, slug: themed, default_layout_id: 20 }
sections:
  - { id: 1, site_id: 1, name: Broken, path: broken, layout_id: 10 }
  - { id: 2, site_id: 1, name: Plain, path: plain }
layouts:
  - { id: 10, site_id: 1, name: broken, code: "{% for x in %}<oops>" }
  - { id: 20, site_id: 1, name: default, code: "<div class=\"site-default\">{% block content %}{% endblock content %}</div>" }
contents:
  - { id: 1, site_id: 1, section_id: 1, short_id: a1, heading: In Broken }
  - { id: 2, site_id: 1, section_id: 2, short_id: b2, heading: In Plain }
"#;

#[test]
fn test_broken_layout_falls_back_to_site_default() {
    let snapshot = SiteSnapshot::from_yaml_str(LAYOUTS).unwrap();
    let dir = TempDir::new().unwrap();
    let report = generate(&snapshot, dir.path());

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(report.pages_generated, 2);

    let broken = fs::read_to_string(dir.path().join("html/broken/in-broken-a1/index.html")).unwrap();
    let plain = fs::read_to_string(dir.path().join("html/plain/in-plain-b2/index.html")).unwrap();
    assert!(broken.starts_with("<div class=\"site-default\">"));
    assert!(plain.starts_with("<div class=\"site-default\">"));
    assert!(broken.contains("<h1>In Broken</h1>"));
}

#[test]
fn test_broken_default_layout_falls_back_to_builtin() {
    let yaml = LAYOUTS.replace("<div class=\\\"site-default\\\">{% block content %}", "{{ oops");
    let snapshot = SiteSnapshot::from_yaml_str(&yaml).unwrap();
    let dir = TempDir::new().unwrap();
    let report = generate(&snapshot, dir.path());

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    let page = fs::read_to_string(dir.path().join("html/broken/in-broken-a1/index.html")).unwrap();
    assert!(page.starts_with("<!DOCTYPE html>"));
    assert!(page.contains("<h1>In Broken</h1>"));
}

#[test]
fn test_render_failure_is_recorded_per_item() {
    let yaml = LAYOUTS.replace(
        "<div class=\\\"site-default\\\">",
        "<div class=\\\"site-default\\\">{{ add(a=content.heading, b=1) }}",
    );
    let snapshot = SiteSnapshot::from_yaml_str(&yaml).unwrap();
    let dir = TempDir::new().unwrap();
    let report = generate(&snapshot, dir.path());

    // Every page using the default layout fails to render, the run still completes.
    assert_eq!(report.pages_generated, 0);
    assert!(report.errors.iter().any(|e| e.subject == "content:1"));
    assert!(report.errors.iter().any(|e| e.subject == "content:2"));
    assert!(dir.path().join("html/sitemap.xml").exists());
}

#[test]
fn test_author_pages() {
    let yaml = r#"
site: { id: 1, slug: people }
sections:
  - { id: 1, site_id: 1, name: Home, path: "/" }
contributors:
  - { id: 7, site_id: 1, handle: jane, name: Jane, surname: Doe, bio: "Editor", photo_path: profiles/jane.png }
  - { id: 8, site_id: 1, handle: quiet }
users:
  - { username: guest, name: Guest Writer }
contents:
  - { id: 1, site_id: 1, section_id: 1, short_id: a, heading: By Ref, contributor_id: 7 }
  - { id: 2, site_id: 1, section_id: 1, short_id: b, heading: By Handle, author_username: jane }
  - { id: 3, site_id: 1, section_id: 1, short_id: c, heading: By Guest, author_username: guest }
"#;
    let snapshot = SiteSnapshot::from_yaml_str(yaml).unwrap();
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("profiles")).unwrap();
    fs::write(dir.path().join("profiles/jane.png"), b"png").unwrap();

    let report = generate(&snapshot, dir.path());
    let html = dir.path().join("html");

    assert_eq!(report.author_pages, 3);
    assert!(html.join("profiles/jane.png").exists());

    let jane = fs::read_to_string(html.join("authors/jane/index.html")).unwrap();
    assert!(jane.contains("<h1>Jane Doe</h1>"));
    assert!(jane.contains("/by-ref-a/"));
    assert!(jane.contains("/by-handle-b/"));
    assert!(!jane.contains("/by-guest-c/"));

    let quiet = fs::read_to_string(html.join("authors/quiet/index.html")).unwrap();
    assert!(quiet.contains("Published: 0"));

    let guest = fs::read_to_string(html.join("authors/guest/index.html")).unwrap();
    assert!(guest.contains("<h1>Guest Writer</h1>"));
    assert!(guest.contains("/by-guest-c/"));
}

#[test]
fn test_demo_snapshot_builds() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/acme.yaml");
    let snapshot = SiteSnapshot::load(&path).unwrap();
    let dir = TempDir::new().unwrap();
    let report = generate(&snapshot, dir.path());
    let html = dir.path().join("html");

    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(report.pages_generated, 4);
    assert_eq!(report.author_pages, 2);

    let guide = fs::read_to_string(html.join("guides/getting-started-k3x9/index.html")).unwrap();
    assert!(guide.contains("Built 2024-06-01"));
    assert!(guide.contains("https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ"));
    assert!(guide.contains(r#"<a class="next" href="/guides/going-further-p7q2/">"#));

    let sitemap = fs::read_to_string(html.join("sitemap.xml")).unwrap();
    assert!(!sitemap.contains("about-a0b0"));
    assert!(!sitemap.contains("upcoming-plans"));
}

const ESCAPING: &str = r#"
site: { id: 1, slug: acme }
sections:
  - { id: 1, site_id: 1, name: Home, path: "/" }
  - { id: 2, site_id: 1, name: Escaped, path: "../../escaped" }
  - { id: 3, site_id: 1, name: Blog, path: blog }
contents:
  - { id: 1, site_id: 1, section_id: 2, short_id: a1, heading: Hi, published_at: "2024-01-01T00:00:00Z" }
  - { id: 2, site_id: 1, section_id: 3, short_id: b2, heading: Fine, published_at: "2024-01-02T00:00:00Z" }
"#;

#[test]
fn test_section_path_cannot_leave_output() {
    let snapshot = SiteSnapshot::from_yaml_str(ESCAPING).unwrap();
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("ws/acme");
    let report = generate(&snapshot, &root);

    assert_eq!(report.errors.len(), 1, "{:?}", report.errors);
    assert_eq!(report.errors[0].subject, "section:2");
    assert_eq!(report.pages_generated, 1);

    let html = root.join("html");
    for path in read_tree(dir.path()).keys() {
        assert!(dir.path().join(path).starts_with(&html), "{} escaped", path.display());
    }
    assert!(html.join("blog/fine-b2/index.html").exists());

    let index = fs::read_to_string(html.join("index.html")).unwrap();
    assert!(!index.contains("escaped"));
    let sitemap = fs::read_to_string(html.join("sitemap.xml")).unwrap();
    assert!(!sitemap.contains("escaped"));
}
