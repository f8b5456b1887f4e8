//! Build orchestration.
//!
//! Coordinates a full site generation: assets, content pages, paginated
//! indexes, author pages, then the sitemap and `CNAME`.

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    fmt, fs,
    path::{Path, PathBuf},
    time::Instant,
};

use chrono::{DateTime, Utc};
use pressroom_core::{Content, ContentKind, PipelineSettings, Section, SiteSnapshot, SiteWorkspace};
use pressroom_parser::{ContentProcessor, MarkdownProcessor};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    assets::{AssetProcessor, AssetReport},
    authors::{AuthorDirectory, AuthorSubject},
    blocks::BlocksEngine,
    page::{
        AuthorLink, AuthorView, BlocksView, ContentView, MenuItem, PageData, PageKind,
        PaginationView, RenderedContent, SectionView, SiteView,
    },
    sitemap::{SitemapBuilder, generate_cname},
    template::{
        AUTHOR_TEMPLATE, CONTENT_TEMPLATE, INDEX_TEMPLATE, TemplateError, TemplateResolver,
        context_from,
    },
    urls::{Paginator, UrlTopology, asset_path},
};

/// Build errors that abort a whole run.
#[derive(Debug, Error)]
pub enum BuildError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Template error.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// A recoverable failure recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationError {
    /// What failed, e.g. `content:12` or `asset:images/a.png`.
    pub subject: String,
    pub message: String,
}

impl GenerationError {
    pub fn new(subject: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            subject: subject.into(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.subject, self.message)
    }
}

/// Outcome of a generation run.
#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    /// Content pages written.
    pub pages_generated: usize,

    /// Index pages written, all paginations included.
    pub index_pages: usize,

    /// Author pages written.
    pub author_pages: usize,

    /// Asset files copied.
    pub assets_copied: usize,

    /// Recoverable failures.
    pub errors: Vec<GenerationError>,

    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

impl GenerationReport {
    fn record(&mut self, subject: impl Into<String>, message: impl fmt::Display) {
        let error = GenerationError::new(subject, message);
        warn!(subject = %error.subject, error = %error.message, "generation step failed");
        self.errors.push(error);
    }

    fn absorb_assets(&mut self, report: AssetReport) {
        self.assets_copied += report.copied;
        for (path, e) in report.failures {
            self.record(format!("asset:{}", path.display()), e);
        }
    }
}

/// Per-run inputs that are not part of the site records.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext {
    /// Instant the run happens at; drives `now()` and sitemap eligibility.
    pub now: DateTime<Utc>,
}

impl Default for GenerationContext {
    fn default() -> Self {
        Self { now: Utc::now() }
    }
}

/// Site builder that orchestrates the generation process.
pub struct Builder<'a> {
    snapshot: &'a SiteSnapshot,
    workspace: SiteWorkspace,
    processor: Box<dyn ContentProcessor + 'a>,
    static_dir: Option<PathBuf>,
    context: GenerationContext,
}

impl<'a> Builder<'a> {
    /// Create a builder writing into `workspace`.
    #[must_use]
    pub fn new(snapshot: &'a SiteSnapshot, workspace: SiteWorkspace) -> Self {
        Self {
            snapshot,
            workspace,
            processor: Box::new(MarkdownProcessor::new()),
            static_dir: None,
            context: GenerationContext::default(),
        }
    }

    /// Set an extra static assets directory copied over the built-in ones.
    #[must_use]
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Replace the body processor.
    #[must_use]
    pub fn with_processor(mut self, processor: impl ContentProcessor + 'a) -> Self {
        self.processor = Box::new(processor);
        self
    }

    /// Pin the run instant.
    #[must_use]
    pub fn with_context(mut self, context: GenerationContext) -> Self {
        self.context = context;
        self
    }

    /// Output directory of this site.
    pub fn output_dir(&self) -> PathBuf {
        self.workspace.html_dir()
    }

    /// Execute the full generation.
    ///
    /// Only a broken built-in template set fails the run; everything else is
    /// recorded in the report.
    pub fn build(&self) -> Result<GenerationReport> {
        let start = Instant::now();
        let snapshot = self.snapshot;
        let settings = snapshot.pipeline_settings();
        let now = self.context.now;
        let output_dir = self.output_dir();

        let mut resolver = TemplateResolver::new(
            &snapshot.layouts,
            &snapshot.sections,
            snapshot.site.default_layout_id,
            now,
        )?;

        info!(
            site = %snapshot.site.slug,
            output = %output_dir.display(),
            "starting generation"
        );

        let mut report = GenerationReport::default();
        let users = snapshot.user_authors();
        let authors = AuthorDirectory::new(&snapshot.contributors, &users);
        let subjects = authors.subjects(&snapshot.contents);

        // 1. Output directory and assets
        if let Err(e) = clean_output(&output_dir) {
            report.record("output", e);
        }
        self.copy_assets(&output_dir, &subjects, &mut report);

        // 2. Shared page parts
        let mut blocked = HashSet::new();
        for section in snapshot.sections.iter().filter(|s| !s.has_safe_path()) {
            warn!(section = section.id, path = %section.path, "section path leaves the output directory");
            report.record(
                format!("section:{}", section.id),
                format!("path {:?} leaves the output directory", section.path),
            );
            blocked.insert(section.id);
        }

        let urls = UrlTopology::new(&settings.base_path);
        let sections: HashMap<i64, &Section> = snapshot
            .sections
            .iter()
            .filter(|s| !blocked.contains(&s.id))
            .map(|s| (s.id, s))
            .collect();
        let site = SiteView::from(&snapshot.site);
        let menu: Vec<MenuItem> = snapshot
            .sections
            .iter()
            .filter(|s| !s.is_root() && !blocked.contains(&s.id))
            .map(|s| MenuItem {
                name: s.name.clone(),
                url: urls.section_url(s.normalized_path()),
            })
            .collect();
        let root_section = snapshot.sections.iter().find(|s| s.is_root()).map(|s| s.id);

        let pass = PagePass {
            output_dir: &output_dir,
            urls: &urls,
            site: &site,
            menu: &menu,
            authors: &authors,
            now,
        };

        // 3. Pre-render bodies once
        let rendered = self.prerender(&sections, &blocked, &urls, &mut report);

        // 4. Content pages
        let engine = BlocksEngine::new(settings.blocks.clone());
        for item in &rendered {
            let section = sections.get(&item.content.section_id).copied();
            match pass.content_page(&mut resolver, &engine, item, section, &rendered) {
                Ok(()) => report.pages_generated += 1,
                Err(e) => report.record(format!("content:{}", item.id()), e),
            }
        }

        // 5. Indexes
        self.index_pages(&pass, &mut resolver, &settings, &rendered, root_section, &mut report);

        // 6. Author pages
        for subject in &subjects {
            let key = subject.key();
            if key.is_empty() {
                report.record("author", format!("{:?} has no usable page key", subject.display_name()));
                continue;
            }
            match pass.author_page(&mut resolver, subject, &rendered) {
                Ok(()) => report.author_pages += 1,
                Err(e) => report.record(format!("author:{key}"), e),
            }
        }

        // 7. Sitemap and CNAME
        let sitemap = SitemapBuilder::new(&settings.base_url, &settings.base_path);
        if let Err(e) = sitemap.write(&output_dir, &snapshot.contents, &snapshot.sections, now) {
            report.record("sitemap", e);
        }
        if let Err(e) = generate_cname(&output_dir, &settings.base_url) {
            report.record("cname", e);
        }

        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            site = %snapshot.site.slug,
            pages = report.pages_generated,
            index_pages = report.index_pages,
            author_pages = report.author_pages,
            assets = report.assets_copied,
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "generation complete"
        );

        Ok(report)
    }

    fn copy_assets(&self, output_dir: &Path, subjects: &[AuthorSubject<'_>], report: &mut GenerationReport) {
        let assets = AssetProcessor::new(output_dir);

        match assets.write_builtin() {
            Ok(n) => report.assets_copied += n,
            Err(e) => report.record("asset:static", e),
        }

        let images = self.workspace.images_dir();
        let mut trees: Vec<(&Path, &str)> = Vec::new();
        if let Some(dir) = &self.static_dir {
            trees.push((dir.as_path(), crate::assets::STATIC_DIR));
        }
        trees.push((images.as_path(), "images"));
        report.absorb_assets(assets.copy_trees(trees));

        let photos = subjects.iter().filter_map(AuthorSubject::photo_path);
        report.absorb_assets(assets.copy_photos(self.workspace.root(), photos));
    }

    fn prerender<'s>(
        &'s self,
        sections: &HashMap<i64, &Section>,
        blocked: &HashSet<i64>,
        urls: &UrlTopology,
        report: &mut GenerationReport,
    ) -> Vec<RenderedContent<'s>> {
        let mut rendered = Vec::new();

        for content in self.snapshot.contents.iter().filter(|c| !c.draft) {
            if blocked.contains(&content.section_id) {
                debug!(content = content.id, section = content.section_id, "skipping content of blocked section");
                continue;
            }
            let section_path = sections
                .get(&content.section_id)
                .map(|s| s.normalized_path().to_string())
                .unwrap_or_else(|| {
                    debug!(content = content.id, section = content.section_id, "unknown section, using root");
                    String::new()
                });

            match self.processor.process(content) {
                Ok(html) => rendered.push(RenderedContent {
                    content,
                    html,
                    url: urls.content_url(&section_path, &content.slug()),
                    section_path,
                }),
                Err(e) => report.record(format!("content:{}", content.id), e),
            }
        }

        debug!(count = rendered.len(), "pre-rendered content");
        rendered
    }

    fn index_pages(
        &self,
        pass: &PagePass<'_>,
        resolver: &mut TemplateResolver<'_>,
        settings: &PipelineSettings,
        rendered: &[RenderedContent<'_>],
        root_section: Option<i64>,
        report: &mut GenerationReport,
    ) {
        let mut listed: Vec<&RenderedContent<'_>> = rendered
            .iter()
            .filter(|r| r.content.kind != ContentKind::Page)
            .collect();
        listed.sort_by(|a, b| newest_first(a.content, b.content));

        let title = self.snapshot.site.display_name().to_string();
        let (count, errors) =
            pass.index(resolver, root_section, None, &title, &listed, settings.index_page_size);
        report.index_pages += count;
        for (subject, e) in errors {
            report.record(subject, e);
        }

        for section in self
            .snapshot
            .sections
            .iter()
            .filter(|s| !s.is_root() && s.has_safe_path())
        {
            let items: Vec<&RenderedContent<'_>> = listed
                .iter()
                .copied()
                .filter(|r| r.content.section_id == section.id)
                .collect();
            if items.is_empty() {
                continue;
            }

            let (count, errors) = pass.index(
                resolver,
                Some(section.id),
                Some(section),
                &section.name,
                &items,
                settings.index_page_size,
            );
            report.index_pages += count;
            for (subject, e) in errors {
                report.record(subject, e);
            }
        }
    }
}

/// Shared state for writing pages during one run.
struct PagePass<'p> {
    output_dir: &'p Path,
    urls: &'p UrlTopology,
    site: &'p SiteView,
    menu: &'p [MenuItem],
    authors: &'p AuthorDirectory<'p>,
    now: DateTime<Utc>,
}

impl PagePass<'_> {
    fn page_data(&self, kind: PageKind, title: &str, asset_path: String) -> PageData {
        PageData::new(
            kind,
            title,
            self.site,
            self.menu,
            self.urls.base_path(),
            asset_path,
            self.now,
        )
    }

    fn author_link(&self, content: &Content) -> Option<AuthorLink> {
        let subject = self.authors.attribute(content)?;
        let key = subject.key();
        (!key.is_empty()).then(|| AuthorLink {
            name: subject.display_name(),
            url: self.urls.author_url(&key),
        })
    }

    fn view(&self, item: &RenderedContent<'_>) -> ContentView {
        ContentView::new(item, self.author_link(item.content))
    }

    fn content_page(
        &self,
        resolver: &mut TemplateResolver<'_>,
        engine: &BlocksEngine,
        item: &RenderedContent<'_>,
        section: Option<&Section>,
        rendered: &[RenderedContent<'_>],
    ) -> Result<()> {
        let slug = item.content.slug();
        let page_dir = format!("{}/{slug}", item.section_path);

        let mut data = self.page_data(PageKind::Content, &item.content.heading, asset_path(&page_dir));
        data.content = Some(self.view(item));
        data.section = section.map(|s| SectionView::new(s, self.urls));
        data.blocks = Some(BlocksView::from(&engine.build(item, rendered)));

        let template = resolver.resolve(Some(item.content.section_id));
        let html = template.render(CONTENT_TEMPLATE, &context_from(&data)?)?;
        write_page(self.output_dir, &self.urls.content_output(&item.section_path, &slug), &html)
    }

    /// Write every page of one index; returns pages written and per-page failures.
    fn index(
        &self,
        resolver: &mut TemplateResolver<'_>,
        layout_section: Option<i64>,
        section: Option<&Section>,
        title: &str,
        items: &[&RenderedContent<'_>],
        page_size: usize,
    ) -> (usize, Vec<(String, BuildError)>) {
        let section_path = section.map(Section::normalized_path).unwrap_or("");
        let pager = Paginator::new(items.len(), page_size);
        let mut written = 0;
        let mut errors = Vec::new();

        for number in 1..=pager.total_pages() {
            let window = pager.page(number);
            let result = (|| -> Result<()> {
                let mut data =
                    self.page_data(PageKind::Index, title, self.urls.base_path().to_string());
                data.section = section.map(|s| SectionView::new(s, self.urls));
                data.items = window.slice(items).iter().map(|r| self.view(r)).collect();
                data.pagination = Some(PaginationView::new(window, self.urls, section_path));

                let template = resolver.resolve(layout_section);
                let html = template.render(INDEX_TEMPLATE, &context_from(&data)?)?;
                write_page(self.output_dir, &self.urls.index_output(section_path, number), &html)
            })();

            match result {
                Ok(()) => written += 1,
                Err(e) => {
                    let path = if section_path.is_empty() { "/" } else { section_path };
                    errors.push((format!("index:{path}:{number}"), e));
                }
            }
        }

        (written, errors)
    }

    fn author_page(
        &self,
        resolver: &mut TemplateResolver<'_>,
        subject: &AuthorSubject<'_>,
        rendered: &[RenderedContent<'_>],
    ) -> Result<()> {
        let mut items: Vec<&RenderedContent<'_>> = rendered
            .iter()
            .filter(|r| self.authors.attribute(r.content).as_ref() == Some(subject))
            .collect();
        items.sort_by(|a, b| newest_first(a.content, b.content));

        let mut data = self.page_data(
            PageKind::Author,
            &subject.display_name(),
            self.urls.base_path().to_string(),
        );
        data.author = Some(AuthorView::new(subject, self.urls));
        data.items = items.iter().map(|r| self.view(r)).collect();

        let template = resolver.resolve(None);
        let html = template.render(AUTHOR_TEMPLATE, &context_from(&data)?)?;
        write_page(self.output_dir, &self.urls.author_output(&subject.key()), &html)
    }
}

/// Newest `published_at` first, undated last, ties by id.
fn newest_first(a: &Content, b: &Content) -> Ordering {
    match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => y.cmp(&x).then(a.id.cmp(&b.id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    }
}

/// Clean the output directory.
fn clean_output(output_dir: &Path) -> std::io::Result<()> {
    if output_dir.exists() {
        debug!(dir = %output_dir.display(), "cleaning output directory");
        fs::remove_dir_all(output_dir)?;
    }
    fs::create_dir_all(output_dir)
}

fn write_page(output_dir: &Path, relative: &Path, html: &str) -> Result<()> {
    let path = output_dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, html)?;
    debug!(path = %path.display(), "wrote page");
    Ok(())
}
