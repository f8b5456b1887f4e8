//! Pressroom Generator Library
//!
//! Static site generation engine for Pressroom sites.
//!
//! # Modules
//!
//! - [`template`] - Tera templates with a section / site default / built-in override chain
//! - [`blocks`] - Related content and series navigation
//! - [`urls`] - URL topology, output paths and pagination
//! - [`authors`] - Author attribution and author page subjects
//! - [`page`] - Rendered content and template page data
//! - [`assets`] - Static asset, image and profile photo copying
//! - [`sitemap`] - XML sitemap and `CNAME` generation
//! - [`export`] - Content source export for backups
//! - [`build`] - Build orchestration

pub mod assets;
pub mod authors;
pub mod blocks;
pub mod build;
pub mod export;
pub mod page;
pub mod sitemap;
pub mod template;
pub mod urls;

pub use assets::{AssetError, AssetProcessor, AssetReport};
pub use authors::{AuthorDirectory, AuthorSubject};
pub use blocks::{BlocksEngine, GeneratedBlocks, SeriesNavigation};
pub use build::{BuildError, Builder, GenerationContext, GenerationError, GenerationReport};
pub use export::{ExportError, ExportStats, SourceExporter};
pub use page::{PageData, PageKind, RenderedContent};
pub use sitemap::{SitemapBuilder, SitemapError, generate_cname};
pub use template::{TemplateError, TemplateResolver, TemplateTier};
pub use urls::{PageWindow, Paginator, UrlTopology, asset_path};
