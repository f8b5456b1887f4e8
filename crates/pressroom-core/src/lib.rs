//! Pressroom Core Library
//!
//! Data model, typed site settings, snapshot loading and error handling shared
//! by the generation and publishing crates.

pub mod config;
pub mod error;
pub mod frontmatter;
pub mod model;
pub mod settings;
pub mod slug;
pub mod snapshot;
pub mod workspace;

pub use config::Config;
pub use error::{CoreError, Result};
pub use model::{
    Content, ContentKind, ContentMeta, Contributor, Layout, Section, Setting, Site, SiteMode, Tag,
    UserAuthor,
};
pub use settings::{BlocksConfig, CommitIdentity, PipelineSettings, RepoTarget};
pub use slug::slugify;
pub use snapshot::SiteSnapshot;
pub use workspace::SiteWorkspace;
