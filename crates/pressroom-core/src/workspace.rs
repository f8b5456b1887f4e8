//! Per-site workspace directory layout.

use std::path::{Path, PathBuf};

/// Directories owned by one site under the workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteWorkspace {
    root: PathBuf,
}

impl SiteWorkspace {
    /// Workspace rooted at `root` (usually `<workspace.root>/<site slug>`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Generated HTML tree, the publish source.
    pub fn html_dir(&self) -> PathBuf {
        self.root.join("html")
    }

    /// Exported content source records.
    pub fn content_dir(&self) -> PathBuf {
        self.root.join("content")
    }

    /// Uploaded images.
    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    /// Contributor and author photos.
    pub fn profiles_dir(&self) -> PathBuf {
        self.root.join("profiles")
    }

    /// Exported metadata documents.
    pub fn meta_dir(&self) -> PathBuf {
        self.root.join("meta")
    }

    /// Directories that make up a backup, paired with their name in the backup tree.
    pub fn backup_sources(&self) -> Vec<(PathBuf, &'static str)> {
        vec![
            (self.content_dir(), "content"),
            (self.images_dir(), "images"),
            (self.profiles_dir(), "profiles"),
            (self.meta_dir(), "meta"),
        ]
    }

    /// Resolve a workspace-relative path such as a photo reference.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative.trim_start_matches('/'))
    }
}
