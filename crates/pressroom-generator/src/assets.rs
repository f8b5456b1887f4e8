//! Static asset copying.
//!
//! Copies the built-in stylesheet, an optional operator static directory,
//! uploaded images and profile photos into the output tree. A file that fails
//! to copy is reported and skipped; only an unreadable source root is an error.

use std::{
    collections::HashSet,
    fs,
    path::{Component, Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

const MAIN_CSS: &str = include_str!("../static/css/main.css");

/// Directory of static assets inside the output tree.
pub const STATIC_DIR: &str = "static";

/// Asset processing errors.
#[derive(Debug, Error)]
pub enum AssetError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// Invalid asset path.
    #[error("invalid asset path: {0}")]
    InvalidPath(PathBuf),
}

/// Result type for asset operations.
pub type Result<T> = std::result::Result<T, AssetError>;

/// Outcome of a copy step.
#[derive(Debug, Default)]
pub struct AssetReport {
    /// Files copied.
    pub copied: usize,

    /// Files that could not be copied.
    pub failures: Vec<(PathBuf, AssetError)>,
}

impl AssetReport {
    fn merge(&mut self, other: AssetReport) {
        self.copied += other.copied;
        self.failures.extend(other.failures);
    }
}

/// Copies assets into an output directory.
#[derive(Debug, Clone)]
pub struct AssetProcessor {
    output_dir: PathBuf,
}

impl AssetProcessor {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write the embedded stylesheet to `static/css/main.css`.
    pub fn write_builtin(&self) -> Result<usize> {
        let dest = self.output_dir.join(STATIC_DIR).join("css").join("main.css");
        write_file(&dest, MAIN_CSS.as_bytes())?;
        Ok(1)
    }

    /// Recursively copy `source_dir` to `<output>/<target>`, skipping hidden entries.
    ///
    /// A missing source directory copies nothing.
    pub fn copy_tree(&self, source_dir: &Path, target: &str) -> Result<AssetReport> {
        let mut report = AssetReport::default();
        if !source_dir.exists() {
            debug!(dir = %source_dir.display(), "asset directory does not exist, skipping");
            return Ok(report);
        }

        let dest_root = self.output_dir.join(target);
        fs::create_dir_all(&dest_root)?;

        let walker = WalkDir::new(source_dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    report.failures.push((path, e.into()));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(source_dir) else {
                report.failures.push((
                    entry.path().to_path_buf(),
                    AssetError::InvalidPath(entry.path().to_path_buf()),
                ));
                continue;
            };

            match copy_file(entry.path(), &dest_root.join(relative)) {
                Ok(()) => report.copied += 1,
                Err(e) => report.failures.push((entry.path().to_path_buf(), e)),
            }
        }

        info!(
            source = %source_dir.display(),
            copied = report.copied,
            failed = report.failures.len(),
            "copied assets"
        );
        Ok(report)
    }

    /// Copy profile photos, each path once.
    ///
    /// Paths are relative to `workspace`; a photo that does not exist is skipped.
    pub fn copy_photos<'p>(
        &self,
        workspace: &Path,
        photos: impl IntoIterator<Item = &'p str>,
    ) -> AssetReport {
        let mut report = AssetReport::default();
        let mut seen = HashSet::new();

        for photo in photos {
            let relative = photo.trim().trim_start_matches('/');
            if relative.is_empty() || !seen.insert(relative.to_string()) {
                continue;
            }

            let relative_path = Path::new(relative);
            if !is_contained(relative_path) {
                report.failures.push((
                    relative_path.to_path_buf(),
                    AssetError::InvalidPath(relative_path.to_path_buf()),
                ));
                continue;
            }

            let source = workspace.join(relative_path);
            if !source.is_file() {
                debug!(photo = relative, "profile photo not found, skipping");
                continue;
            }

            match copy_file(&source, &self.output_dir.join(relative_path)) {
                Ok(()) => report.copied += 1,
                Err(e) => report.failures.push((source, e)),
            }
        }

        report
    }

    /// Copy several trees and merge their reports.
    ///
    /// An unreadable root is recorded as a failure of that tree.
    pub fn copy_trees<'s>(
        &self,
        trees: impl IntoIterator<Item = (&'s Path, &'s str)>,
    ) -> AssetReport {
        let mut report = AssetReport::default();
        for (source, target) in trees {
            match self.copy_tree(source, target) {
                Ok(tree) => report.merge(tree),
                Err(e) => report.failures.push((source.to_path_buf(), e)),
            }
        }
        report
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Whether a relative path stays inside its root.
fn is_contained(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}

fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    Ok(())
}

fn write_file(dest: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(dest, bytes)?;
    Ok(())
}
