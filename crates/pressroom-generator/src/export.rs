//! Export of content source records for backups.
//!
//! Every content item, drafts included, becomes a markdown file with YAML
//! front matter under `content/`, and the structural records are dumped as
//! JSON under `meta/`.

use std::{collections::HashMap, fs, path::Path};

use pressroom_core::{
    CoreError, SiteSnapshot, SiteWorkspace,
    frontmatter::{Frontmatter, render_document},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// Directory used for content whose section is the root, unknown or has a
/// path leaving `content/`.
pub const ROOT_SECTION_DIR: &str = "_root";

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Front matter rendering error.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Counts of exported records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub contents: usize,
    pub meta_files: usize,
}

/// Writes source records into a site workspace.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceExporter;

impl SourceExporter {
    /// Replace `content/` and `meta/` with the records of `snapshot`.
    pub fn export(&self, workspace: &SiteWorkspace, snapshot: &SiteSnapshot) -> Result<ExportStats> {
        let content_dir = workspace.content_dir();
        let meta_dir = workspace.meta_dir();
        reset_dir(&content_dir)?;
        reset_dir(&meta_dir)?;

        let mut section_dirs: HashMap<i64, &str> = HashMap::new();
        for section in snapshot.sections.iter().filter(|s| !s.is_root()) {
            if section.has_safe_path() {
                section_dirs.insert(section.id, section.normalized_path());
            } else {
                warn!(section = section.id, path = %section.path, "unsafe section path, exporting under root");
            }
        }

        let mut stats = ExportStats::default();
        for content in &snapshot.contents {
            let section = section_dirs
                .get(&content.section_id)
                .copied()
                .unwrap_or(ROOT_SECTION_DIR);
            let path = content_dir
                .join(section)
                .join(format!("{}.md", content.slug()));

            let doc = render_document(&Frontmatter::from(content), &content.body)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, doc)?;
            stats.contents += 1;
        }

        write_json(&meta_dir.join("site.json"), &snapshot.site)?;
        write_json(&meta_dir.join("sections.json"), &snapshot.sections)?;
        write_json(&meta_dir.join("tags.json"), &snapshot.tags)?;
        write_json(&meta_dir.join("layouts.json"), &snapshot.layouts)?;
        write_json(&meta_dir.join("contributors.json"), &snapshot.contributors)?;
        stats.meta_files = 5;

        info!(
            site = %snapshot.site.slug,
            contents = stats.contents,
            "exported source records"
        );
        Ok(stats)
    }
}

fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pressroom_core::frontmatter::parse_document;
    use tempfile::TempDir;

    use super::*;

    const SNAPSHOT: &str = r#"
site:
  id: 1
  slug: acme
sections:
  - { id: 1, site_id: 1, name: Home, path: "/" }
  - { id: 2, site_id: 1, name: Docs, path: "docs/guides" }
tags:
  - { id: 5, site_id: 1, name: Rust, slug: rust }
contents:
  - id: 10
    site_id: 1
    section_id: 2
    short_id: ab12
    heading: Getting Started
    body: "Hello."
    tag_ids: [5]
  - id: 11
    site_id: 1
    section_id: 1
    short_id: cd34
    heading: Secret Plans
    draft: true
"#;

    #[test]
    fn test_export_tree() {
        let dir = TempDir::new().unwrap();
        let workspace = SiteWorkspace::new(dir.path());
        let snapshot = SiteSnapshot::from_yaml_str(SNAPSHOT).unwrap();

        fs::create_dir_all(workspace.content_dir().join("stale")).unwrap();
        fs::write(workspace.content_dir().join("stale/old.md"), "x").unwrap();

        let stats = SourceExporter.export(&workspace, &snapshot).unwrap();
        assert_eq!(stats.contents, 2);
        assert_eq!(stats.meta_files, 5);

        let guide = workspace
            .content_dir()
            .join("docs/guides/getting-started-ab12.md");
        let (fm, body) =
            parse_document(&fs::read_to_string(&guide).unwrap(), &guide).unwrap();
        assert_eq!(fm.title, "Getting Started");
        assert_eq!(fm.tags, vec!["rust"]);
        assert_eq!(body.trim(), "Hello.");

        assert!(
            workspace
                .content_dir()
                .join("_root/secret-plans-cd34.md")
                .exists()
        );
        assert!(!workspace.content_dir().join("stale").exists());

        let site: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(workspace.meta_dir().join("site.json")).unwrap())
                .unwrap();
        assert_eq!(site["slug"], "acme");
    }

    #[test]
    fn test_export_keeps_unsafe_section_inside() {
        let dir = TempDir::new().unwrap();
        let workspace = SiteWorkspace::new(dir.path().join("ws/acme"));
        let yaml = SNAPSHOT.replace("path: \"docs/guides\"", "path: \"../../escaped\"");
        let snapshot = SiteSnapshot::from_yaml_str(&yaml).unwrap();

        SourceExporter.export(&workspace, &snapshot).unwrap();

        assert!(
            workspace
                .content_dir()
                .join("_root/getting-started-ab12.md")
                .exists()
        );
        assert!(!dir.path().join("ws/escaped").exists());
        assert!(!dir.path().join("escaped").exists());
    }
}
