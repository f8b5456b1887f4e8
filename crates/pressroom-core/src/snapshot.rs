//! Site snapshots: the full record set for one site in a single document.
//!
//! The admin layer is the usual producer of these records. For command-line
//! runs they come from a YAML or JSON file instead.

use std::{collections::HashMap, path::Path};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{CoreError, Result},
    model::{Content, Contributor, Layout, Section, Setting, Site, Tag, UserAuthor},
    settings::PipelineSettings,
};

/// Every record the pipeline needs for one site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteSnapshot {
    pub site: Site,

    #[serde(default)]
    pub sections: Vec<Section>,

    #[serde(default)]
    pub tags: Vec<Tag>,

    #[serde(default)]
    pub contents: Vec<Content>,

    #[serde(default)]
    pub layouts: Vec<Layout>,

    #[serde(default)]
    pub settings: Vec<Setting>,

    #[serde(default)]
    pub contributors: Vec<Contributor>,

    /// Profiles for raw author usernames.
    #[serde(default)]
    pub users: Vec<UserAuthor>,
}

/// On-disk content record: tags are referenced by id.
#[derive(Debug, Deserialize)]
struct ContentRecord {
    #[serde(flatten)]
    content: Content,

    #[serde(default)]
    tag_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    site: Site,
    #[serde(default)]
    sections: Vec<Section>,
    #[serde(default)]
    tags: Vec<Tag>,
    #[serde(default)]
    contents: Vec<ContentRecord>,
    #[serde(default)]
    layouts: Vec<Layout>,
    #[serde(default)]
    settings: Vec<Setting>,
    #[serde(default)]
    contributors: Vec<Contributor>,
    #[serde(default)]
    users: Vec<UserAuthor>,
}

impl SiteSnapshot {
    /// Load a snapshot, choosing the format from the file extension.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::snapshot(path, "file not found"));
        }

        let raw = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        let file: SnapshotFile = match ext.as_str() {
            "json" => serde_json::from_str(&raw)
                .map_err(|e| CoreError::snapshot(path, e.to_string()))?,
            "yaml" | "yml" => serde_yaml::from_str(&raw)
                .map_err(|e| CoreError::snapshot(path, e.to_string()))?,
            other => {
                return Err(CoreError::snapshot(
                    path,
                    format!("unsupported snapshot format: {other:?}"),
                ));
            }
        };

        let snapshot = Self::from_file(file);
        debug!(
            site = %snapshot.site.slug,
            contents = snapshot.contents.len(),
            sections = snapshot.sections.len(),
            "loaded site snapshot"
        );
        Ok(snapshot)
    }

    /// Parse a YAML snapshot document.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let file: SnapshotFile = serde_yaml::from_str(raw)?;
        Ok(Self::from_file(file))
    }

    /// Parse a JSON snapshot document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: SnapshotFile = serde_json::from_str(raw)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: SnapshotFile) -> Self {
        let tags_by_id: HashMap<i64, &Tag> = file.tags.iter().map(|t| (t.id, t)).collect();

        let contents = file
            .contents
            .into_iter()
            .map(|record| {
                let mut content = record.content;
                for id in record.tag_ids {
                    match tags_by_id.get(&id) {
                        Some(tag) if !content.tags.iter().any(|t| t.id == id) => {
                            content.tags.push((*tag).clone());
                        }
                        Some(_) => {}
                        None => warn!(content = content.id, tag = id, "dropping unknown tag id"),
                    }
                }
                content
            })
            .collect();

        Self {
            site: file.site,
            sections: file.sections,
            tags: file.tags,
            contents,
            layouts: file.layouts,
            settings: file.settings,
            contributors: file.contributors,
            users: file.users,
        }
    }

    /// Typed pipeline settings for this site.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings::from_settings(&self.settings)
    }

    /// User profiles keyed by username.
    pub fn user_authors(&self) -> HashMap<String, UserAuthor> {
        self.users
            .iter()
            .map(|u| (u.username.clone(), u.clone()))
            .collect()
    }
}
