//! Typed view over a site's key/value settings.
//!
//! The admin layer stores configuration as loose `Setting` records. The
//! pipeline reads them once per run into [`PipelineSettings`]; missing or
//! malformed values fall back to defaults.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::model::Setting;

pub const KEY_BASE_PATH: &str = "ssg.site.base_path";
pub const KEY_BASE_URL: &str = "ssg.site.base_url";
pub const KEY_INDEX_MAX_ITEMS: &str = "ssg.index.maxitems";
pub const KEY_BLOCKS_ENABLED: &str = "ssg.blocks.enabled";
pub const KEY_BLOCKS_MULTISECTION: &str = "ssg.blocks.multisection";
pub const KEY_BLOCKS_MAX_ITEMS: &str = "ssg.blocks.maxitems";

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_INDEX_PAGE_SIZE: usize = 9;
const DEFAULT_BLOCKS_MAX_ITEMS: usize = 5;
const DEFAULT_PUBLISH_BRANCH: &str = "gh-pages";
const DEFAULT_BACKUP_BRANCH: &str = "backup";
const DEFAULT_COMMIT_NAME: &str = "Pressroom Bot";
const DEFAULT_COMMIT_EMAIL: &str = "bot@pressroom.local";

/// Related-content panel configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlocksConfig {
    pub enabled: bool,
    pub multi_section: bool,
    pub max_items: usize,
}

impl Default for BlocksConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            multi_section: false,
            max_items: DEFAULT_BLOCKS_MAX_ITEMS,
        }
    }
}

/// Author identity stamped on generated commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

impl Default for CommitIdentity {
    fn default() -> Self {
        Self {
            name: DEFAULT_COMMIT_NAME.to_string(),
            email: DEFAULT_COMMIT_EMAIL.to_string(),
        }
    }
}

/// A git remote the pipeline pushes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTarget {
    pub url: String,
    pub branch: String,
    pub token: Option<String>,
    pub identity: CommitIdentity,
}

impl RepoTarget {
    fn with_branch(branch: &str) -> Self {
        Self {
            url: String::new(),
            branch: branch.to_string(),
            token: None,
            identity: CommitIdentity::default(),
        }
    }

    /// Whether a remote URL has been configured.
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty()
    }
}

/// Everything the generation and publish pipeline reads from settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Raw URL prefix; normalized by the URL topology.
    pub base_path: String,

    /// Absolute site origin used in the sitemap and CNAME file.
    pub base_url: String,

    pub index_page_size: usize,
    pub blocks: BlocksConfig,
    pub publish: RepoTarget,
    pub backup: RepoTarget,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            base_path: "/".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            index_page_size: DEFAULT_INDEX_PAGE_SIZE,
            blocks: BlocksConfig::default(),
            publish: RepoTarget::with_branch(DEFAULT_PUBLISH_BRANCH),
            backup: RepoTarget::with_branch(DEFAULT_BACKUP_BRANCH),
        }
    }
}

impl PipelineSettings {
    /// Build typed settings from a site's key/value records.
    pub fn from_settings(settings: &[Setting]) -> Self {
        let values: HashMap<&str, &str> = settings
            .iter()
            .map(|s| (s.ref_key.as_str(), s.value.trim()))
            .collect();
        let lookup = |key: &str| values.get(key).copied().filter(|v| !v.is_empty());

        let mut out = Self::default();

        if let Some(v) = lookup(KEY_BASE_PATH) {
            out.base_path = v.to_string();
        }
        if let Some(v) = lookup(KEY_BASE_URL) {
            out.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(size) = parse_usize(KEY_INDEX_MAX_ITEMS, lookup(KEY_INDEX_MAX_ITEMS)) {
            out.index_page_size = size.max(1);
        }

        if let Some(enabled) = parse_bool(KEY_BLOCKS_ENABLED, lookup(KEY_BLOCKS_ENABLED)) {
            out.blocks.enabled = enabled;
        }
        if let Some(multi) = parse_bool(KEY_BLOCKS_MULTISECTION, lookup(KEY_BLOCKS_MULTISECTION)) {
            out.blocks.multi_section = multi;
        }
        if let Some(max) = parse_usize(KEY_BLOCKS_MAX_ITEMS, lookup(KEY_BLOCKS_MAX_ITEMS)) {
            out.blocks.max_items = max;
        }

        read_repo_target(&lookup, "publish", &mut out.publish);
        read_repo_target(&lookup, "backup", &mut out.backup);

        out
    }
}

fn read_repo_target<'a>(
    lookup: &impl Fn(&str) -> Option<&'a str>,
    prefix: &str,
    target: &mut RepoTarget,
) {
    if let Some(v) = lookup(&format!("ssg.{prefix}.repo.url")) {
        target.url = v.to_string();
    }
    if let Some(v) = lookup(&format!("ssg.{prefix}.branch")) {
        target.branch = v.to_string();
    }
    target.token = lookup(&format!("ssg.{prefix}.auth.token")).map(str::to_string);
    if let Some(v) = lookup(&format!("ssg.{prefix}.commit.user.name")) {
        target.identity.name = v.to_string();
    }
    if let Some(v) = lookup(&format!("ssg.{prefix}.commit.user.email")) {
        target.identity.email = v.to_string();
    }
}

fn parse_bool(key: &str, value: Option<&str>) -> Option<bool> {
    let value = value?;
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            warn!(key, value, "ignoring unparsable boolean setting");
            None
        }
    }
}

fn parse_usize(key: &str, value: Option<&str>) -> Option<usize> {
    let value = value?;
    match value.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            warn!(key, value, "ignoring unparsable numeric setting");
            None
        }
    }
}
