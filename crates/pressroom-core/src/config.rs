//! Process configuration (`pressroom.toml`).
//!
//! Site-level behaviour lives in `Setting` records; this file only covers
//! where the process keeps its workspaces and which tools it runs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Main configuration structure for Pressroom.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Workspace settings.
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Build settings.
    #[serde(default)]
    pub build: BuildConfig,

    /// Git settings.
    #[serde(default)]
    pub git: GitConfig,
}

/// Where per-site workspaces live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Root directory holding one subdirectory per site.
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,
}

/// Build configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Extra static assets copied over the built-in ones.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

/// Git configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Git executable.
    #[serde(default = "default_git_binary")]
    pub binary: String,
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from("workspace")
}

fn default_git_binary() -> String {
    "git".to_string()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            binary: default_git_binary(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `PRESSROOM__` environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix("PRESSROOM").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.workspace.root.as_os_str().is_empty() {
            return Err(CoreError::config("workspace.root cannot be empty"));
        }

        if self.git.binary.trim().is_empty() {
            return Err(CoreError::config("git.binary cannot be empty"));
        }

        if let Some(dir) = &self.build.static_dir
            && !dir.exists()
        {
            tracing::warn!(dir = %dir.display(), "build.static_dir does not exist");
        }

        Ok(())
    }

    /// Workspace directory of one site.
    pub fn site_workspace(&self, site_slug: &str) -> PathBuf {
        self.workspace.root.join(site_slug)
    }
}
