//! Configuration loading for devsync

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths::Paths;

/// devsync configuration
///
/// Every key is optional; an absent config file means all defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Remote directory that holds one working copy per project
    pub remote_root: String,

    /// Remote directory that holds one bare repository per project
    pub repo_root: String,

    /// Remote script that prepares the project directories and hooks
    pub setup_script: String,

    /// SSH client config to read remotes from (default: ~/.ssh/config)
    pub ssh_config: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote_root: "~/dev".to_string(),
            repo_root: "~/dev/repo".to_string(),
            setup_script: "~/bin/setup_remote.sh".to_string(),
            ssh_config: None,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))
    }

    /// Load a config file the user named explicitly; it must exist
    pub fn load_required(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Config file not found: {}", path.display());
        }
        Self::load(path)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Resolve which SSH config to read.
    ///
    /// A command-line override wins over the config file, which wins over
    /// `~/.ssh/config`.
    pub fn ssh_config_path(&self, paths: &Paths, cli_override: Option<&Path>) -> PathBuf {
        match cli_override.or(self.ssh_config.as_deref()) {
            Some(path) => paths.expand_tilde(path),
            None => paths.ssh_config.clone(),
        }
    }
}
