//! Standard paths used by devsync

use std::path::{Path, PathBuf};

/// Standard devsync paths
pub struct Paths {
    /// Home directory
    pub home: PathBuf,
    /// Config directory (~/.config/devsync)
    pub config: PathBuf,
    /// OpenSSH client config (~/.ssh/config)
    pub ssh_config: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        let config = dirs::config_dir()
            .unwrap_or_else(|| home.join(".config"))
            .join("devsync");

        let ssh_config = home.join(".ssh").join("config");

        Self {
            home,
            config,
            ssh_config,
        }
    }

    /// Get the devsync config file path
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }

    /// Expand a leading `~` against this home directory
    pub fn expand_tilde(&self, path: &Path) -> PathBuf {
        match path.strip_prefix("~") {
            Ok(rest) => self.home.join(rest),
            Err(_) => path.to_path_buf(),
        }
    }
}
