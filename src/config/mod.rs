//! Settings stored in `<data dir>/config.json`. Command line flags and
//! environment variables take precedence over the file.

use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::storage::DATABASE_FILE;

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the forwarder binds to.
    pub bind_addr: SocketAddr,
    /// When set, requests go through this forwarder endpoint instead of
    /// straight to the target.
    pub forwarder_url: Option<String>,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)),
            forwarder_url: None,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads the config file in `data_dir`, falling back to defaults when
    /// there is none.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = config_path(data_dir);
        if !path.exists() {
            return Ok(Self::default());
        }

        let json = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file `{}`", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config file `{}`", path.display()))
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory `{}`", data_dir.display()))?;

        let path = config_path(data_dir);
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write config file `{}`", path.display()))
    }
}

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILE)
}
