use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::api::join_url;

fn config_path() -> Result<PathBuf> {
    let dir = dirs::home_dir()
        .context("cannot determine home directory")?
        .join(".tunconf");
    fs::create_dir_all(&dir)?;
    Ok(dir.join("config.toml"))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server hosting the config API
    pub server: String,
    /// Path prefix of the API on that server
    pub api_base: String,
    /// Request timeout in seconds
    pub timeout: u64,
    /// Seconds between probes for `tunconf health --watch`
    pub health_interval: u64,
    /// Default target for `tunconf export`
    pub export_file: String,
    /// Shell for completions (bash, zsh, fish)
    pub shell: Option<String>,
    /// Editor for `tunconf config` (overrides $VISUAL/$EDITOR)
    pub editor: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: "http://127.0.0.1:8081".to_string(),
            api_base: "/api".to_string(),
            timeout: 10,
            health_interval: 15,
            export_file: "tunnel_conf.json".to_string(),
            shell: None,
            editor: None,
        }
    }
}

impl Config {
    /// Load config from ~/.tunconf/config.toml, falling back to defaults.
    pub fn load() -> Self {
        let path = match config_path() {
            Ok(p) => p,
            Err(_) => return Self::default(),
        };
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                log::warn!("ignoring {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid config file")
    }

    /// Full API base URL: server + api_base.
    pub fn api_url(&self) -> String {
        join_url(&self.server, &self.api_base)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.health_interval.max(1))
    }

    /// Resolve which editor to use: config > $VISUAL > $EDITOR > vi
    pub fn resolve_editor(&self) -> String {
        if let Some(ref e) = self.editor {
            return e.clone();
        }
        std::env::var("VISUAL")
            .or_else(|_| std::env::var("EDITOR"))
            .unwrap_or_else(|_| "vi".to_string())
    }

    /// Write a default config file if none exists. Returns the path.
    pub fn init() -> Result<PathBuf> {
        let path = config_path()?;
        if path.exists() {
            return Ok(path);
        }
        let default = Self::default();
        let content = toml::to_string_pretty(&default)
            .context("failed to serialize default config")?;
        fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}
