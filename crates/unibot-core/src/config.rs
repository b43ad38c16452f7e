//! Client configuration.
//!
//! `ClientConfig` carries the API base URL, resolved once from the
//! `UNIBOT_API_URL` environment variable. `Settings` is the small persisted
//! preferences file at `~/.config/unibot/config.json` (last username and
//! which credential store to use).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "unibot";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// File credential store name inside the cache directory
const CREDENTIALS_FILE: &str = "credentials.json";

/// Environment variable that overrides the API base URL
pub const API_URL_ENV: &str = "UNIBOT_API_URL";

/// Base URL used when nothing is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    /// Read `UNIBOT_API_URL`, falling back to the local development server.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(API_URL_ENV) {
            Some(url) if !url.trim().is_empty() => Self::new(url),
            _ => Self::new(DEFAULT_API_URL),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

/// Where tokens are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// JSON file in the cache directory
    #[default]
    File,
    /// OS keychain
    Keyring,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StoreBackend::File),
            "keyring" | "keychain" => Ok(StoreBackend::Keyring),
            other => Err(anyhow::anyhow!("Unknown credential store '{}'", other)),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::File => write!(f, "file"),
            StoreBackend::Keyring => write!(f, "keyring"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub last_username: Option<String>,
    #[serde(default)]
    pub store: StoreBackend,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(serde_json::from_str(&contents).context("Failed to parse config file")?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn credentials_path() -> Result<PathBuf> {
        Ok(Self::cache_dir()?.join(CREDENTIALS_FILE))
    }
}
