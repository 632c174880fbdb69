//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the last searched organization, the credential backend and
//! optional overrides for the API root and handshake timeout.
//!
//! Configuration is stored at `~/.config/reposearch/config.json`. The
//! `REPOSEARCH_API_URL` and `REPOSEARCH_HANDSHAKE_TIMEOUT_SECS` environment
//! variables take precedence over the file.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::API_BASE_URL;
use crate::auth::{
    CredentialStore, FileCredentialStore, KeyringCredentialStore, DEFAULT_HANDSHAKE_TIMEOUT,
};

/// Application name used for config/data directory paths
const APP_NAME: &str = "reposearch";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Key-value storage file name for the file credential backend
const STORAGE_FILE: &str = "storage.json";

const ENV_API_URL: &str = "REPOSEARCH_API_URL";
const ENV_HANDSHAKE_TIMEOUT: &str = "REPOSEARCH_HANDSHAKE_TIMEOUT_SECS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    #[default]
    File,
    Keyring,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub last_org: Option<String>,
    pub credential_backend: CredentialBackend,
    pub api_base_url: Option<String>,
    pub handshake_timeout_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
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

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Remember the organization from the last search; blank clears it.
    pub fn set_last_org(&mut self, org: &str) {
        let org = org.trim();
        self.last_org = (!org.is_empty()).then(|| org.to_string());
    }

    /// API base URL; `REPOSEARCH_API_URL` wins over the file.
    pub fn api_base_url(&self) -> String {
        self.api_base_url_with(std::env::var(ENV_API_URL).ok())
    }

    fn api_base_url_with(&self, env: Option<String>) -> String {
        env.filter(|s| !s.trim().is_empty())
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| API_BASE_URL.to_string())
    }

    /// Handshake deadline; `REPOSEARCH_HANDSHAKE_TIMEOUT_SECS` wins over the
    /// file when it parses.
    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout_with(std::env::var(ENV_HANDSHAKE_TIMEOUT).ok())
    }

    fn handshake_timeout_with(&self, env: Option<String>) -> Duration {
        let from_env = env.and_then(|s| match s.trim().parse() {
            Ok(secs) => Some(secs),
            Err(_) => {
                warn!(value = %s, "Ignoring unparsable {}", ENV_HANDSHAKE_TIMEOUT);
                None
            }
        });
        from_env
            .or(self.handshake_timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_HANDSHAKE_TIMEOUT)
    }

    /// Open the configured credential backend.
    pub fn credential_store(&self) -> Result<Arc<dyn CredentialStore>> {
        match self.credential_backend {
            CredentialBackend::File => {
                let path = self.data_dir()?.join(STORAGE_FILE);
                Ok(Arc::new(FileCredentialStore::new(path)))
            }
            CredentialBackend::Keyring => Ok(Arc::new(KeyringCredentialStore)),
        }
    }
}
