//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the API base URL, where tokens are persisted, refresh timing, and the
//! last used username.
//!
//! Configuration is stored at `~/.config/watchflix/config.json`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{ApiClient, HttpTransport};
use crate::auth::{
    FileTokenStore, KeyringTokenStore, MemoryTokenStore, SessionManager, SessionOptions,
    TokenStore,
};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "watchflix";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "WATCHFLIX_API_URL";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Matches the server's access token lifetime with room to spare.
const DEFAULT_REFRESH_INTERVAL_MINUTES: u64 = 15;

/// 30s allows for slow recommendation queries while failing fast enough.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStorage {
    /// `session.json` in the data directory
    #[default]
    File,
    /// OS keychain
    Keyring,
    /// Nothing survives the process
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub token_storage: TokenStorage,
    pub refresh_interval_minutes: u64,
    pub request_timeout_secs: u64,
    pub logout_on_refresh_failure: bool,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_storage: TokenStorage::default(),
            refresh_interval_minutes: DEFAULT_REFRESH_INTERVAL_MINUTES,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            logout_on_refresh_failure: false,
            last_username: None,
        }
    }
}

impl Config {
    /// Load from the default location and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn apply_env(&mut self) {
        self.apply_api_url(std::env::var(API_URL_ENV).ok());
    }

    fn apply_api_url(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            debug!(url = %url, "API base URL overridden from environment");
            self.api_base_url = url.trim().to_string();
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Where the session file and logs live. Independent of the config
    /// contents so logging can be set up before the config is read.
    pub fn data_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            refresh_interval: Duration::from_secs(
                self.refresh_interval_minutes.max(1).saturating_mul(60),
            ),
            logout_on_refresh_failure: self.logout_on_refresh_failure,
        }
    }

    pub fn open_token_store(&self) -> Result<Arc<dyn TokenStore>> {
        Ok(match self.token_storage {
            TokenStorage::File => Arc::new(FileTokenStore::new(Self::data_dir()?)),
            TokenStorage::Keyring => Arc::new(KeyringTokenStore::new()),
            TokenStorage::Memory => Arc::new(MemoryTokenStore::new()),
        })
    }

    /// Wire transport, token store and session together.
    pub fn connect(&self) -> Result<ApiClient> {
        let transport = HttpTransport::new(&self.api_base_url, self.request_timeout())
            .context("Failed to create HTTP client")?;
        let session = SessionManager::new(
            Arc::new(transport),
            self.open_token_store()?,
            self.session_options(),
        );
        Ok(ApiClient::new(session))
    }
}
