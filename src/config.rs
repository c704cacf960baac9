//! Application configuration management.
//!
//! Configuration is stored at `~/.config/versecache/config.json` and may
//! be overridden through the environment (`VERSECACHE_API_URL`,
//! `VERSECACHE_CACHE_DIR`), with `.env` files honored via dotenvy.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "versecache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default base URL for the remote content API
pub const DEFAULT_API_BASE_URL: &str = "https://api.versecache.app/v1";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var("VERSECACHE_API_URL") {
            config.api_base_url = Some(url);
        }
        if let Ok(dir) = std::env::var("VERSECACHE_CACHE_DIR") {
            config.cache_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
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

    pub fn api_base_url(&self) -> String {
        self.api_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_url_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url(), DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_api_base_url_override() {
        let config = Config {
            api_base_url: Some("https://staging.example.com".to_string()),
            ..Config::default()
        };
        assert_eq!(config.api_base_url(), "https://staging.example.com");
    }

    #[test]
    fn test_cache_dir_override() {
        let config = Config {
            cache_dir: Some(PathBuf::from("/tmp/versecache-test")),
            ..Config::default()
        };
        assert_eq!(
            config.cache_dir().unwrap(),
            PathBuf::from("/tmp/versecache-test")
        );
    }
}
