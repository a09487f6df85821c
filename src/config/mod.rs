// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{CacheError, Result};
use config::{Config, Environment, File};
use std::path::PathBuf;

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest, e.g. `GEMCACHE_CACHE__LIST_PAGE_SIZE`)
    /// 2. Config file (`path`, or `~/.gemcache/config.toml` when absent)
    /// 3. Defaults (lowest)
    ///
    /// An explicitly given `path` must exist; the default path is optional.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let file = match path {
            Some(p) => File::with_name(p).required(true),
            None => File::with_name(&Self::default_config_path()).required(false),
        };

        let config = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("GEMCACHE")
                    .prefix_separator("_")
                    .separator("__")
            )
            .build()
            .map_err(|e| CacheError::Config(e.to_string()))?;

        let mut app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| CacheError::Config(e.to_string()))?;

        if app_config.gemini.api_key.is_none() {
            app_config.gemini.api_key = std::env::var(API_KEY_ENV).ok();
        }

        Ok(app_config)
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gemcache")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}
