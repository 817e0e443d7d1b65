//! Configuration loader
//!
//! Loads configuration from:
//! 1. Default values
//! 2. User-level config: ~/.cpt/cpt.toml
//! 3. Explicit config file (`--config` / `CPT_CONFIG`)
//! 4. `DATABASE_URL` environment variable
//!
//! Later layers override earlier ones.

use crate::config::schema::CptConfig;
use crate::error::{CptError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Configuration loader for the layered config sources
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    user_config_path: Option<PathBuf>,
    explicit_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self {
            user_config_path: Self::user_config_path(),
            explicit_path: None,
        }
    }

    /// Get user-level config path (~/.cpt/cpt.toml)
    fn user_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".cpt").join("cpt.toml"))
    }

    /// Override the user-level config location
    pub fn with_user_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_config_path = Some(path.into());
        self
    }

    /// Read an additional config file that must exist
    pub fn with_file(mut self, path: Option<PathBuf>) -> Self {
        self.explicit_path = path;
        self
    }

    /// Load configuration using the process environment
    pub async fn load(&self) -> Result<CptConfig> {
        self.load_with_env(|key| std::env::var(key).ok()).await
    }

    /// Load configuration resolving environment lookups through `lookup`
    pub async fn load_with_env<F>(&self, lookup: F) -> Result<CptConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = CptConfig::default();

        if let Some(path) = self.user_config_path.as_deref() {
            if path.exists() {
                debug!(path = %path.display(), "Loaded user-level config");
                config.merge(Self::load_from_path(path).await?);
            } else {
                debug!(path = %path.display(), "User-level config not found, using defaults");
            }
        }

        if let Some(path) = self.explicit_path.as_deref() {
            debug!(path = %path.display(), "Loaded explicit config");
            config.merge(Self::load_from_path(path).await?);
        }

        config.apply_env(lookup);
        Ok(config)
    }

    /// Load configuration from a specific path
    async fn load_from_path(path: &Path) -> Result<CptConfig> {
        if !path.exists() {
            return Err(CptError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| CptError::Config(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| CptError::Config(format!("Failed to parse config: {}", e)))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
