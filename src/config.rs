//! User settings (`config.toml` in the config directory)

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::paths;

pub const DEFAULT_HOST: &str = "https://connection.keboola.com";
pub const DEFAULT_TOKEN_ENV: &str = "KBC_TOKEN";
pub const DEFAULT_JOBS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Storage API host of the stack
    pub host: String,
    /// Environment variable holding the Storage API token
    pub token_env: String,
    /// Entities processed in parallel
    pub jobs: usize,
    /// Store payloads tab-indented instead of compact
    pub pretty_payloads: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            jobs: DEFAULT_JOBS,
            pretty_payloads: false,
        }
    }
}

impl Settings {
    /// Load settings from the config directory, or defaults when absent
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::settings_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let settings: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid settings file: {}", path.display()))?;

        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Read the API token from `token_env`
    pub fn token(&self) -> Result<String> {
        match std::env::var(&self.token_env) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => bail!(
                "No Storage API token found. Set the {} environment variable.",
                self.token_env
            ),
        }
    }
}
