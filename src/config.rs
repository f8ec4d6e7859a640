// Configuration
// Settings are loaded from a TOML file and handed to whatever needs them;
// nothing reads configuration from global state

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DalConfig {
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Name reported in logs
    pub name: String,
    /// How long a cached connection may take to prove it is still usable
    pub validation_timeout_secs: u64,
    /// Create the weather schema and its procedures at startup
    pub bootstrap_schema: bool,
    /// SQL script run after the schema is installed
    pub init_script: Option<PathBuf>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            name: "weather".to_string(),
            validation_timeout_secs: 4,
            bootstrap_schema: true,
            init_script: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive; RUST_LOG takes precedence
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "weatherdal=info".to_string(),
        }
    }
}

impl DalConfig {
    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = toml::from_str::<DalConfig>(&data)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if given and present, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    /// Write the config as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(path, data)
            .with_context(|| format!("failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.name.trim().is_empty() {
            bail!("database.name must not be empty");
        }
        if self.database.validation_timeout_secs == 0 {
            bail!("database.validation_timeout_secs must be at least 1");
        }
        Ok(())
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.database.validation_timeout_secs)
    }
}
