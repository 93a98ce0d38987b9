//! Configuration file support for ironlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/ironlog/config.toml`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub technique: TechniqueConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Durable store configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    /// SQLite file; `<data_dir>/ironlog.db` when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Parameters for advanced training techniques
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TechniqueConfig {
    /// Hell sets stop counting at the first set below this many reps
    #[serde(default = "default_hell_min_reps")]
    pub hell_min_reps: u32,
}

impl Default for TechniqueConfig {
    fn default() -> Self {
        Self {
            hell_min_reps: default_hell_min_reps(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("ironlog")
}

fn default_hell_min_reps() -> u32 {
    5
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("ironlog").join("config.toml")
    }

    /// Save the configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Resolved SQLite path
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| self.data.data_dir.join("ironlog.db"))
    }

    /// Where the in-progress session document lives
    pub fn session_path(&self) -> PathBuf {
        self.data.data_dir.join("current_session.json")
    }

    fn validate(&self) -> Result<()> {
        if self.technique.hell_min_reps == 0 {
            return Err(Error::Config(
                "technique.hell_min_reps must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
