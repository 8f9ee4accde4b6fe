//! Settings loading for the CLI

use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{ConfigBuilder, Environment, File};
use serde::Deserialize;

use qlearn::AgentConfig;

/// Settings for the CLI
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub agent: AgentConfig,
    pub log: LogConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `<name>.agent` tables
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
        }
    }
}

impl Settings {
    /// Load settings from file and environment
    pub fn load() -> Result<Self> {
        Self::load_from(Self::find_config_file())
    }

    fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = ConfigBuilder::<config::builder::DefaultState>::default();

        if let Some(path) = &config_path {
            tracing::debug!("Loading settings from: {:?}", path);
            builder = builder.add_source(File::from(path.clone()).required(false));
        }

        // QLEARN_AGENT__ALPHA=0.3, QLEARN_STORAGE__DIR=/var/lib/qlearn, ...
        builder = builder.add_source(
            Environment::with_prefix("QLEARN")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()?
            .try_deserialize()
            .context("Failed to deserialize settings")?;

        settings
            .agent
            .validate()
            .context("Invalid agent settings")?;
        Ok(settings)
    }

    /// Find the settings file
    fn find_config_file() -> Option<PathBuf> {
        // Check in order: QLEARN_CONFIG env, ./qlearn.toml, ~/.config/qlearn/qlearn.toml
        if let Ok(path) = std::env::var("QLEARN_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let local = PathBuf::from("qlearn.toml");
        if local.exists() {
            return Some(local);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config").join("qlearn").join("qlearn.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }
}
