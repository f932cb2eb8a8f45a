use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::domain::{AppConfig, DomainError};
use crate::ports::ConfigStore;

const APP_DIR_NAME: &str = "GroqPlayground";

/// TOML-based configuration store with OS-specific paths.
pub struct TomlConfigStore {
    data_dir: PathBuf,
}

impl TomlConfigStore {
    /// Create a store rooted in the OS application data directory.
    pub fn new() -> Result<Self, DomainError> {
        Self::with_data_dir(Self::default_data_dir()?)
    }

    /// Create a store rooted in an explicit directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Result<Self, DomainError> {
        fs::create_dir_all(&data_dir)?;
        info!(data_dir = ?data_dir, "ConfigStore initialized");
        Ok(Self { data_dir })
    }

    /// - macOS: ~/Library/Application Support/GroqPlayground/
    /// - Windows: %APPDATA%\GroqPlayground\
    /// - Linux: ~/.config/GroqPlayground/
    fn default_data_dir() -> Result<PathBuf, DomainError> {
        #[cfg(target_os = "macos")]
        let base = dirs::data_dir();

        #[cfg(not(target_os = "macos"))]
        let base = dirs::config_dir();

        base.map(|p| p.join(APP_DIR_NAME)).ok_or_else(|| {
            DomainError::Config("Could not find application data directory".to_string())
        })
    }
}

impl ConfigStore for TomlConfigStore {
    fn load(&self) -> Result<AppConfig, DomainError> {
        let config_path = self.config_path();

        if config_path.exists() {
            debug!(path = ?config_path, "Loading configuration");
            let content = fs::read_to_string(&config_path)?;
            let config: AppConfig = toml::from_str(&content)?;
            info!(path = ?config_path, "Configuration loaded");
            Ok(config)
        } else {
            info!(path = ?config_path, "Configuration file not found, creating default");
            let config = AppConfig::new();
            self.save(&config)?;
            Ok(config)
        }
    }

    fn save(&self, config: &AppConfig) -> Result<(), DomainError> {
        let config_path = self.config_path();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&config_path, content)?;

        info!(path = ?config_path, "Configuration saved");
        Ok(())
    }

    fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }

    fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    fn downloads_dir(&self) -> PathBuf {
        dirs::download_dir().unwrap_or_else(|| self.data_dir.join("downloads"))
    }
}
