use std::path::PathBuf;

use crate::domain::{AppConfig, DomainError};

/// Port for persisting the playground configuration and locating the
/// per-user directories derived from it.
pub trait ConfigStore: Send + Sync {
    /// Load the configuration, writing defaults on first run.
    fn load(&self) -> Result<AppConfig, DomainError>;

    fn save(&self, config: &AppConfig) -> Result<(), DomainError>;

    fn config_path(&self) -> PathBuf;

    /// Application data directory. Durable key-value storage lives here.
    fn data_dir(&self) -> PathBuf;

    fn logs_dir(&self) -> PathBuf;

    /// Default destination for saved audio.
    fn downloads_dir(&self) -> PathBuf;
}
