use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::adapters::{
    BlobRegistry, FileKeyValueStore, MemoryKeyValueStore, NetworkGuard, TomlConfigStore,
};
use crate::app::credentials::{build_config_credential, CredentialSessionManager};
use crate::app::features::FeatureServices;
use crate::app::playback::PlaybackController;
use crate::domain::{AppConfig, DomainError};
use crate::infrastructure::init_logging;
use crate::ports::{ConfigStore, HttpClient, MediaHost};

/// File holding the durable key-value store inside the data directory.
const DURABLE_STORE_FILE: &str = "storage.json";

/// Application controller: wires the adapters together and owns every
/// long-lived component.
pub struct AppController {
    config: RwLock<AppConfig>,
    config_store: Arc<TomlConfigStore>,
    network: Arc<NetworkGuard>,
    credentials: Arc<CredentialSessionManager>,
    playback: Arc<PlaybackController>,
    features: FeatureServices,
    _log_guard: Option<WorkerGuard>,
}

impl AppController {
    /// Initialize from the OS data directory. The host supplies the media
    /// primitive the player drives.
    pub fn new(media_host: Arc<dyn MediaHost>) -> Result<Self, DomainError> {
        Self::with_config_store(TomlConfigStore::new()?, media_host)
    }

    /// Initialize against an explicit config store.
    pub fn with_config_store(
        config_store: TomlConfigStore,
        media_host: Arc<dyn MediaHost>,
    ) -> Result<Self, DomainError> {
        let config_store = Arc::new(config_store);
        let config = config_store.load()?;

        let log_guard = init_logging(&config_store.logs_dir(), &config.logging)?;
        info!(version = env!("CARGO_PKG_VERSION"), "Playground starting up");

        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warn!(error = %e, "Failed to read .env file");
            }
        }

        let network = Arc::new(NetworkGuard::new(
            &config.privacy,
            Duration::from_secs(config.api.request_timeout_secs),
        )?);
        let http: Arc<dyn HttpClient> = network.clone();

        let durable = Arc::new(FileKeyValueStore::new(
            config_store.data_dir().join(DURABLE_STORE_FILE),
        ));
        let ephemeral = Arc::new(MemoryKeyValueStore::new());
        let credentials = Arc::new(CredentialSessionManager::new(
            durable,
            ephemeral,
            build_config_credential(),
            http.clone(),
            &config.api.base_url,
        ));

        let playback = Arc::new(PlaybackController::new(
            media_host,
            Arc::new(BlobRegistry::new()),
            http,
            config.playback.default_volume,
        ));

        let features = FeatureServices::new(credentials.clone(), playback.clone());

        info!(
            local_only = config.privacy.local_only,
            base_url = %config.api.base_url,
            "AppController initialized"
        );

        Ok(Self {
            config: RwLock::new(config),
            config_store,
            network,
            credentials,
            playback,
            features,
            _log_guard: log_guard,
        })
    }

    pub fn config(&self) -> AppConfig {
        self.config.read().clone()
    }

    /// Persist a new configuration and apply its network policy.
    ///
    /// API base URL and timeout changes take effect on the next start.
    pub fn update_config(&self, config: AppConfig) -> Result<(), DomainError> {
        self.config_store.save(&config)?;
        self.network.apply(&config.privacy);
        *self.config.write() = config;

        info!("Configuration updated");
        Ok(())
    }

    pub fn is_network_blocked(&self) -> bool {
        self.network.is_network_blocked()
    }

    pub fn credentials(&self) -> &Arc<CredentialSessionManager> {
        &self.credentials
    }

    pub fn playback(&self) -> &Arc<PlaybackController> {
        &self.playback
    }

    pub fn features(&self) -> &FeatureServices {
        &self.features
    }

    /// Release playback resources. Safe to call more than once.
    pub fn shutdown(&self) {
        self.playback.teardown();
        info!("Playground shut down");
    }

    pub fn data_dir(&self) -> PathBuf {
        self.config_store.data_dir()
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.config_store.logs_dir()
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.config_store.downloads_dir()
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_store.config_path()
    }
}
