pub mod blob_registry;
pub mod config_store;
pub mod groq_client;
pub mod key_value_store;
pub mod network_guard;

#[cfg(test)]
pub(crate) mod testing;

pub use blob_registry::BlobRegistry;
pub use config_store::TomlConfigStore;
pub use groq_client::{GroqClient, ModelInfo};
pub use key_value_store::{FileKeyValueStore, MemoryKeyValueStore};
pub use network_guard::NetworkGuard;
