use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::domain::DomainError;
use crate::ports::KeyValueStore;

/// Durable key-value store backed by a JSON file.
///
/// The whole map is rewritten on every change (temp file + rename). On unix
/// the file is created with mode 0600 since it holds the API key.
pub struct FileKeyValueStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, DomainError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        match serde_json::from_str(&content) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Corrupt storage file, treating as empty");
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), DomainError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("tmp");
        // A leftover temp file would keep its old mode through the open below.
        match fs::remove_file(&temp_path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }

        let bytes = serde_json::to_vec_pretty(map)?;
        let written = create_private(&temp_path).and_then(|mut file| {
            file.write_all(&bytes)?;
            file.sync_all()
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

/// Open a new file readable only by its owner (0600 on unix) from the start.
fn create_private(path: &Path) -> io::Result<fs::File> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path)
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DomainError> {
        let _guard = self.write_lock.lock();
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)?;
        debug!(key, store = self.name(), "Stored entry");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DomainError> {
        let _guard = self.write_lock.lock();
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
            debug!(key, store = self.name(), "Removed entry");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "durable"
    }
}

/// Process-scoped key-value store; contents vanish with the process.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), DomainError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), DomainError> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ephemeral"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = env::temp_dir().join(format!("groq_playground_kv_{}", uuid::Uuid::new_v4()));
        let store = FileKeyValueStore::new(dir.join("storage.json"));

        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v1").unwrap();
        store.set("other", "x").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v1"));

        // A second instance sees the persisted value.
        let reopened = FileKeyValueStore::new(dir.join("storage.json"));
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("v1"));

        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(reopened.get("k").unwrap(), None);
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("x"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = env::temp_dir().join(format!("groq_playground_kv_{}", uuid::Uuid::new_v4()));
        let store = FileKeyValueStore::new(dir.join("storage.json"));
        store.set("k", "v").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let _ = fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_stale_temp_file_does_not_leak_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = env::temp_dir().join(format!("groq_playground_kv_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        let stale = dir.join("storage.tmp");
        fs::write(&stale, "{}").unwrap();
        fs::set_permissions(&stale, fs::Permissions::from_mode(0o644)).unwrap();

        let store = FileKeyValueStore::new(dir.join("storage.json"));
        store.set("groq_api_key", "gsk_secret").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!stale.exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let dir = env::temp_dir().join(format!("groq_playground_kv_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("storage.json"), "{not json").unwrap();

        let store = FileKeyValueStore::new(dir.join("storage.json"));
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryKeyValueStore::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        store.remove("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
