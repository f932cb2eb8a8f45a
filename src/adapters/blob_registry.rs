use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::domain::{BlobId, SourceLocator};
use crate::ports::TransientResources;

struct Blob {
    bytes: Vec<u8>,
    mime_type: String,
}

/// In-memory registry of transient resources, the object-URL analogue.
#[derive(Default)]
pub struct BlobRegistry {
    blobs: RwLock<HashMap<BlobId, Blob>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resources not yet released.
    pub fn live_count(&self) -> usize {
        self.blobs.read().len()
    }
}

impl TransientResources for BlobRegistry {
    fn create(&self, bytes: Vec<u8>, mime_type: &str) -> SourceLocator {
        let id = BlobId::new();
        let size = bytes.len();
        self.blobs.write().insert(
            id,
            Blob {
                bytes,
                mime_type: mime_type.to_string(),
            },
        );
        debug!(blob = %id, size, mime_type, "Transient resource created");
        SourceLocator::Local(id)
    }

    fn read(&self, locator: &SourceLocator) -> Option<(Vec<u8>, String)> {
        let id = locator.local_id()?;
        self.blobs
            .read()
            .get(&id)
            .map(|b| (b.bytes.clone(), b.mime_type.clone()))
    }

    fn release(&self, locator: &SourceLocator) {
        let Some(id) = locator.local_id() else {
            return;
        };
        if self.blobs.write().remove(&id).is_some() {
            debug!(blob = %id, "Transient resource released");
        }
    }
}
