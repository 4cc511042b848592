//! Object storage kept in a hash map.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::POISONED;
use crate::domain::StorageKey;
use crate::domain::ports::{ObjectStorage, ObjectStorageError};

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredObject {
    content_type: String,
    bytes: Vec<u8>,
}

/// Bucket of uploaded objects addressed by key.
///
/// Public URLs are `<public_base>/<path>`; nothing serves them.
pub struct MemoryObjectStorage {
    public_base: String,
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl MemoryObjectStorage {
    pub fn new(public_base: impl Into<String>) -> Self {
        let public_base = public_base.into();
        Self {
            public_base: public_base.trim_end_matches('/').to_owned(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Content type and size of a stored object.
    pub fn object_info(&self, path: &str) -> Option<(String, usize)> {
        let objects = self.objects.lock().ok()?;
        objects
            .get(path)
            .map(|object| (object.content_type.clone(), object.bytes.len()))
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStorage for MemoryObjectStorage {
    async fn upload(
        &self,
        key: &StorageKey,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<String, ObjectStorageError> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| ObjectStorageError::connection(POISONED))?;
        let path = key.as_ref().to_owned();
        if objects.contains_key(&path) {
            return Err(ObjectStorageError::duplicate(path));
        }
        debug!(key = %path, size = bytes.len(), "stored object in memory");
        objects.insert(
            path.clone(),
            StoredObject {
                content_type: content_type.to_owned(),
                bytes: bytes.to_vec(),
            },
        );
        Ok(path)
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base, path.trim_start_matches('/'))
    }
}
