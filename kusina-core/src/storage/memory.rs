//! In-memory object storage.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};

use super::ObjectStorage;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object.
    pub fn put(&self, bucket: &str, path: &str, bytes: &[u8], content_type: &str) {
        self.lock().insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        self.lock()
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    /// Paths stored in `bucket`, sorted.
    pub fn paths(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, p)| p.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<(String, String), StoredObject>> {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://public/{}/{}", bucket, path)
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        self.lock().insert(
            (bucket.to_string(), path.to_string()),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        self.object(bucket, path)
            .map(|o| o.bytes)
            .ok_or_else(|| Error::Storage(format!("object {}/{} not found", bucket, path)))
    }
}
