//! In-memory [`Blob`] double for unit tests.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{BlobError, BlobResult};
use crate::traits::Blob;

/// `DashMap`-backed in-memory store. Single-process only.
#[derive(Debug, Default)]
pub struct MockBlob {
    objects: DashMap<String, Vec<u8>>,
}

impl MockBlob {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Blob for MockBlob {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> BlobResult<()> {
        self.objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> BlobResult<Vec<u8>> {
        self.objects
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        self.objects.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> BlobResult<bool> {
        Ok(self.objects.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_bytes_by_key() {
        let blob = MockBlob::new();
        blob.put("uploads/b1/archive.zip", b"payload".to_vec())
            .await
            .unwrap();
        assert_eq!(
            blob.get("uploads/b1/archive.zip").await.unwrap(),
            b"payload"
        );
        assert!(blob.exists("uploads/b1/archive.zip").await.unwrap());
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let blob = MockBlob::new();
        let err = blob.get("nope").await.unwrap_err();
        assert!(matches!(err, BlobError::NotFound(_)));
    }
}
