//! Filesystem-rooted [`Blob`] implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tender_config::BlobConfig;

use crate::error::{BlobError, BlobResult};
use crate::traits::Blob;

/// Stores objects as files under a configured root directory. Keys are
/// forward-slash paths and map directly onto relative filesystem paths;
/// parent directories are created lazily on `put`.
#[derive(Debug, Clone)]
pub struct FsBlob {
    root: PathBuf,
}

impl FsBlob {
    /// Root the store at `config.root_dir`.
    pub fn new(config: &BlobConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root_dir),
        }
    }

    /// Resolves `key` to a path under `root`, rejecting any `.`/`..`
    /// segment so a crafted key can't escape the root (zip-slip).
    fn path_for(&self, key: &str) -> BlobResult<PathBuf> {
        let mut path = self.root.clone();
        for segment in key.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(BlobError::Other(format!("invalid key (path traversal): {key}")));
            }
            path.push(segment);
        }
        Ok(path)
    }
}

#[async_trait]
impl Blob for FsBlob {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> BlobResult<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(key, "blob put");
        Ok(())
    }

    async fn get(&self, key: &str) -> BlobResult<Vec<u8>> {
        let path = self.path_for(key)?;
        let bytes = tokio::fs::read(&path).await?;
        Ok(bytes)
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> BlobResult<bool> {
        Ok(tokio::fs::try_exists(self.path_for(key)?).await?)
    }
}

/// Ensure `root` exists before constructing an [`FsBlob`] over it.
pub async fn ensure_root(root: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(root).await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn blob_over_tempdir() -> (FsBlob, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let blob = FsBlob {
            root: dir.path().to_path_buf(),
        };
        (blob, dir)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let (blob, _dir) = blob_over_tempdir().await;
        blob.put("uploads/b1/archive.zip", b"payload".to_vec())
            .await
            .unwrap();
        let bytes = blob.get("uploads/b1/archive.zip").await.unwrap();
        assert_eq!(bytes, b"payload");
    }

    #[tokio::test]
    async fn get_missing_key_returns_not_found() {
        let (blob, _dir) = blob_over_tempdir().await;
        let err = blob.get("uploads/missing").await.unwrap_err();
        assert!(matches!(err, crate::error::BlobError::NotFound(_)));
    }

    #[tokio::test]
    async fn exists_reflects_put_and_delete() {
        let (blob, _dir) = blob_over_tempdir().await;
        assert!(!blob.exists("extracted/b1/a.pdf").await.unwrap());
        blob.put("extracted/b1/a.pdf", b"x".to_vec()).await.unwrap();
        assert!(blob.exists("extracted/b1/a.pdf").await.unwrap());
        blob.delete("extracted/b1/a.pdf").await.unwrap();
        assert!(!blob.exists("extracted/b1/a.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn delete_missing_key_is_a_no_op() {
        let (blob, _dir) = blob_over_tempdir().await;
        blob.delete("extracted/b1/never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let (blob, _dir) = blob_over_tempdir().await;
        assert!(blob.put("../escape.txt", b"x".to_vec()).await.is_err());
        assert!(blob.put("uploads/../../escape.txt", b"x".to_vec()).await.is_err());
        assert!(blob.get("uploads/./../secret").await.is_err());
    }
}
