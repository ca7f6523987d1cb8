// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Blob Store: content-addressed storage for job bundles and result
//! archives, external to the Registry proper. The filesystem-backed
//! implementation here is the reference implementation named in §4.5; a
//! production deployment can swap in an object-store-backed one behind
//! the same trait.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;

use crate::dispatch::error::DispatchError;

/// A reference to stored bytes, opaque to callers beyond round-tripping
/// through [`BlobStore::put`] / [`BlobStore::get`].
pub type BlobRef = String;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, bytes: &[u8]) -> Result<BlobRef, DispatchError>;
    async fn get(&self, blob_ref: &str) -> Result<Vec<u8>, DispatchError>;
    async fn delete(&self, blob_ref: &str) -> Result<(), DispatchError>;
    async fn exists(&self, blob_ref: &str) -> bool;
}

/// Filesystem-backed, SHA-256 content-addressed store. Blob refs take the
/// form `sha256:<hex digest>`; storing the same bytes twice is a no-op
/// write to the same path.
pub struct FilesystemBlobStore {
    root: std::path::PathBuf,
}

impl FilesystemBlobStore {
    pub fn new(root: impl Into<std::path::PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, digest_hex: &str) -> std::path::PathBuf {
        let (prefix, rest) = digest_hex.split_at(2);
        self.root.join(prefix).join(rest)
    }

    fn parse_ref(blob_ref: &str) -> Result<&str, DispatchError> {
        blob_ref
            .strip_prefix("sha256:")
            .ok_or_else(|| DispatchError::BadRequest(format!("unrecognized blob ref: {blob_ref}")))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, bytes: &[u8]) -> Result<BlobRef, DispatchError> {
        let digest_hex = hex::encode(Sha256::digest(bytes));
        let path = self.path_for(&digest_hex);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DispatchError::StoreUnavailable(e.to_string()))?;
        }
        if !path.exists() {
            let mut file = tokio::fs::File::create(&path)
                .await
                .map_err(|e| DispatchError::StoreUnavailable(e.to_string()))?;
            file.write_all(bytes)
                .await
                .map_err(|e| DispatchError::StoreUnavailable(e.to_string()))?;
        }
        Ok(format!("sha256:{digest_hex}"))
    }

    async fn get(&self, blob_ref: &str) -> Result<Vec<u8>, DispatchError> {
        let digest_hex = Self::parse_ref(blob_ref)?;
        let path = self.path_for(digest_hex);
        tokio::fs::read(&path)
            .await
            .map_err(|_| DispatchError::NotFound(format!("blob {blob_ref}")))
    }

    async fn delete(&self, blob_ref: &str) -> Result<(), DispatchError> {
        let digest_hex = Self::parse_ref(blob_ref)?;
        let path = self.path_for(digest_hex);
        match tokio::fs::remove_file(&path).await {
            Ok(()) | Err(_) => Ok(()),
        }
    }

    async fn exists(&self, blob_ref: &str) -> bool {
        let Ok(digest_hex) = Self::parse_ref(blob_ref) else {
            return false;
        };
        self.path_for(digest_hex).exists()
    }
}

/// Minimal hex-encoding helper, avoiding a dependency on the `hex` crate
/// for a single call site. Kept local since it's the only consumer.
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        use std::fmt::Write;
        bytes.as_ref().iter().fold(String::new(), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());
        let blob_ref = store.put(b"hello world").await.unwrap();
        assert!(blob_ref.starts_with("sha256:"));
        let bytes = store.get(&blob_ref).await.unwrap();
        assert_eq!(bytes, b"hello world");
    }

    #[tokio::test]
    async fn put_is_idempotent_for_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());
        let ref1 = store.put(b"same content").await.unwrap();
        let ref2 = store.put(b"same content").await.unwrap();
        assert_eq!(ref1, ref2);
    }

    #[tokio::test]
    async fn get_missing_blob_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());
        let err = store
            .get("sha256:0000000000000000000000000000000000000000000000000000000000000000")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(_)));
    }

    #[tokio::test]
    async fn exists_reflects_store_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemBlobStore::new(dir.path());
        let blob_ref = store.put(b"data").await.unwrap();
        assert!(store.exists(&blob_ref).await);
        store.delete(&blob_ref).await.unwrap();
        assert!(!store.exists(&blob_ref).await);
    }
}
