//! Product image storage.
//!
//! Handlers only see the [`AssetStore`] trait. The bundled implementation
//! writes files into a local directory that the server exposes under
//! `/uploads`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use catalog_db::ImageRef;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Accepted image file extensions.
pub const SUPPORTED_FORMATS: &[&str] = &["jpg", "jpeg", "png", "webp"];

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("empty file")]
    Empty,
    #[error("file is {size} bytes; the limit is {max} bytes")]
    TooLarge { size: usize, max: usize },
    #[error("unsupported image format '{0}'; expected one of jpg, jpeg, png, webp")]
    UnsupportedFormat(String),
    #[error("invalid asset id '{0}'")]
    InvalidPublicId(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AssetError {
    /// `true` for problems with the upload itself rather than with storage.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AssetError::Empty | AssetError::TooLarge { .. } | AssetError::UnsupportedFormat(_)
        )
    }
}

/// An image received from a client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Where a stored image can be displayed from and how to release it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub url: String,
    pub public_id: String,
}

impl From<StoredAsset> for ImageRef {
    fn from(asset: StoredAsset) -> Self {
        ImageRef {
            url: asset.url,
            public_id: asset.public_id,
        }
    }
}

#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store an image and return its display URL and deletion handle.
    async fn put(&self, upload: ImageUpload) -> Result<StoredAsset, AssetError>;

    /// Release a stored image. `None` is a no-op.
    async fn release(&self, public_id: Option<&str>) -> Result<(), AssetError>;
}

/// Release an asset, logging instead of failing. Used where the database
/// write is what matters and a leftover file is acceptable.
pub async fn release_quietly(store: &dyn AssetStore, public_id: Option<&str>) {
    if let Err(e) = store.release(public_id).await {
        tracing::warn!(public_id = ?public_id, error = %e, "failed to release image asset");
    }
}

/// Filesystem-backed [`AssetStore`].
#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    root: PathBuf,
    public_base_url: String,
    max_bytes: usize,
}

impl LocalAssetStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            max_bytes,
        }
    }

    /// Check size and extension; returns the normalized extension.
    ///
    /// # Errors
    ///
    /// Returns the matching rejection variant of [`AssetError`].
    pub fn validate(&self, upload: &ImageUpload) -> Result<String, AssetError> {
        if upload.bytes.is_empty() {
            return Err(AssetError::Empty);
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(AssetError::TooLarge {
                size: upload.bytes.len(),
                max: self.max_bytes,
            });
        }
        let ext = Path::new(&upload.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        if !SUPPORTED_FORMATS.contains(&ext.as_str()) {
            return Err(AssetError::UnsupportedFormat(ext));
        }
        Ok(ext)
    }

    fn path_for(&self, public_id: &str) -> Result<PathBuf, AssetError> {
        let is_plain_file_name = !public_id.is_empty()
            && !public_id.starts_with('.')
            && !public_id.contains(['/', '\\']);
        if !is_plain_file_name {
            return Err(AssetError::InvalidPublicId(public_id.to_string()));
        }
        Ok(self.root.join(public_id))
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn put(&self, upload: ImageUpload) -> Result<StoredAsset, AssetError> {
        let ext = self.validate(&upload)?;

        tokio::fs::create_dir_all(&self.root).await?;
        let public_id = format!("{}.{ext}", Uuid::new_v4());
        tokio::fs::write(self.root.join(&public_id), &upload.bytes).await?;

        tracing::info!(
            original_name = %upload.file_name,
            public_id = %public_id,
            size = upload.bytes.len(),
            hash = %format!("{:x}", Sha256::digest(&upload.bytes)),
            "image stored"
        );

        Ok(StoredAsset {
            url: format!("{}/{public_id}", self.public_base_url),
            public_id,
        })
    }

    async fn release(&self, public_id: Option<&str>) -> Result<(), AssetError> {
        let Some(public_id) = public_id else {
            return Ok(());
        };
        let path = self.path_for(public_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(public_id, "image released");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(public_id, "image already absent");
                Ok(())
            }
            Err(e) => Err(AssetError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, bytes: &[u8]) -> ImageUpload {
        ImageUpload {
            file_name: name.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn put_writes_file_and_builds_public_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalAssetStore::new(dir.path(), "/uploads/", 1024);

        let asset = store.put(upload("foto.PNG", b"png-bytes")).await.expect("put");

        assert!(asset.public_id.ends_with(".png"));
        assert_eq!(asset.url, format!("/uploads/{}", asset.public_id));
        let stored = std::fs::read(dir.path().join(&asset.public_id)).expect("read back");
        assert_eq!(stored, b"png-bytes");
    }

    #[tokio::test]
    async fn release_removes_file_and_tolerates_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalAssetStore::new(dir.path(), "/uploads", 1024);
        let asset = store.put(upload("a.jpg", b"jpg")).await.expect("put");

        store.release(Some(&asset.public_id)).await.expect("release");
        assert!(!dir.path().join(&asset.public_id).exists());

        store
            .release(Some(&asset.public_id))
            .await
            .expect("second release is a no-op");
        store.release(None).await.expect("None is a no-op");
    }

    #[tokio::test]
    async fn release_rejects_path_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalAssetStore::new(dir.path(), "/uploads", 1024);
        let err = store.release(Some("../secrets.txt")).await.unwrap_err();
        assert!(matches!(err, AssetError::InvalidPublicId(_)));
    }

    #[test]
    fn validate_rejects_bad_uploads() {
        let store = LocalAssetStore::new("/tmp/unused", "/uploads", 4);

        assert!(matches!(store.validate(&upload("a.png", b"")), Err(AssetError::Empty)));
        assert!(matches!(
            store.validate(&upload("a.png", b"12345")),
            Err(AssetError::TooLarge { size: 5, max: 4 })
        ));
        assert!(matches!(
            store.validate(&upload("a.gif", b"1")),
            Err(AssetError::UnsupportedFormat(ref e)) if e == "gif"
        ));
        assert!(matches!(
            store.validate(&upload("noext", b"1")),
            Err(AssetError::UnsupportedFormat(_))
        ));
        assert_eq!(store.validate(&upload("a.WebP", b"1")).expect("ok"), "webp");
    }

    #[test]
    fn rejection_errors_are_client_errors() {
        assert!(AssetError::Empty.is_rejection());
        assert!(!AssetError::Io(std::io::Error::other("disk")).is_rejection());
    }
}
