//! Local file storage for product images and avatars.
//!
//! Files live under the configured upload directory and are served back by
//! the static `/api/images` route, so a stored file's URL is always
//! `/api/images/` followed by its path relative to the upload root.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

use stockroom_core::{ProductId, UserId};

/// URL prefix under which the upload directory is served.
pub const PUBLIC_PREFIX: &str = "/api/images/";

/// Extensions accepted for uploaded images.
pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Errors that can occur while storing files.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("uploaded file is empty")]
    EmptyFile,

    #[error("unsupported file type, expected one of: jpg, jpeg, png, gif, webp")]
    UnsupportedType,

    #[error("file system error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stores uploads beneath a root directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The upload root served at [`PUBLIC_PREFIX`].
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store a product image under a random name and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::EmptyFile` or `UnsupportedType` for bad uploads,
    /// and `StorageError::Io` if the file cannot be written.
    pub async fn save_product_image(
        &self,
        product_id: ProductId,
        filename: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        let ext = validate_upload(filename, bytes)?;
        let relative = format!("products/{product_id}/{}.{ext}", Uuid::new_v4());
        self.write(&relative, bytes).await?;
        Ok(public_url(&relative))
    }

    /// Store a user's avatar, replacing any earlier one, and return its URL.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::EmptyFile` or `UnsupportedType` for bad uploads,
    /// and `StorageError::Io` if the file cannot be written.
    pub async fn save_avatar(
        &self,
        user_id: UserId,
        filename: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        let ext = validate_upload(filename, bytes)?;

        let dir = self.root.join("avatars").join(user_id.to_string());
        if let Err(e) = tokio::fs::remove_dir_all(&dir).await
            && e.kind() != ErrorKind::NotFound
        {
            return Err(e.into());
        }

        let relative = format!("avatars/{user_id}/avatar.{ext}");
        self.write(&relative, bytes).await?;
        Ok(public_url(&relative))
    }

    /// Delete the file behind a public URL. Missing files are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file exists but cannot be removed.
    pub async fn delete_url(&self, url: &str) -> Result<(), StorageError> {
        let Some(path) = self.path_for_url(url) else {
            tracing::warn!(url, "Refusing to delete file outside the upload directory");
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every stored image of a product.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory exists but cannot be removed.
    pub async fn remove_product_images(&self, product_id: ProductId) -> Result<(), StorageError> {
        let dir = self.root.join("products").join(product_id.to_string());
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Map a public URL back to a path, rejecting anything that would escape
    /// the upload root.
    #[must_use]
    pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let relative = Path::new(url.strip_prefix(PUBLIC_PREFIX)?);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }

    async fn write(&self, relative: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "Stored upload");
        Ok(())
    }
}

fn public_url(relative: &str) -> String {
    format!("{PUBLIC_PREFIX}{relative}")
}

/// Check an upload and return its normalized (lowercase) extension.
///
/// # Errors
///
/// Returns `StorageError::EmptyFile` or `UnsupportedType`.
pub fn validate_upload(filename: Option<&str>, bytes: &[u8]) -> Result<String, StorageError> {
    if bytes.is_empty() {
        return Err(StorageError::EmptyFile);
    }

    let ext = filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or(StorageError::UnsupportedType)?;

    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(StorageError::UnsupportedType)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_storage() -> FileStorage {
        FileStorage::new(std::env::temp_dir().join(format!("stockroom-test-{}", Uuid::new_v4())))
    }

    #[test]
    fn test_validate_upload() {
        assert_eq!(validate_upload(Some("photo.JPG"), b"x").unwrap(), "jpg");
        assert_eq!(validate_upload(Some("a.b.webp"), b"x").unwrap(), "webp");
        assert!(matches!(
            validate_upload(Some("photo.png"), b""),
            Err(StorageError::EmptyFile)
        ));
        assert!(matches!(
            validate_upload(Some("script.svg"), b"x"),
            Err(StorageError::UnsupportedType)
        ));
        assert!(matches!(
            validate_upload(None, b"x"),
            Err(StorageError::UnsupportedType)
        ));
    }

    #[test]
    fn test_path_for_url_rejects_traversal() {
        let storage = FileStorage::new("/srv/uploads");
        assert_eq!(
            storage.path_for_url("/api/images/products/1/a.png"),
            Some(PathBuf::from("/srv/uploads/products/1/a.png"))
        );
        assert_eq!(storage.path_for_url("/api/images/../etc/passwd"), None);
        assert_eq!(storage.path_for_url("/elsewhere/a.png"), None);
    }

    #[tokio::test]
    async fn test_product_image_round_trip() {
        let storage = temp_storage();
        let url = storage
            .save_product_image(ProductId::new(5), Some("mug.png"), b"png-bytes")
            .await
            .unwrap();
        assert!(url.starts_with("/api/images/products/5/"));
        assert!(url.ends_with(".png"));

        let path = storage.path_for_url(&url).unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"png-bytes");

        storage.delete_url(&url).await.unwrap();
        assert!(!path.exists());
        // Deleting twice is fine.
        storage.delete_url(&url).await.unwrap();

        storage.remove_product_images(ProductId::new(5)).await.unwrap();
        tokio::fs::remove_dir_all(storage.root()).await.unwrap();
    }

    #[tokio::test]
    async fn test_avatar_replaces_previous_file() {
        let storage = temp_storage();
        let first = storage
            .save_avatar(UserId::new(2), Some("me.jpg"), b"one")
            .await
            .unwrap();
        let second = storage
            .save_avatar(UserId::new(2), Some("me.webp"), b"two")
            .await
            .unwrap();

        assert_eq!(second, "/api/images/avatars/2/avatar.webp");
        assert!(!storage.path_for_url(&first).unwrap().exists());
        assert!(storage.path_for_url(&second).unwrap().exists());

        tokio::fs::remove_dir_all(storage.root()).await.unwrap();
    }
}
