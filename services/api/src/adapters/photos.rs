//! services/api/src/adapters/photos.rs
//!
//! Local-disk implementation of the `PhotoStorage` port. Stored references are
//! paths relative to the storage root, e.g. `catches/<user id>/<uuid>.jpg`.

use anglerhub_core::ports::{PhotoStorage, PortError, PortResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error};
use uuid::Uuid;

const CATCH_PHOTO_DIR: &str = "catches";

#[derive(Debug, Clone)]
pub struct LocalPhotoStorage {
    root: PathBuf,
}

impl LocalPhotoStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves a stored reference below the root. References that could
    /// escape it are rejected.
    fn resolve(&self, reference: &str) -> PortResult<PathBuf> {
        let relative = Path::new(reference);
        let safe = !reference.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(PortError::NotFound(format!("photo {}", reference)));
        }
        Ok(self.root.join(relative))
    }
}

fn extension_of(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "jpg".to_string())
}

#[async_trait]
impl PhotoStorage for LocalPhotoStorage {
    async fn store(&self, owner: Uuid, original_name: &str, data: Bytes) -> PortResult<String> {
        let reference = format!(
            "{}/{}/{}.{}",
            CATCH_PHOTO_DIR,
            owner,
            Uuid::new_v4(),
            extension_of(original_name)
        );
        let target = self.root.join(&reference);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                error!("Failed to create photo directory {:?}: {}", parent, e);
                PortError::Unexpected(e.to_string())
            })?;
        }
        tokio::fs::write(&target, &data).await.map_err(|e| {
            error!("Failed to write photo {:?}: {}", target, e);
            PortError::Unexpected(e.to_string())
        })?;
        debug!("Stored {} bytes at {}", data.len(), reference);
        Ok(reference)
    }

    fn is_owned_by(&self, reference: &str, owner: Uuid) -> bool {
        let owner = owner.to_string();
        let mut parts = Path::new(reference).components();
        matches!(
            (parts.next(), parts.next(), parts.next(), parts.next()),
            (
                Some(Component::Normal(dir)),
                Some(Component::Normal(user)),
                Some(Component::Normal(_)),
                None,
            ) if dir == CATCH_PHOTO_DIR && user == owner.as_str()
        )
    }

    async fn delete(&self, reference: &str) -> PortResult<()> {
        let target = self.resolve(reference)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!("Failed to delete photo {:?}: {}", target, e);
                Err(PortError::Unexpected(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_then_delete_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalPhotoStorage::new(dir.path());

        let owner = Uuid::new_v4();
        let reference = storage
            .store(owner, "Lake Bass.JPG", Bytes::from_static(b"not really a jpeg"))
            .await
            .unwrap();
        assert!(reference.starts_with(&format!("catches/{owner}/")));
        assert!(reference.ends_with(".jpg"));
        let on_disk = dir.path().join(&reference);
        assert_eq!(std::fs::read(&on_disk).unwrap(), b"not really a jpeg");

        storage.delete(&reference).await.unwrap();
        assert!(!on_disk.exists());
        // Deleting again is not an error.
        storage.delete(&reference).await.unwrap();
    }

    #[tokio::test]
    async fn references_outside_the_root_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalPhotoStorage::new(dir.path().join("photos"));

        assert!(storage.delete("../secrets.txt").await.is_err());
        assert!(storage.delete("/etc/passwd").await.is_err());
        assert!(storage.delete("").await.is_err());
    }

    #[tokio::test]
    async fn photos_belong_to_their_uploader_only() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalPhotoStorage::new(dir.path());
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        let reference = storage
            .store(owner, "pike.png", Bytes::from_static(b"png"))
            .await
            .unwrap();

        assert!(storage.is_owned_by(&reference, owner));
        assert!(!storage.is_owned_by(&reference, other));
        assert!(!storage.is_owned_by(&format!("catches/{owner}"), owner));
        assert!(!storage.is_owned_by(&format!("catches/{owner}/../x.jpg"), owner));
        assert!(!storage.is_owned_by(&format!("{reference}/extra"), owner));
    }

    #[test]
    fn odd_extensions_fall_back_to_jpg() {
        assert_eq!(extension_of("photo.PNG"), "png");
        assert_eq!(extension_of("photo"), "jpg");
        assert_eq!(extension_of("photo.j?g"), "jpg");
    }
}
