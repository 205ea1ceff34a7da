//! Image storage for the local backend.

use crate::error::Result;
use crate::model::ImagePayload;
use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

/// Somewhere image bytes can be put, yielding an opaque reference.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store the image and return its reference.
    async fn put(&self, image: &ImagePayload) -> Result<String>;
}

/// Writes images as files into a directory.
///
/// References are `file://` URLs so they stay opaque to callers.
#[derive(Debug, Clone)]
pub struct DirImageStore {
    dir: PathBuf,
}

impl DirImageStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ImageStore for DirImageStore {
    async fn put(&self, image: &ImagePayload) -> Result<String> {
        std::fs::create_dir_all(&self.dir)?;
        let name = format!("{}.{}", Uuid::new_v4(), image.extension());
        let path = self.dir.join(name);
        std::fs::write(&path, &image.bytes)?;
        Ok(format!("file://{}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn png() -> ImagePayload {
        ImagePayload {
            file_name: "hole.PNG".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        }
    }

    #[tokio::test]
    async fn writes_file_with_extension() {
        let temp = TempDir::new().expect("tempdir");
        let store = DirImageStore::new(temp.path().join("images"));
        let reference = store.put(&png()).await.expect("put");
        assert!(reference.starts_with("file://"));
        assert!(reference.ends_with(".png"));
        let path = reference.trim_start_matches("file://");
        assert_eq!(std::fs::read(path).unwrap(), png().bytes);
    }

    #[tokio::test]
    async fn unwritable_dir_is_an_error() {
        let temp = TempDir::new().expect("tempdir");
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"not a dir").unwrap();
        let store = DirImageStore::new(blocker.join("images"));
        assert!(store.put(&png()).await.is_err());
    }
}
