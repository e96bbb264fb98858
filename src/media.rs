// Blob storage for uploaded images. Stored paths are relative to the media root
// and served read-only under `/media/`.

use async_trait::async_trait;
use axum::body::Bytes;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::AppResult;

pub const MEDIA_URL_PREFIX: &str = "/media";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFolder {
    Posts,
    Profiles,
    ChatImages,
}

impl MediaFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaFolder::Posts => "posts",
            MediaFolder::Profiles => "profiles",
            MediaFolder::ChatImages => "chat_images",
        }
    }
}

/// An uploaded file as received from a multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

impl Upload {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Lower-cased extension if the file name names a supported image type.
pub fn image_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

pub fn media_url(path: &str) -> String {
    format!("{}/{}", MEDIA_URL_PREFIX, path)
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Persists the upload and returns its stored path, e.g. `posts/<uuid>.png`.
    async fn save(&self, folder: MediaFolder, upload: &Upload) -> AppResult<String>;
}

pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn save(&self, folder: MediaFolder, upload: &Upload) -> AppResult<String> {
        let ext = image_extension(&upload.file_name).unwrap_or_else(|| "bin".to_string());
        let relative = format!("{}/{}.{}", folder.as_str(), Uuid::new_v4().simple(), ext);

        let dir = self.root.join(folder.as_str());
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(self.root.join(&relative), &upload.bytes).await?;

        tracing::debug!("stored {} bytes at {}", upload.bytes.len(), relative);
        Ok(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("cat.PNG").as_deref(), Some("png"));
        assert_eq!(image_extension("holiday.jpeg").as_deref(), Some("jpeg"));
        assert_eq!(image_extension("notes.txt"), None);
        assert_eq!(image_extension("no_extension"), None);
    }

    #[tokio::test]
    async fn test_fs_store_writes_under_folder() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsMediaStore::new(dir.path());
        let upload = Upload {
            file_name: "sunset.png".to_string(),
            bytes: Bytes::from_static(b"\x89PNG fake"),
        };

        let path = store.save(MediaFolder::Posts, &upload).await.unwrap();
        assert!(path.starts_with("posts/"));
        assert!(path.ends_with(".png"));

        let written = tokio::fs::read(dir.path().join(&path)).await.unwrap();
        assert_eq!(written, b"\x89PNG fake");
        assert_eq!(media_url(&path), format!("/media/{}", path));
    }
}
