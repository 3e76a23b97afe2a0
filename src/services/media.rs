//! Cover image storage

use std::path::PathBuf;

use uuid::Uuid;

use crate::{
    config::MediaConfig,
    error::{AppError, AppResult},
    models::{book::INVALID_IMAGE, UploadedFile},
};

/// Sub-directory of the media root holding book covers
const BOOK_IMAGES: &str = "book_images";

#[derive(Clone)]
pub struct MediaService {
    root: PathBuf,
    url: String,
}

impl MediaService {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: config.root.clone(),
            url: config.url.trim_end_matches('/').to_string(),
        }
    }

    /// Write an uploaded cover under a fresh name and return its public reference
    pub async fn store_image(&self, file: &UploadedFile) -> AppResult<String> {
        let extension = file
            .image_extension()
            .ok_or_else(|| AppError::field("image", INVALID_IMAGE))?;

        let dir = self.root.join(BOOK_IMAGES);
        tokio::fs::create_dir_all(&dir).await?;

        let name = format!("{}.{}", Uuid::new_v4().simple(), extension);
        let path = dir.join(&name);
        if let Err(e) = tokio::fs::write(&path, &file.data).await {
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e.into());
        }

        tracing::info!(
            "Stored image {} ({} bytes, uploaded as {:?})",
            name,
            file.data.len(),
            file.file_name
        );

        Ok(format!("{}/{}/{}", self.url, BOOK_IMAGES, name))
    }

    /// Remove a cover written by `store_image` that no book ended up referencing
    pub async fn discard_image(&self, reference: &str) {
        let prefix = format!("{}/{}/", self.url, BOOK_IMAGES);
        let Some(name) = reference.strip_prefix(&prefix).filter(|name| !name.contains('/')) else {
            tracing::warn!("Not discarding image outside {}: {}", prefix, reference);
            return;
        };

        let path = self.root.join(BOOK_IMAGES).join(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::info!("Discarded unreferenced image {}", name),
            Err(e) => tracing::warn!("Failed to remove unreferenced image {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    #[tokio::test]
    async fn stores_image_under_book_images() {
        let root = std::env::temp_dir().join(format!("media-{}", Uuid::new_v4()));
        let media = MediaService::new(&MediaConfig {
            root: root.clone(),
            url: "/media/".to_string(),
        });
        let file = UploadedFile {
            file_name: Some("cover.gif".to_string()),
            content_type: Some("image/gif".to_string()),
            data: Bytes::from_static(b"GIF89a\x01\x00\x01\x00"),
        };

        let url = media.store_image(&file).await.unwrap();

        assert!(url.starts_with("/media/book_images/"));
        assert!(url.ends_with(".gif"));
        let name = url.rsplit('/').next().unwrap();
        let stored = tokio::fs::read(root.join(BOOK_IMAGES).join(name)).await.unwrap();
        assert_eq!(stored, file.data.as_ref());

        tokio::fs::remove_dir_all(root).await.unwrap();
    }

    #[tokio::test]
    async fn discards_only_its_own_images() {
        let root = std::env::temp_dir().join(format!("media-{}", Uuid::new_v4()));
        let media = MediaService::new(&MediaConfig {
            root: root.clone(),
            url: "/media".to_string(),
        });
        let file = UploadedFile {
            file_name: None,
            content_type: None,
            data: Bytes::from_static(b"GIF89a\x01\x00\x01\x00"),
        };

        let url = media.store_image(&file).await.unwrap();
        let name = url.rsplit('/').next().unwrap().to_string();
        let keep = tokio::fs::write(root.join("keep.txt"), b"keep").await;
        assert!(keep.is_ok());

        media.discard_image("/media/book_images/../keep.txt").await;
        media.discard_image("https://elsewhere.example.com/book_images/x.png").await;
        assert!(root.join("keep.txt").exists());

        media.discard_image(&url).await;
        assert!(!root.join(BOOK_IMAGES).join(name).exists());

        tokio::fs::remove_dir_all(root).await.unwrap();
    }

    #[tokio::test]
    async fn refuses_non_image_content() {
        let media = MediaService::new(&MediaConfig::default());
        let file = UploadedFile {
            file_name: None,
            content_type: None,
            data: Bytes::from_static(b"plain text"),
        };
        assert!(matches!(
            media.store_image(&file).await,
            Err(AppError::Validation(_))
        ));
    }
}
