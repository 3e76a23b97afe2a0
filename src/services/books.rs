//! Book catalog service

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookPatch, FormFields, NewBook},
    repository::Repository,
};

use super::media::MediaService;

#[derive(Clone)]
pub struct BooksService {
    repository: Repository,
    media: MediaService,
}

impl BooksService {
    pub fn new(repository: Repository, media: MediaService) -> Self {
        Self { repository, media }
    }

    pub async fn list(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    pub async fn get_or_404(&self, id: i64) -> AppResult<Book> {
        self.repository
            .books
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    /// Validate the submitted fields and insert a new book
    pub async fn create(&self, fields: &FormFields) -> AppResult<Book> {
        let (mut book, upload) = NewBook::from_fields(fields).map_err(AppError::Validation)?;

        if let Some(file) = upload {
            book.image = Some(self.media.store_image(&file).await?);
        }

        match self.repository.books.insert(&book).await {
            Ok(created) => {
                tracing::info!("Created book {}", created.id);
                Ok(created)
            }
            Err(e) => {
                self.discard_upload(book.image.as_deref()).await;
                Err(e)
            }
        }
    }

    /// Replace only the submitted fields of an existing book
    pub async fn update(&self, id: i64, fields: &FormFields) -> AppResult<Book> {
        self.get_or_404(id).await?;

        let (mut patch, upload) = BookPatch::from_fields(fields).map_err(AppError::Validation)?;

        if let Some(file) = upload {
            patch.image = Some(Some(self.media.store_image(&file).await?));
        }

        let result = self.repository.books.update(id, &patch).await;
        let uploaded = patch.image.as_ref().and_then(|image| image.as_deref());
        match result {
            Ok(Some(book)) => {
                tracing::info!("Updated book {}", book.id);
                Ok(book)
            }
            // Deleted since the lookup above
            Ok(None) => {
                self.discard_upload(uploaded).await;
                Err(AppError::NotFound(format!("Book {} not found", id)))
            }
            Err(e) => {
                self.discard_upload(uploaded).await;
                Err(e)
            }
        }
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if !self.repository.books.delete(id).await? {
            return Err(AppError::NotFound(format!("Book {} not found", id)));
        }
        tracing::info!("Deleted book {}", id);
        Ok(())
    }

    async fn discard_upload(&self, image: Option<&str>) {
        if let Some(reference) = image {
            self.media.discard_image(reference).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{path::Path, sync::Arc};

    use async_trait::async_trait;
    use axum::body::Bytes;
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::MediaConfig,
        models::{FormValue, UploadedFile},
        repository::{memory::MemoryUserStore, BookStore},
    };

    /// 1x1 red RGBA PNG
    const PNG: &[u8] = b"\x89\x50\x4e\x47\x0d\x0a\x1a\x0a\x00\x00\x00\x0d\x49\x48\x44\x52\x00\x00\x00\x01\x00\x00\x00\x01\x08\x06\x00\x00\x00\x1f\x15\xc4\x89\x00\x00\x00\x0d\x49\x44\x41\x54\x78\x9c\x63\xf8\xcf\xc0\xf0\x1f\x00\x05\x00\x01\xff\x89\x99\x3d\x1d\x00\x00\x00\x00\x49\x45\x4e\x44\xae\x42\x60\x82";

    /// Finds every book but never manages to write one
    struct ReadOnlyBooks;

    #[async_trait]
    impl BookStore for ReadOnlyBooks {
        async fn list(&self) -> AppResult<Vec<Book>> {
            Ok(Vec::new())
        }

        async fn get(&self, id: i64) -> AppResult<Option<Book>> {
            let now = Utc::now();
            Ok(Some(Book {
                id,
                title: "Dune".to_string(),
                author: "Frank Herbert".to_string(),
                genre: None,
                release_year: 1965,
                description: String::new(),
                image: None,
                created_at: now,
                updated_at: now,
            }))
        }

        async fn insert(&self, _book: &NewBook) -> AppResult<Book> {
            Err(AppError::Internal("insert failed".to_string()))
        }

        async fn update(&self, _id: i64, _patch: &BookPatch) -> AppResult<Option<Book>> {
            Ok(None)
        }

        async fn delete(&self, _id: i64) -> AppResult<bool> {
            Ok(false)
        }
    }

    fn service(root: &Path) -> BooksService {
        let repository = Repository::with_stores(Arc::new(ReadOnlyBooks), Arc::new(MemoryUserStore::new()));
        let media = MediaService::new(&MediaConfig {
            root: root.to_path_buf(),
            url: "/media".to_string(),
        });
        BooksService::new(repository, media)
    }

    fn fields_with_cover(values: &[(&str, &str)]) -> FormFields {
        let mut fields: FormFields = values
            .iter()
            .map(|(name, value)| (name.to_string(), FormValue::text(*value)))
            .collect();
        fields.insert(
            "image".to_string(),
            FormValue::File(UploadedFile {
                file_name: Some("cover.png".to_string()),
                content_type: Some("image/png".to_string()),
                data: Bytes::from_static(PNG),
            }),
        );
        fields
    }

    async fn stored_covers(root: &Path) -> usize {
        let mut entries = tokio::fs::read_dir(root.join("book_images"))
            .await
            .expect("cover directory was created");
        let mut count = 0;
        while let Ok(Some(_)) = entries.next_entry().await {
            count += 1;
        }
        count
    }

    #[tokio::test]
    async fn failed_insert_removes_stored_cover() {
        let root = std::env::temp_dir().join(format!("books-{}", Uuid::new_v4()));

        let err = service(&root)
            .create(&fields_with_cover(&[("title", "Dune"), ("release_year", "1965")]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(stored_covers(&root).await, 0);
        tokio::fs::remove_dir_all(root).await.unwrap();
    }

    #[tokio::test]
    async fn update_of_vanished_book_removes_stored_cover() {
        let root = std::env::temp_dir().join(format!("books-{}", Uuid::new_v4()));

        let err = service(&root)
            .update(7, &fields_with_cover(&[("genre", "Sci-Fi")]))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(stored_covers(&root).await, 0);
        tokio::fs::remove_dir_all(root).await.unwrap();
    }
}
