//! In-memory stores, used for local runs without a database and in tests

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{users::DUPLICATE_USERNAME, BookStore, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{Book, BookPatch, NewBook, User},
};

#[derive(Debug)]
struct Table<T> {
    last_id: i64,
    rows: BTreeMap<i64, T>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            last_id: 0,
            rows: BTreeMap::new(),
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// In-memory implementation of the book store
#[derive(Debug, Default, Clone)]
pub struct MemoryBookStore {
    books: Arc<RwLock<Table<Book>>>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn list(&self) -> AppResult<Vec<Book>> {
        Ok(self.books.read().await.rows.values().cloned().collect())
    }

    async fn get(&self, id: i64) -> AppResult<Option<Book>> {
        Ok(self.books.read().await.rows.get(&id).cloned())
    }

    async fn insert(&self, book: &NewBook) -> AppResult<Book> {
        let mut table = self.books.write().await;
        let now = Utc::now();
        let record = Book {
            id: table.next_id(),
            title: book.title.clone(),
            author: book.author.clone(),
            genre: book.genre.clone(),
            release_year: book.release_year,
            description: book.description.clone(),
            image: book.image.clone(),
            created_at: now,
            updated_at: now,
        };
        table.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: i64, patch: &BookPatch) -> AppResult<Option<Book>> {
        let mut table = self.books.write().await;
        Ok(table.rows.get_mut(&id).map(|book| {
            patch.apply(book);
            book.updated_at = Utc::now();
            book.clone()
        }))
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        Ok(self.books.write().await.rows.remove(&id).is_some())
    }
}

/// In-memory implementation of the user store
#[derive(Debug, Default, Clone)]
pub struct MemoryUserStore {
    users: Arc<RwLock<Table<User>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_by_id(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.users.read().await.rows.get(&id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .rows
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create(&self, username: &str, password_hash: &str) -> AppResult<User> {
        let mut table = self.users.write().await;
        if table.rows.values().any(|user| user.username == username) {
            return Err(AppError::Conflict {
                field: "username".to_string(),
                message: DUPLICATE_USERNAME.to_string(),
            });
        }
        let user = User {
            id: table.next_id(),
            username: username.to_string(),
            password: password_hash.to_string(),
            date_joined: Utc::now(),
        };
        table.rows.insert(user.id, user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_book(title: &str) -> NewBook {
        NewBook {
            title: title.to_string(),
            author: "Unknown Author".to_string(),
            genre: None,
            release_year: 2000,
            description: String::new(),
            image: None,
        }
    }

    #[tokio::test]
    async fn ids_are_never_reused() {
        let store = MemoryBookStore::new();
        let first = store.insert(&new_book("First")).await.unwrap();
        assert!(store.delete(first.id).await.unwrap());

        let second = store.insert(&new_book("Second")).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(store.get(first.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_missing_book_returns_none() {
        let store = MemoryBookStore::new();
        let patch = BookPatch {
            title: Some("Nope".to_string()),
            ..BookPatch::default()
        };
        assert_eq!(store.update(42, &patch).await.unwrap(), None);
        assert!(!store.delete(42).await.unwrap());
    }

    #[tokio::test]
    async fn list_is_in_id_order() {
        let store = MemoryBookStore::new();
        for title in ["A", "B", "C"] {
            store.insert(&new_book(title)).await.unwrap();
        }
        let titles: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        assert_eq!(titles, ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let store = MemoryUserStore::new();
        store.create("alice", "hash").await.unwrap();

        let err = store.create("alice", "other").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
        assert_eq!(
            store.get_by_username("alice").await.unwrap().unwrap().password,
            "hash"
        );
    }
}
