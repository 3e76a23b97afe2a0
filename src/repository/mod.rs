//! Repository layer for book and user storage

pub mod books;
pub mod memory;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{Book, BookPatch, NewBook, User},
};

/// Book persistence
#[async_trait]
pub trait BookStore: Send + Sync {
    /// All books in id order
    async fn list(&self) -> AppResult<Vec<Book>>;

    async fn get(&self, id: i64) -> AppResult<Option<Book>>;

    async fn insert(&self, book: &NewBook) -> AppResult<Book>;

    /// Apply `patch` and refresh `updated_at`. `None` when the book does not exist.
    async fn update(&self, id: i64, patch: &BookPatch) -> AppResult<Option<Book>>;

    /// `false` when the book does not exist
    async fn delete(&self, id: i64) -> AppResult<bool>;
}

/// User persistence, keyed by the unique username
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_id(&self, id: i64) -> AppResult<Option<User>>;

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>>;

    /// Fails with `AppError::Conflict` when the username is taken
    async fn create(&self, username: &str, password_hash: &str) -> AppResult<User>;
}

/// Main repository struct holding the configured stores
#[derive(Clone)]
pub struct Repository {
    pool: Option<Pool<Postgres>>,
    pub books: Arc<dyn BookStore>,
    pub users: Arc<dyn UserStore>,
}

impl Repository {
    /// Create a repository backed by PostgreSQL
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::PgBookStore::new(pool.clone())),
            users: Arc::new(users::PgUserStore::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Create a repository that keeps everything in process memory
    pub fn in_memory() -> Self {
        Self::with_stores(
            Arc::new(memory::MemoryBookStore::new()),
            Arc::new(memory::MemoryUserStore::new()),
        )
    }

    pub fn with_stores(books: Arc<dyn BookStore>, users: Arc<dyn UserStore>) -> Self {
        Self {
            pool: None,
            books,
            users,
        }
    }

    /// Check that the backing database answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(ref pool) = self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}
