//! Business logic services

pub mod auth;
pub mod books;
pub mod media;
pub mod tokens;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub books: books::BooksService,
    pub media: media::MediaService,
    pub tokens: tokens::TokenService,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let tokens = tokens::TokenService::new(&config.auth);
        let media = media::MediaService::new(&config.media);

        Self {
            auth: auth::AuthService::new(repository.clone(), tokens.clone()),
            books: books::BooksService::new(repository.clone(), media.clone()),
            media,
            tokens,
            repository,
        }
    }
}
