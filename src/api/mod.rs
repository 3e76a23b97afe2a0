//! API handlers for Book Inventory REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod openapi;
pub mod payload;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts},
    http::{request::Parts, HeaderValue},
    routing::{get, post, put},
    Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    config::CorsConfig,
    error::AppError,
    models::{TokenClaims, TokenType},
    AppState,
};

/// Largest accepted request body, cover uploads included
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub const CREDENTIALS_NOT_PROVIDED: &str = "Authentication credentials were not provided.";
pub const INVALID_TOKEN: &str = "Given token not valid for any token type";

/// Extractor for the user behind a valid `Authorization: Bearer` access token
pub struct AuthenticatedUser(pub TokenClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // A missing header and a non-Bearer scheme are both "no credentials"
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthorized(CREDENTIALS_NOT_PROVIDED.to_string()))?;

        let claims = state
            .services
            .tokens
            .verify(bearer.token(), TokenType::Access)
            .ok_or_else(|| AppError::Unauthorized(INVALID_TOKEN.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);
    let media = state.config.media.clone();

    let mut app = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Books
        .route("/books/", get(books::list_books))
        .route("/books/create/", post(books::create_book))
        .route("/books/:id/", put(books::update_book).delete(books::delete_book))
        // Authentication
        .route("/register/", post(auth::register))
        .route("/login/", post(auth::login))
        .route("/me/", get(auth::me))
        .route("/token/refresh/", post(auth::refresh_token))
        .with_state(state)
        .merge(openapi::create_openapi_router());

    let media_path = media.url.trim_end_matches('/');
    if media.is_served_locally() && !media_path.is_empty() {
        app = app.nest_service(media_path, ServeDir::new(&media.root));
    }

    app.layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allowed_origins.iter().any(|origin| origin == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
}
