//! Book catalog endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::Book,
    AppState,
};

use super::payload::FormBody;

/// Path ids are unsigned decimal integers; anything else matches no book
fn book_id(raw: &str) -> AppResult<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::NotFound(format!("Book {:?} not found", raw)));
    }
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("Book {:?} not found", raw)))
}

/// List all books
#[utoipa::path(
    get,
    path = "/books/",
    tag = "books",
    responses(
        (status = 200, description = "All books", body = Vec<Book>)
    )
)]
pub async fn list_books(State(state): State<AppState>) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.books.list().await?;
    Ok(Json(books))
}

/// Create a book from JSON or multipart form fields
///
/// `title` and `release_year` are required; `author` defaults to
/// "Unknown Author" and `description` to an empty string. A cover can be
/// uploaded as the `image` file part of a multipart request.
#[utoipa::path(
    post,
    path = "/books/create/",
    tag = "books",
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Field errors, keyed by field name"),
        (status = 415, description = "Unsupported body encoding", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    FormBody(fields): FormBody,
) -> AppResult<(StatusCode, Json<Book>)> {
    let book = state.services.books.create(&fields).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Update the supplied fields of a book, leaving the others unchanged
#[utoipa::path(
    put,
    path = "/books/{id}/",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Field errors, keyed by field name"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    FormBody(fields): FormBody,
) -> AppResult<Json<Book>> {
    let id = book_id(&id)?;
    let book = state.services.books.update(id, &fields).await?;
    Ok(Json(book))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{id}/",
    tag = "books",
    params(
        ("id" = i64, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<StatusCode> {
    let id = book_id(&id)?;
    state.services.books.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
