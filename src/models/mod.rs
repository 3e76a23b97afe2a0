//! Data models for Book Inventory

pub mod book;
pub mod form;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookPatch, NewBook};
pub use form::{FormFields, FormValue, UploadedFile};
pub use user::{TokenClaims, TokenType, User, UserSummary};
