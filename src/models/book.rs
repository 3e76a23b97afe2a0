//! Book model and request field validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::form::{FormFields, FormValue, UploadedFile};
use crate::error::FieldErrors;

/// Author stored when a book is created without one
pub const DEFAULT_AUTHOR: &str = "Unknown Author";

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";
const NOT_A_STRING: &str = "Not a valid string.";
const INVALID_INTEGER: &str = "A valid integer is required.";
const NOT_A_FILE: &str = "The submitted data was not a file. Check the encoding type on the form.";
const EMPTY_FILE: &str = "The submitted file is empty.";
pub const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Book record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub release_year: i32,
    pub description: String,
    /// Public reference of the cover image
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated fields of a book to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: Option<String>,
    pub release_year: i32,
    pub description: String,
    pub image: Option<String>,
}

/// Validated partial update. `None` leaves the stored value untouched;
/// `Some(None)` on a nullable column clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genre: Option<Option<String>>,
    pub release_year: Option<i32>,
    pub description: Option<String>,
    pub image: Option<Option<String>>,
}

impl BookPatch {
    pub fn apply(&self, book: &mut Book) {
        if let Some(ref title) = self.title {
            book.title = title.clone();
        }
        if let Some(ref author) = self.author {
            book.author = author.clone();
        }
        if let Some(ref genre) = self.genre {
            book.genre = genre.clone();
        }
        if let Some(release_year) = self.release_year {
            book.release_year = release_year;
        }
        if let Some(ref description) = self.description {
            book.description = description.clone();
        }
        if let Some(ref image) = self.image {
            book.image = image.clone();
        }
    }
}

#[derive(Clone, Copy)]
struct TextRules {
    max_length: Option<usize>,
    allow_blank: bool,
    allow_null: bool,
}

const TITLE: TextRules = TextRules { max_length: Some(255), allow_blank: false, allow_null: false };
const AUTHOR: TextRules = TextRules { max_length: Some(255), allow_blank: false, allow_null: false };
const GENRE: TextRules = TextRules { max_length: Some(100), allow_blank: true, allow_null: true };
const DESCRIPTION: TextRules = TextRules { max_length: None, allow_blank: true, allow_null: false };

enum ImageInput {
    Upload(UploadedFile),
    Clear,
}

/// Reads typed values out of raw fields, collecting every error
struct FieldReader<'a> {
    fields: &'a FormFields,
    errors: FieldErrors,
}

impl<'a> FieldReader<'a> {
    fn new(fields: &'a FormFields) -> Self {
        Self {
            fields,
            errors: FieldErrors::new(),
        }
    }

    fn error(&mut self, name: &str, message: impl Into<String>) {
        self.errors
            .entry(name.to_string())
            .or_default()
            .push(message.into());
    }

    fn require(&mut self, name: &str) -> bool {
        if self.fields.contains_key(name) {
            true
        } else {
            self.error(name, REQUIRED);
            false
        }
    }

    /// `None` when absent or invalid, `Some(None)` for an accepted null
    fn text(&mut self, name: &str, rules: TextRules) -> Option<Option<String>> {
        let fields = self.fields;
        let value = match fields.get(name)? {
            FormValue::Json(Value::Null) if rules.allow_null => return Some(None),
            FormValue::Json(Value::Null) => {
                self.error(name, NOT_NULL);
                return None;
            }
            FormValue::Json(Value::String(s)) => s.trim().to_string(),
            FormValue::Json(Value::Number(n)) => n.to_string(),
            FormValue::Json(_) | FormValue::File(_) => {
                self.error(name, NOT_A_STRING);
                return None;
            }
        };

        if value.is_empty() && !rules.allow_blank {
            self.error(name, NOT_BLANK);
            return None;
        }
        if let Some(max) = rules.max_length {
            if value.chars().count() > max {
                self.error(name, format!("Ensure this field has no more than {} characters.", max));
                return None;
            }
        }
        Some(Some(value))
    }

    fn required_text(&mut self, name: &str, rules: TextRules) -> Option<String> {
        if self.require(name) {
            self.text(name, rules).flatten()
        } else {
            None
        }
    }

    fn integer(&mut self, name: &str) -> Option<i32> {
        let fields = self.fields;
        let text = match fields.get(name)? {
            FormValue::Json(Value::Null) => {
                self.error(name, NOT_NULL);
                return None;
            }
            FormValue::Json(Value::Number(n)) => n.to_string(),
            FormValue::Json(Value::String(s)) => s.trim().to_string(),
            FormValue::Json(_) | FormValue::File(_) => {
                self.error(name, INVALID_INTEGER);
                return None;
            }
        };

        // "1999", "1999.", "1999.0" and 1999.0 are all 1999
        let digits = match text.split_once('.') {
            Some((whole, fraction)) if fraction.bytes().all(|b| b == b'0') => whole,
            _ => text.as_str(),
        };
        let (negative, magnitude) = match digits.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, digits.strip_prefix('+').unwrap_or(digits)),
        };
        if magnitude.is_empty() || !magnitude.bytes().all(|b| b.is_ascii_digit()) {
            self.error(name, INVALID_INTEGER);
            return None;
        }

        // Only overflow is left to fail once the digits are checked
        let value = match magnitude.parse::<i64>() {
            Ok(v) if negative => -v,
            Ok(v) => v,
            Err(_) if negative => i64::MIN,
            Err(_) => i64::MAX,
        };

        if value > i64::from(i32::MAX) {
            self.error(name, format!("Ensure this value is less than or equal to {}.", i32::MAX));
            None
        } else if value < i64::from(i32::MIN) {
            self.error(name, format!("Ensure this value is greater than or equal to {}.", i32::MIN));
            None
        } else {
            i32::try_from(value).ok()
        }
    }

    fn required_integer(&mut self, name: &str) -> Option<i32> {
        if self.require(name) {
            self.integer(name)
        } else {
            None
        }
    }

    fn image(&mut self, name: &str) -> Option<ImageInput> {
        let fields = self.fields;
        match fields.get(name)? {
            FormValue::File(file) if file.data.is_empty() => {
                self.error(name, EMPTY_FILE);
                None
            }
            FormValue::File(file) if file.verified_image_extension().is_none() => {
                self.error(name, INVALID_IMAGE);
                None
            }
            FormValue::File(file) => Some(ImageInput::Upload(file.clone())),
            FormValue::Json(Value::Null) => Some(ImageInput::Clear),
            FormValue::Json(Value::String(s)) if s.is_empty() => Some(ImageInput::Clear),
            FormValue::Json(_) => {
                self.error(name, NOT_A_FILE);
                None
            }
        }
    }
}

impl NewBook {
    /// Validate a create request. Returns the book and the cover upload, if any.
    pub fn from_fields(fields: &FormFields) -> Result<(Self, Option<UploadedFile>), FieldErrors> {
        let mut reader = FieldReader::new(fields);

        let title = reader.required_text("title", TITLE);
        let author = reader.text("author", AUTHOR).flatten();
        let genre = reader.text("genre", GENRE).flatten();
        let release_year = reader.required_integer("release_year");
        let description = reader.text("description", DESCRIPTION).flatten();
        let upload = match reader.image("image") {
            Some(ImageInput::Upload(file)) => Some(file),
            Some(ImageInput::Clear) | None => None,
        };

        match (title, release_year) {
            (Some(title), Some(release_year)) if reader.errors.is_empty() => Ok((
                NewBook {
                    title,
                    author: author.unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
                    genre,
                    release_year,
                    description: description.unwrap_or_default(),
                    image: None,
                },
                upload,
            )),
            _ => Err(reader.errors),
        }
    }
}

impl BookPatch {
    /// Validate an update request; only the supplied fields are checked.
    pub fn from_fields(fields: &FormFields) -> Result<(Self, Option<UploadedFile>), FieldErrors> {
        let mut reader = FieldReader::new(fields);

        let mut patch = BookPatch {
            title: reader.text("title", TITLE).flatten(),
            author: reader.text("author", AUTHOR).flatten(),
            genre: reader.text("genre", GENRE),
            release_year: reader.integer("release_year"),
            description: reader.text("description", DESCRIPTION).flatten(),
            image: None,
        };
        let upload = match reader.image("image") {
            Some(ImageInput::Upload(file)) => Some(file),
            Some(ImageInput::Clear) => {
                patch.image = Some(None);
                None
            }
            None => None,
        };

        if reader.errors.is_empty() {
            Ok((patch, upload))
        } else {
            Err(reader.errors)
        }
    }
}
