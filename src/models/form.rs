//! Raw request fields, shared by JSON and multipart bodies

use std::{collections::BTreeMap, io::Cursor};

use axum::body::Bytes;
use image::{io::Reader as ImageReader, ImageFormat};
use serde_json::Value;

/// Request fields keyed by name, before validation
pub type FormFields = BTreeMap<String, FormValue>;

/// A single submitted field
#[derive(Debug, Clone)]
pub enum FormValue {
    /// JSON value, or the text of a multipart part
    Json(Value),
    /// Multipart file part
    File(UploadedFile),
}

impl FormValue {
    pub fn text(value: impl Into<String>) -> Self {
        FormValue::Json(Value::String(value.into()))
    }
}

/// File part of a multipart request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

fn extension_of(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("png"),
        ImageFormat::Jpeg => Some("jpg"),
        ImageFormat::Gif => Some("gif"),
        ImageFormat::WebP => Some("webp"),
        ImageFormat::Bmp => Some("bmp"),
        _ => None,
    }
}

impl UploadedFile {
    /// File extension of a supported image format, guessed from the leading bytes
    pub fn image_extension(&self) -> Option<&'static str> {
        image::guess_format(&self.data).ok().and_then(extension_of)
    }

    /// Extension of the upload only if the whole file decodes as an image
    pub fn verified_image_extension(&self) -> Option<&'static str> {
        let extension = self.image_extension()?;
        let decoded = ImageReader::new(Cursor::new(self.data.as_ref()))
            .with_guessed_format()
            .map_err(image::ImageError::IoError)
            .and_then(|reader| reader.decode());

        match decoded {
            Ok(_) => Some(extension),
            Err(e) => {
                tracing::debug!("Rejected upload {:?}: {}", self.file_name, e);
                None
            }
        }
    }
}
