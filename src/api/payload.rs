//! Request body extractors

use axum::{
    async_trait,
    body::Bytes,
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::header::CONTENT_TYPE,
    Form,
};
use axum_extra::extract::Multipart;
use serde_json::Value;

use crate::{
    error::AppError,
    models::{FormFields, FormValue, UploadedFile},
};

/// JSON body whose rejections are answered like every other API error
#[derive(Debug, axum::extract::FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                AppError::UnsupportedMediaType("Unsupported media type in request.".to_string())
            }
            other => AppError::BadRequest(format!("JSON parse error - {}", other.body_text())),
        }
    }
}

/// Raw fields of a JSON, multipart or urlencoded form body
#[derive(Debug)]
pub struct FormBody(pub FormFields);

#[async_trait]
impl<S> FromRequest<S> for FormBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        let fields = match mime.as_str() {
            "application/json" => json_fields(req, state).await?,
            "multipart/form-data" => multipart_fields(req, state).await?,
            "application/x-www-form-urlencoded" => urlencoded_fields(req, state).await?,
            "" => {
                let body = read_bytes(req, state).await?;
                if !body.is_empty() {
                    return Err(unsupported(&content_type));
                }
                FormFields::new()
            }
            _ => return Err(unsupported(&content_type)),
        };

        Ok(FormBody(fields))
    }
}

fn unsupported(content_type: &str) -> AppError {
    AppError::UnsupportedMediaType(format!("Unsupported media type \"{}\" in request.", content_type))
}

async fn read_bytes<S: Send + Sync>(req: Request, state: &S) -> Result<Bytes, AppError> {
    Bytes::from_request(req, state)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

async fn json_fields<S: Send + Sync>(req: Request, state: &S) -> Result<FormFields, AppError> {
    let body = read_bytes(req, state).await?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(FormFields::new());
    }

    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("JSON parse error - {}", e)))?;

    match value {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(name, value)| (name, FormValue::Json(value)))
            .collect()),
        other => Err(AppError::field(
            "non_field_errors",
            format!("Invalid data. Expected a dictionary, but got {}.", json_kind(&other)),
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

async fn multipart_fields<S: Send + Sync>(req: Request, state: &S) -> Result<FormFields, AppError> {
    let mut multipart = Multipart::from_request(req, state)
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart form parse error - {}", e)))?;

    let mut fields = FormFields::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart form parse error - {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Multipart form parse error - {}", e)))?;

        let value = match file_name {
            Some(file_name) => FormValue::File(UploadedFile {
                file_name: Some(file_name),
                content_type,
                data,
            }),
            None => FormValue::text(String::from_utf8_lossy(&data).into_owned()),
        };
        // Last value wins for repeated names
        fields.insert(name, value);
    }

    Ok(fields)
}

async fn urlencoded_fields<S: Send + Sync>(req: Request, state: &S) -> Result<FormFields, AppError> {
    let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;

    Ok(pairs
        .into_iter()
        .map(|(name, value)| (name, FormValue::text(value)))
        .collect())
}
