//! User model, authentication payloads and token claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, FieldErrors};

/// Stored user. `password` holds the Argon2 PHC string, never plaintext.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub date_joined: DateTime<Utc>,
}

/// Public view of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(
        required(message = "This field is required."),
        length(max = 150, message = "Ensure this field has no more than 150 characters.")
    )]
    pub username: Option<String>,
    #[validate(required(message = "This field is required."))]
    pub password: Option<String>,
}

impl RegisterRequest {
    /// Validate and return `(username, password)`
    pub fn into_credentials(self) -> Result<(String, String), AppError> {
        let mut errors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => field_errors(&e),
        };

        let username = self.username.map(|u| u.trim().to_string());
        if username.as_deref() == Some("") {
            errors
                .entry("username".to_string())
                .or_default()
                .push("This field may not be blank.".to_string());
        }
        if self.password.as_deref() == Some("") {
            errors
                .entry("password".to_string())
                .or_default()
                .push("This field may not be blank.".to_string());
        }

        match (username, self.password) {
            (Some(username), Some(password)) if errors.is_empty() => Ok((username, password)),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

/// Convert `validator` errors into the field error map
pub fn field_errors(errors: &validator::ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

/// Login request. Missing fields count as wrong credentials.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Token refresh request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

/// Issued user identity and token pair
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserSummary,
    pub access: String,
    pub refresh: String,
}

/// Fresh access token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessResponse {
    pub access: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims carried by access and refresh tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub token_type: TokenType,
    pub user_id: i64,
    pub username: String,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

impl TokenClaims {
    /// Sign the claims with HS256
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Verify signature and expiry, then decode
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(username: Option<&str>, password: Option<&str>) -> Result<(String, String), AppError> {
        RegisterRequest {
            username: username.map(str::to_string),
            password: password.map(str::to_string),
        }
        .into_credentials()
    }

    fn errors_of(result: Result<(String, String), AppError>) -> FieldErrors {
        match result {
            Err(AppError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn register_accepts_trimmed_username() {
        let (username, password) = register(Some("  alice "), Some("s3cret")).unwrap();
        assert_eq!(username, "alice");
        assert_eq!(password, "s3cret");
    }

    #[test]
    fn register_requires_both_fields() {
        let errors = errors_of(register(None, None));
        assert_eq!(errors["username"], vec!["This field is required."]);
        assert_eq!(errors["password"], vec!["This field is required."]);
    }

    #[test]
    fn register_rejects_blank_and_long_usernames() {
        let errors = errors_of(register(Some(" "), Some("")));
        assert_eq!(errors["username"], vec!["This field may not be blank."]);
        assert_eq!(errors["password"], vec!["This field may not be blank."]);

        let long = "u".repeat(151);
        let errors = errors_of(register(Some(&long), Some("pw")));
        assert_eq!(
            errors["username"],
            vec!["Ensure this field has no more than 150 characters."]
        );
    }

    #[test]
    fn claims_round_trip_through_signed_token() {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            token_type: TokenType::Access,
            user_id: 7,
            username: "alice".to_string(),
            jti: "abc".to_string(),
            exp: now + 60,
            iat: now,
        };

        let token = claims.create_token("secret").unwrap();
        let decoded = TokenClaims::from_token(&token, "secret").unwrap();
        assert_eq!(decoded.user_id, 7);
        assert_eq!(decoded.token_type, TokenType::Access);

        assert!(TokenClaims::from_token(&token, "other-secret").is_err());
    }
}
