//! Registration, login and token refresh

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{
    error::{AppError, AppResult},
    models::{
        user::{AccessResponse, AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
        TokenClaims, TokenType, User, UserSummary,
    },
    repository::{users::DUPLICATE_USERNAME, Repository},
};

use super::tokens::TokenService;

pub const INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const INVALID_REFRESH_TOKEN: &str = "Token is invalid or expired";

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(repository: Repository, tokens: TokenService) -> Self {
        Self { repository, tokens }
    }

    /// Create a user and sign them in
    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthResponse> {
        let (username, password) = request.into_credentials()?;

        if self.repository.users.get_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict {
                field: "username".to_string(),
                message: DUPLICATE_USERNAME.to_string(),
            });
        }

        let hash = hash_password(&password)?;
        let user = self.repository.users.create(&username, &hash).await?;
        tracing::info!("Registered user {}", user.id);

        self.sign_in(&user)
    }

    /// Check credentials and issue a fresh token pair
    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        let (Some(username), Some(password)) = (request.username, request.password) else {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        let Some(user) = self.repository.users.get_by_username(&username).await? else {
            // Hash anyway so unknown usernames take as long as wrong passwords
            hash_password(&password)?;
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !verify_password(&user, &password)? {
            tracing::debug!("Wrong password for user {}", user.id);
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        self.sign_in(&user)
    }

    /// Identity behind a verified access token
    pub async fn current_user(&self, claims: &TokenClaims) -> AppResult<UserSummary> {
        let user = self
            .repository
            .users
            .get_by_id(claims.user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;
        Ok(UserSummary::from(&user))
    }

    /// Exchange a refresh token for a new access token
    pub fn refresh(&self, request: RefreshRequest) -> AppResult<AccessResponse> {
        let token = request
            .refresh
            .ok_or_else(|| AppError::field("refresh", "This field is required."))?;

        let claims = self
            .tokens
            .verify(&token, TokenType::Refresh)
            .ok_or_else(|| AppError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()))?;

        Ok(AccessResponse {
            access: self.tokens.issue_access(&claims)?,
        })
    }

    fn sign_in(&self, user: &User) -> AppResult<AuthResponse> {
        let pair = self.tokens.issue_pair(user)?;
        Ok(AuthResponse {
            user: UserSummary::from(user),
            access: pair.access,
            refresh: pair.refresh,
        })
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Verify a password against the user's stored hash
pub fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
