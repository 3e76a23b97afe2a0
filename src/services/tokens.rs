//! Signed bearer token issuance and verification

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{TokenClaims, TokenType, User},
};

/// Access and refresh token issued together
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Clone)]
pub struct TokenService {
    secret: String,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            access_lifetime: Duration::minutes(config.access_token_minutes),
            refresh_lifetime: Duration::hours(config.refresh_token_hours),
        }
    }

    /// Mint a fresh access/refresh pair for `user`
    pub fn issue_pair(&self, user: &User) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access: self.issue(user.id, &user.username, TokenType::Access)?,
            refresh: self.issue(user.id, &user.username, TokenType::Refresh)?,
        })
    }

    /// Mint an access token for the identity carried by a refresh token
    pub fn issue_access(&self, refresh: &TokenClaims) -> AppResult<String> {
        self.issue(refresh.user_id, &refresh.username, TokenType::Access)
    }

    fn issue(&self, user_id: i64, username: &str, token_type: TokenType) -> AppResult<String> {
        let lifetime = match token_type {
            TokenType::Access => self.access_lifetime,
            TokenType::Refresh => self.refresh_lifetime,
        };
        let now = Utc::now();

        let claims = TokenClaims {
            token_type,
            user_id,
            username: username.to_string(),
            jti: Uuid::new_v4().simple().to_string(),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
        };

        claims
            .create_token(&self.secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Decode a token of the expected type. `None` if it is malformed,
    /// tampered with, expired, or of the other type.
    pub fn verify(&self, token: &str, expected: TokenType) -> Option<TokenClaims> {
        match TokenClaims::from_token(token, &self.secret) {
            Ok(claims) if claims.token_type == expected => Some(claims),
            Ok(claims) => {
                tracing::debug!("Rejected {:?} token where {:?} was expected", claims.token_type, expected);
                None
            }
            Err(e) => {
                tracing::debug!("Rejected token: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&AuthConfig::default())
    }

    fn user() -> User {
        User {
            id: 3,
            username: "alice".to_string(),
            password: String::new(),
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn issued_pair_encodes_user_identity() {
        let tokens = service();
        let pair = tokens.issue_pair(&user()).unwrap();

        let access = tokens.verify(&pair.access, TokenType::Access).unwrap();
        assert_eq!(access.user_id, 3);
        assert_eq!(access.username, "alice");
        assert_eq!(access.exp - access.iat, 60 * 60);

        let refresh = tokens.verify(&pair.refresh, TokenType::Refresh).unwrap();
        assert_eq!(refresh.exp - refresh.iat, 24 * 60 * 60);
        assert_ne!(access.jti, refresh.jti);
    }

    #[test]
    fn token_types_are_not_interchangeable() {
        let tokens = service();
        let pair = tokens.issue_pair(&user()).unwrap();

        assert!(tokens.verify(&pair.refresh, TokenType::Access).is_none());
        assert!(tokens.verify(&pair.access, TokenType::Refresh).is_none());
    }

    #[test]
    fn expired_and_foreign_tokens_are_rejected() {
        let tokens = service();
        let past = Utc::now() - Duration::hours(2);
        let expired = TokenClaims {
            token_type: TokenType::Access,
            user_id: 3,
            username: "alice".to_string(),
            jti: "old".to_string(),
            exp: (past + Duration::minutes(60)).timestamp(),
            iat: past.timestamp(),
        }
        .create_token(&AuthConfig::default().jwt_secret)
        .unwrap();
        assert!(tokens.verify(&expired, TokenType::Access).is_none());

        let foreign = TokenService::new(&AuthConfig {
            jwt_secret: "someone-else".to_string(),
            ..AuthConfig::default()
        })
        .issue_pair(&user())
        .unwrap();
        assert!(tokens.verify(&foreign.access, TokenType::Access).is_none());
        assert!(tokens.verify("not.a.token", TokenType::Access).is_none());
    }

    #[test]
    fn refreshed_access_token_keeps_identity() {
        let tokens = service();
        let pair = tokens.issue_pair(&user()).unwrap();
        let refresh = tokens.verify(&pair.refresh, TokenType::Refresh).unwrap();

        let access = tokens.issue_access(&refresh).unwrap();
        let claims = tokens.verify(&access, TokenType::Access).unwrap();
        assert_eq!(claims.user_id, 3);
        assert_eq!(claims.username, "alice");
    }
}
