//! Authentication endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{
        user::{AccessResponse, AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
        UserSummary,
    },
    AppState,
};

use super::{payload::JsonBody, AuthenticatedUser};

/// Register a new user and issue a token pair
#[utoipa::path(
    post,
    path = "/register/",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User created", body = AuthResponse),
        (status = 400, description = "Field errors, or the username is already taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    let response = state.services.auth.register(request).await?;
    Ok(Json(response))
}

/// Authenticate with username and password
#[utoipa::path(
    post,
    path = "/login/",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let response = state.services.auth.login(request).await?;
    Ok(Json(response))
}

/// Get the user identified by the bearer token
#[utoipa::path(
    get,
    path = "/me/",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserSummary),
        (status = 401, description = "Missing, invalid or expired token", body = crate::error::ErrorResponse)
    )
)]
pub async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UserSummary>> {
    let user = state.services.auth.current_user(&claims).await?;
    Ok(Json(user))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/token/refresh/",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessResponse),
        (status = 401, description = "Invalid or expired refresh token", body = crate::error::ErrorResponse)
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RefreshRequest>,
) -> AppResult<Json<AccessResponse>> {
    let response = state.services.auth.refresh(request)?;
    Ok(Json(response))
}
