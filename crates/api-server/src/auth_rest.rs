//! Account REST API endpoints.

use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::rest::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use binthere_core::types::{
    Ack, AuthResponse, LoginRequest, PasswordUpdateRequest, PublicUser, RegisterRequest,
};

/// POST /api/auth/register — Create an account.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Validation error or duplicate user", body = crate::error::ErrorResponse),
    )
)]
pub async fn handle_register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let (token, user) =
        state
            .accounts
            .register(&request.username, &request.email, &request.password)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            token,
            user,
        }),
    ))
}

/// POST /api/auth/login — Exchange credentials for a token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing email or password", body = crate::error::ErrorResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse),
    )
)]
pub async fn handle_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let (token, user) = state.accounts.login(&request.email, &request.password)?;
    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        user,
    }))
}

/// GET /api/auth/me — The authenticated user's profile.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Authentication",
    responses(
        (status = 200, description = "Current user", body = PublicUser),
        (status = 401, description = "Access token required", body = crate::error::ErrorResponse),
        (status = 403, description = "Invalid or expired token", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn handle_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    Ok(Json(state.accounts.current_user(claims.id)?))
}

/// DELETE /api/auth/me — Delete the authenticated user's account.
#[utoipa::path(
    delete,
    path = "/api/auth/me",
    tag = "Authentication",
    responses(
        (status = 200, description = "Account deleted", body = Ack),
        (status = 401, description = "Access token required", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn handle_delete_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Ack>, ApiError> {
    state.accounts.delete_user(claims.id)?;
    Ok(Json(Ack::ok("User account deleted successfully")))
}

/// PUT /api/auth/password — Change the authenticated user's password.
#[utoipa::path(
    put,
    path = "/api/auth/password",
    tag = "Authentication",
    request_body = PasswordUpdateRequest,
    responses(
        (status = 200, description = "Password updated", body = Ack),
        (status = 400, description = "Validation error", body = crate::error::ErrorResponse),
        (status = 401, description = "Current password incorrect or token missing", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn handle_update_password(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(request): Json<PasswordUpdateRequest>,
) -> Result<Json<Ack>, ApiError> {
    state.accounts.update_password(
        claims.id,
        &request.current_password,
        &request.new_password,
    )?;
    Ok(Json(Ack::ok("Password updated successfully")))
}

/// GET /api/auth/users — List all users.
#[utoipa::path(
    get,
    path = "/api/auth/users",
    tag = "Authentication",
    responses(
        (status = 200, description = "All users", body = [PublicUser]),
        (status = 401, description = "Access token required", body = crate::error::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn handle_list_users(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Json<Vec<PublicUser>> {
    Json(state.accounts.list_users())
}
