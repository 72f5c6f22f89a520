//! Authentication API handlers.
//!
//! Account creation and login. Both return a bearer token that the
//! protected routes expect in the `Authorization` header.
//!
//! # Examples
//!
//! Register a new account:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/auth/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "ana@example.com", "name": "Ana", "password": "Secret123"}'
//! ```
//!
//! Login:
//! ```bash
//! curl -X POST http://localhost:6969/api/v1/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "ana@example.com", "password": "Secret123"}'
//! ```

use axum::{Json, extract::State, http::StatusCode};
use pokerdesk::auth::{AuthError, LoginRequest, RegisterRequest, User};
use serde::Serialize;

use super::{AppState, error::ApiResult};
use crate::{logging::log_security_event, metrics};

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

/// Register a new account and log it in.
///
/// # Response
///
/// `201 Created` with the access token and the account:
/// ```json
/// {
///   "access_token": "eyJhbGciOiJIUzI1NiIs...",
///   "user": {"id": 7, "email": "ana@example.com", "name": "Ana", "is_staff": false, "created_at": "..."}
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Malformed email or weak password
/// - `409 Conflict`: Email already registered
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let password = request.password.clone();
    let user = state.auth_manager.register(request).await?;

    let (user, access_token) = state
        .auth_manager
        .login(LoginRequest {
            email: user.email,
            password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(AuthResponse { access_token, user })))
}

/// Exchange email and password for an access token.
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let email = request.email.clone();

    match state.auth_manager.login(request).await {
        Ok((user, access_token)) => {
            metrics::login_attempts_total(true);
            Ok(Json(AuthResponse { access_token, user }))
        }
        Err(e) => {
            metrics::login_attempts_total(false);
            if matches!(e, AuthError::InvalidCredentials) {
                log_security_event("login_failed", None, &format!("email={}", email));
            }
            Err(e.into())
        }
    }
}
