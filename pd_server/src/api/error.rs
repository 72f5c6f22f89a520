//! Mapping of domain errors onto HTTP responses.
//!
//! Every handler returns `Result<_, ApiError>`. The body is always
//! `{"error": "<message>"}` with storage details stripped.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pokerdesk::{ErrorKind, auth::AuthError, tournament::TournamentError};
use serde_json::json;

/// Handler error
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Tournament(#[from] TournamentError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid access token
    #[error("Authentication required")]
    Unauthorized,

    /// Authenticated but not staff
    #[error("Staff access required")]
    Forbidden,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Tournament(e) => e.kind(),
            ApiError::Auth(e) => e.kind(),
            ApiError::BadRequest(_) => ErrorKind::InvalidInput,
            ApiError::Unauthorized => ErrorKind::Unauthorized,
            ApiError::Forbidden => ErrorKind::Forbidden,
        }
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::Tournament(e) => e.client_message(),
            ApiError::Auth(e) => e.client_message(),
            other => other.to_string(),
        }
    }
}

/// HTTP status for an error category
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::UpstreamFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        if kind == ErrorKind::UpstreamFailure {
            tracing::error!("Upstream failure: {}", self);
        }

        let body = json!({ "error": self.client_message() });
        (status_for(kind), Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
