//! Authentication error types.

use crate::db::RepositoryError;
use crate::error::ErrorKind;
use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Storage failure
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Unknown email or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// Email already exists
    #[error("Email already exists")]
    EmailTaken,

    /// Invalid email format
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Blank display name
    #[error("Name must not be blank")]
    MissingName,

    /// Password too weak
    #[error("Password too weak: {0}")]
    WeakPassword(String),

    /// JWT token error
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AuthError {
    /// Error category for the transport layer
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Repository(e) => e.kind(),
            AuthError::HashingFailed => ErrorKind::UpstreamFailure,
            AuthError::InvalidCredentials | AuthError::JwtError(_) => ErrorKind::Unauthorized,
            AuthError::UserNotFound => ErrorKind::NotFound,
            AuthError::EmailTaken => ErrorKind::Conflict,
            AuthError::InvalidEmail(_) | AuthError::MissingName | AuthError::WeakPassword(_) => {
                ErrorKind::InvalidInput
            }
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Repository and JWT errors are sanitized to prevent information disclosure
    /// about the internal system structure.
    pub fn client_message(&self) -> String {
        match self {
            // Sanitize storage errors - don't expose SQL details
            AuthError::Repository(e) => e.client_message(),
            AuthError::HashingFailed => "Internal server error".to_string(),
            // Sanitize JWT errors - don't expose token structure
            AuthError::JwtError(_) => "Authentication failed".to_string(),
            // All other errors are safe to expose
            _ => self.to_string(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
