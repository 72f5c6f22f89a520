//! Error classification shared by every domain error.

use serde::Serialize;

/// Transport-independent error category.
///
/// Domain errors map onto one of these so the HTTP layer can pick a status
/// code without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Tournament, registration or user missing
    NotFound,
    /// Request clashes with existing state
    Conflict,
    /// Request is malformed or violates a rule
    InvalidInput,
    /// Caller is not authenticated
    Unauthorized,
    /// Caller is authenticated but lacks the role
    Forbidden,
    /// Repository or infrastructure failure
    UpstreamFailure,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::InvalidInput => write!(f, "invalid_input"),
            ErrorKind::Unauthorized => write!(f, "unauthorized"),
            ErrorKind::Forbidden => write!(f, "forbidden"),
            ErrorKind::UpstreamFailure => write!(f, "upstream_failure"),
        }
    }
}
