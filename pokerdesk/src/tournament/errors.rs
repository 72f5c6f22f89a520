//! Tournament and registration error types.

use super::models::TournamentId;
use crate::auth::{AuthError, UserId};
use crate::db::RepositoryError;
use crate::error::ErrorKind;
use thiserror::Error;

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Tournament not found
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    /// No registration for this user in this tournament
    #[error("Registration not found for user {user_id} in tournament {tournament_id}")]
    RegistrationNotFound {
        tournament_id: TournamentId,
        user_id: UserId,
    },

    /// User already registered
    #[error("Player already registered")]
    DuplicateRegistration,

    /// Registration closed because a champion exists
    #[error("Tournament already has a champion")]
    TournamentAlreadyHasChampion,

    /// Requested bonus is not defined by the tournament
    #[error("Unknown bonus: {0}")]
    InvalidBonusSelection(String),

    /// Manual registration without name or email
    #[error("Name and email are required")]
    MissingNameOrEmail,

    /// Tournament does not allow rebuys
    #[error("Rebuys are not allowed in this tournament")]
    RebuysNotAllowed,

    /// Rebuys were already paid for
    #[error("Rebuys have already been settled")]
    RebuysAlreadySettled,

    /// Tournament does not offer an add-on
    #[error("Add-ons are not allowed in this tournament")]
    AddonsNotAllowed,

    /// Add-on already taken
    #[error("Add-on already used")]
    AddonAlreadyUsed,

    /// Rebuy correction below zero
    #[error("Rebuy counts must not be negative")]
    NegativeRebuyCount,

    /// Player is already out
    #[error("Player already eliminated")]
    AlreadyEliminated,

    /// Player never checked in
    #[error("Player is not checked in")]
    NotCheckedIn,

    /// Delete attempted after play started
    #[error("Tournament has started or has checked-in players")]
    TournamentInProgress,

    /// Blind structure is malformed
    #[error("Invalid blind structure: {0}")]
    InvalidBlindStructure(String),

    /// Other invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Authentication failure during a tournament operation
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Storage failure
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// CSV rendering failure
    #[error("Export error: {0}")]
    Export(#[from] csv::Error),
}

impl TournamentError {
    /// Error category for the transport layer
    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::TournamentNotFound(_) | TournamentError::RegistrationNotFound { .. } => {
                ErrorKind::NotFound
            }
            TournamentError::DuplicateRegistration
            | TournamentError::TournamentAlreadyHasChampion
            | TournamentError::RebuysAlreadySettled
            | TournamentError::AddonAlreadyUsed
            | TournamentError::AlreadyEliminated
            | TournamentError::NotCheckedIn
            | TournamentError::TournamentInProgress => ErrorKind::Conflict,
            TournamentError::InvalidBonusSelection(_)
            | TournamentError::MissingNameOrEmail
            | TournamentError::NegativeRebuyCount
            | TournamentError::InvalidBlindStructure(_)
            | TournamentError::InvalidInput(_) => ErrorKind::InvalidInput,
            // Not permitted by tournament rules: the request conflicts with configuration
            TournamentError::RebuysNotAllowed | TournamentError::AddonsNotAllowed => {
                ErrorKind::Conflict
            }
            TournamentError::Auth(e) => e.kind(),
            TournamentError::Repository(e) => e.kind(),
            TournamentError::Export(_) => ErrorKind::UpstreamFailure,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::Repository(e) => e.client_message(),
            TournamentError::Auth(e) => e.client_message(),
            TournamentError::Export(_) => "Internal server error".to_string(),
            TournamentError::RegistrationNotFound { .. } => "Registration not found".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
