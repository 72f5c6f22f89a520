//! Tournament catalog: creation, lookup, status changes and deletion.

use super::{
    errors::{TournamentError, TournamentResult},
    locks::TournamentLocks,
    models::{Tournament, TournamentConfig, TournamentId, TournamentStatus},
};
use crate::auth::{AuthManager, UserId};
use crate::db::SharedRepository;

/// Tournament manager
#[derive(Clone)]
pub struct TournamentManager {
    repo: SharedRepository,
    auth: AuthManager,
    locks: TournamentLocks,
}

impl TournamentManager {
    /// Create a new tournament manager
    ///
    /// `locks` must be the same registry the registration manager uses.
    pub fn new(repo: SharedRepository, auth: AuthManager, locks: TournamentLocks) -> Self {
        Self { repo, auth, locks }
    }

    /// Create a new tournament
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidBlindStructure` - Blind levels malformed
    /// * `TournamentError::InvalidInput` - Name, stack, prices or bonuses malformed
    pub async fn create_tournament(&self, config: TournamentConfig) -> TournamentResult<Tournament> {
        config.validate()?;
        let tournament = self.repo.insert_tournament(&config).await?;

        log::info!(
            "Created tournament {} '{}' starting {}",
            tournament.id,
            tournament.config.name,
            tournament.config.start_time
        );
        Ok(tournament)
    }

    /// Get a tournament
    pub async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Tournament> {
        self.repo
            .get_tournament(id)
            .await?
            .ok_or(TournamentError::TournamentNotFound(id))
    }

    /// List tournaments by start time, optionally filtered by status
    pub async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        Ok(self.repo.list_tournaments(status).await?)
    }

    /// Set the tournament status
    pub async fn update_status(
        &self,
        id: TournamentId,
        status: TournamentStatus,
    ) -> TournamentResult<Tournament> {
        let tournament = self
            .repo
            .update_tournament_status(id, status)
            .await?
            .ok_or(TournamentError::TournamentNotFound(id))?;

        log::info!("Tournament {} is now {}", id, status);
        Ok(tournament)
    }

    /// Delete a tournament that has not started
    ///
    /// # Errors
    ///
    /// * `TournamentError::TournamentNotFound` - Unknown tournament
    /// * `TournamentError::TournamentInProgress` - Status is not pending or a player checked in
    pub async fn delete_tournament(&self, id: TournamentId) -> TournamentResult<()> {
        let _guard = self.locks.acquire(id).await;

        let tournament = self.get_tournament(id).await?;
        if tournament.status != TournamentStatus::Pending {
            return Err(TournamentError::TournamentInProgress);
        }
        let registrations = self.repo.list_registrations(id).await?;
        if registrations.iter().any(|r| r.checked_in) {
            return Err(TournamentError::TournamentInProgress);
        }

        self.remove(id).await?;
        log::info!(
            "Deleted tournament {} with {} registrations",
            id,
            registrations.len()
        );
        Ok(())
    }

    /// Delete a tournament regardless of its state
    ///
    /// The acting staff member must re-enter their password.
    ///
    /// # Errors
    ///
    /// * `TournamentError::Auth(AuthError::InvalidCredentials)` - Password check failed
    /// * `TournamentError::TournamentNotFound` - Unknown tournament
    pub async fn force_delete_tournament(
        &self,
        id: TournamentId,
        staff_id: UserId,
        password: &str,
    ) -> TournamentResult<()> {
        self.auth.verify_user_password(staff_id, password).await?;

        let _guard = self.locks.acquire(id).await;
        self.remove(id).await?;

        log::warn!("Tournament {} force-deleted by user {}", id, staff_id);
        Ok(())
    }

    async fn remove(&self, id: TournamentId) -> TournamentResult<()> {
        if !self.repo.delete_tournament(id).await? {
            return Err(TournamentError::TournamentNotFound(id));
        }
        self.locks.forget(id).await;
        Ok(())
    }
}
