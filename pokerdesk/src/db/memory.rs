//! In-process `TournamentRepository` with the same uniqueness rules as the
//! PostgreSQL schema.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::repository::{RepositoryError, RepositoryResult, TournamentRepository};
use crate::auth::{NewUser, User, UserId};
use crate::registration::{NewRegistration, Registration, RegistrationId};
use crate::tournament::{Tournament, TournamentConfig, TournamentId, TournamentStatus};

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<UserId, User>,
    tournaments: BTreeMap<TournamentId, Tournament>,
    registrations: BTreeMap<RegistrationId, Registration>,
    next_user_id: UserId,
    next_tournament_id: TournamentId,
    next_registration_id: RegistrationId,
}

impl MemoryState {
    /// Reject a write that would leave two champions in one tournament
    fn check_single_champion(&self, pending: &[Registration]) -> RepositoryResult<()> {
        let mut merged: HashMap<RegistrationId, &Registration> =
            self.registrations.iter().map(|(id, r)| (*id, r)).collect();
        for registration in pending {
            merged.insert(registration.id, registration);
        }

        let mut champions: HashMap<TournamentId, usize> = HashMap::new();
        for registration in merged.values().filter(|r| r.finish_place == Some(1)) {
            let count = champions.entry(registration.tournament_id).or_default();
            *count += 1;
            if *count > 1 {
                return Err(RepositoryError::Conflict(
                    "idx_registrations_one_champion".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Repository kept entirely in memory
#[derive(Default)]
pub struct InMemoryRepository {
    state: RwLock<MemoryState>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TournamentRepository for InMemoryRepository {
    async fn insert_user(&self, user: &NewUser) -> RepositoryResult<User> {
        let mut state = self.state.write().await;
        let email = user.email.to_lowercase();
        if state.users.values().any(|u| u.email == email) {
            return Err(RepositoryError::Conflict("users_email_key".to_string()));
        }

        state.next_user_id += 1;
        let stored = User {
            id: state.next_user_id,
            email,
            name: user.name.clone(),
            password_hash: user.password_hash.clone(),
            is_staff: user.is_staff,
            created_at: Utc::now(),
        };
        state.users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let email = email.to_lowercase();
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, user_id: UserId) -> RepositoryResult<Option<User>> {
        Ok(self.state.read().await.users.get(&user_id).cloned())
    }

    async fn insert_tournament(&self, config: &TournamentConfig) -> RepositoryResult<Tournament> {
        let mut state = self.state.write().await;
        state.next_tournament_id += 1;
        let tournament = Tournament {
            id: state.next_tournament_id,
            config: config.clone(),
            status: TournamentStatus::Pending,
            created_at: Utc::now(),
        };
        state.tournaments.insert(tournament.id, tournament.clone());
        Ok(tournament)
    }

    async fn get_tournament(&self, id: TournamentId) -> RepositoryResult<Option<Tournament>> {
        Ok(self.state.read().await.tournaments.get(&id).cloned())
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> RepositoryResult<Vec<Tournament>> {
        let state = self.state.read().await;
        let mut tournaments: Vec<Tournament> = state
            .tournaments
            .values()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect();
        tournaments.sort_by_key(|t| (t.config.start_time, t.id));
        Ok(tournaments)
    }

    async fn update_tournament_status(
        &self,
        id: TournamentId,
        status: TournamentStatus,
    ) -> RepositoryResult<Option<Tournament>> {
        let mut state = self.state.write().await;
        Ok(state.tournaments.get_mut(&id).map(|t| {
            t.status = status;
            t.clone()
        }))
    }

    async fn delete_tournament(&self, id: TournamentId) -> RepositoryResult<bool> {
        let mut state = self.state.write().await;
        let existed = state.tournaments.remove(&id).is_some();
        state.registrations.retain(|_, r| r.tournament_id != id);
        Ok(existed)
    }

    async fn insert_registration(
        &self,
        registration: &NewRegistration,
    ) -> RepositoryResult<Registration> {
        let mut state = self.state.write().await;
        if !state.tournaments.contains_key(&registration.tournament_id)
            || !state.users.contains_key(&registration.user_id)
        {
            return Err(RepositoryError::NotFound);
        }
        if state.registrations.values().any(|r| {
            r.tournament_id == registration.tournament_id && r.user_id == registration.user_id
        }) {
            return Err(RepositoryError::Conflict(
                "tournament_registrations_tournament_id_user_id_key".to_string(),
            ));
        }

        state.next_registration_id += 1;
        let stored = registration
            .clone()
            .into_registration(state.next_registration_id, Utc::now());
        state.registrations.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_registration(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> RepositoryResult<Option<Registration>> {
        let state = self.state.read().await;
        Ok(state
            .registrations
            .values()
            .find(|r| r.tournament_id == tournament_id && r.user_id == user_id)
            .cloned())
    }

    async fn list_registrations(
        &self,
        tournament_id: TournamentId,
    ) -> RepositoryResult<Vec<Registration>> {
        let state = self.state.read().await;
        Ok(state
            .registrations
            .values()
            .filter(|r| r.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn find_champion(
        &self,
        tournament_id: TournamentId,
    ) -> RepositoryResult<Option<Registration>> {
        let state = self.state.read().await;
        Ok(state
            .registrations
            .values()
            .find(|r| r.tournament_id == tournament_id && r.finish_place == Some(1))
            .cloned())
    }

    async fn update_registration(&self, registration: &Registration) -> RepositoryResult<()> {
        self.update_registrations(std::slice::from_ref(registration))
            .await
    }

    async fn update_registrations(&self, registrations: &[Registration]) -> RepositoryResult<()> {
        let mut state = self.state.write().await;
        if registrations
            .iter()
            .any(|r| !state.registrations.contains_key(&r.id))
        {
            return Err(RepositoryError::NotFound);
        }
        state.check_single_champion(registrations)?;

        for registration in registrations {
            if let Some(stored) = state.registrations.get_mut(&registration.id) {
                // Identity columns are never rewritten
                let registered_at = stored.registered_at;
                *stored = Registration {
                    id: stored.id,
                    tournament_id: stored.tournament_id,
                    user_id: stored.user_id,
                    registered_at,
                    ..registration.clone()
                };
            }
        }
        Ok(())
    }
}
