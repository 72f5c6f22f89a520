//! Registration lifecycle manager.
//!
//! Every mutating operation takes the tournament lock, loads what it needs,
//! runs the pure ledger/elimination/settlement step and writes the result
//! back before the lock is released.

use super::{
    elimination::{self, EliminationOutcome},
    ledger::{MAX_COUNT, apply_adjustment, increment_rebuys, rebuy_count_delta},
    models::{ManualRegistration, NewRegistration, RebuyEvent, Registration},
    settlement::{self, SettlementOutcome, SettlementRequest},
};
use crate::auth::{AuthManager, UserId};
use crate::db::{RepositoryError, SharedRepository};
use crate::export::{StandingRow, results_csv};
use crate::tournament::{
    RebuyKind, Tournament, TournamentError, TournamentId, TournamentLocks, TournamentResult,
};
use chrono::Utc;

/// Registration manager
#[derive(Clone)]
pub struct RegistrationManager {
    repo: SharedRepository,
    auth: AuthManager,
    locks: TournamentLocks,
    manual_password: String,
}

impl RegistrationManager {
    /// Create a new registration manager
    ///
    /// # Arguments
    ///
    /// * `repo` - Shared repository
    /// * `auth` - Used to create accounts for walk-in players
    /// * `locks` - Lock registry shared with the tournament manager
    /// * `manual_password` - Initial password given to walk-in accounts
    pub fn new(
        repo: SharedRepository,
        auth: AuthManager,
        locks: TournamentLocks,
        manual_password: String,
    ) -> Self {
        Self {
            repo,
            auth,
            locks,
            manual_password,
        }
    }

    /// Register a user for a tournament
    ///
    /// The stack starts at the tournament's starting stack plus the chips of
    /// every selected bonus. Repeated bonus names count once.
    ///
    /// # Errors
    ///
    /// * `TournamentError::TournamentNotFound` - Unknown tournament
    /// * `TournamentError::TournamentAlreadyHasChampion` - Tournament is decided
    /// * `TournamentError::DuplicateRegistration` - User already registered
    /// * `TournamentError::InvalidBonusSelection` - Bonus not offered
    pub async fn register(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        selected_bonuses: Vec<String>,
    ) -> TournamentResult<Registration> {
        let _guard = self.locks.acquire(tournament_id).await;

        let tournament = self.tournament(tournament_id).await?;
        if self.repo.find_champion(tournament_id).await?.is_some() {
            return Err(TournamentError::TournamentAlreadyHasChampion);
        }
        if self
            .repo
            .get_registration(tournament_id, user_id)
            .await?
            .is_some()
        {
            return Err(TournamentError::DuplicateRegistration);
        }

        let mut bonuses: Vec<String> = Vec::with_capacity(selected_bonuses.len());
        for name in selected_bonuses {
            if !bonuses.contains(&name) {
                bonuses.push(name);
            }
        }

        let mut stack = tournament.config.starting_stack;
        for name in &bonuses {
            let bonus = tournament
                .bonus(name)
                .ok_or_else(|| TournamentError::InvalidBonusSelection(name.clone()))?;
            stack = apply_adjustment(stack, bonus.stack);
        }

        let new_registration = NewRegistration {
            tournament_id,
            user_id,
            current_stack: stack,
            selected_bonuses: bonuses,
        };
        let registration = match self.repo.insert_registration(&new_registration).await {
            Ok(registration) => registration,
            Err(RepositoryError::Conflict(_)) => {
                return Err(TournamentError::DuplicateRegistration);
            }
            Err(e) => return Err(e.into()),
        };

        log::info!(
            "User {} registered for tournament {} with {} chips",
            user_id,
            tournament_id,
            registration.current_stack
        );
        Ok(registration)
    }

    /// Register a walk-in player entered by staff
    ///
    /// The player's account is looked up by email and created with the
    /// configured default password if it does not exist.
    ///
    /// # Errors
    ///
    /// * `TournamentError::MissingNameOrEmail` - Name or email blank
    /// * Everything [`RegistrationManager::register`] returns
    pub async fn register_manual(
        &self,
        tournament_id: TournamentId,
        request: ManualRegistration,
    ) -> TournamentResult<Registration> {
        if request.name.trim().is_empty() || request.email.trim().is_empty() {
            return Err(TournamentError::MissingNameOrEmail);
        }

        // Fail before creating an account for a tournament that does not exist
        self.tournament(tournament_id).await?;

        let user = self
            .auth
            .ensure_user(&request.email, &request.name, &self.manual_password)
            .await?;

        self.register(tournament_id, user.id, request.selected_bonuses)
            .await
    }

    /// Mark a player as present
    pub async fn check_in(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> TournamentResult<Registration> {
        let _guard = self.locks.acquire(tournament_id).await;

        let mut registration = self.registration(tournament_id, user_id).await?;
        registration.checked_in = true;
        self.repo.update_registration(&registration).await?;

        log::info!("User {} checked in to tournament {}", user_id, tournament_id);
        Ok(registration)
    }

    /// Add one single or double rebuy
    ///
    /// # Errors
    ///
    /// * `TournamentError::RebuysNotAllowed` - Tournament has no rebuys
    /// * `TournamentError::RebuysAlreadySettled` - Rebuys were already paid for
    pub async fn add_rebuy(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        kind: RebuyKind,
    ) -> TournamentResult<Registration> {
        let _guard = self.locks.acquire(tournament_id).await;

        let tournament = self.tournament(tournament_id).await?;
        let mut registration = self.registration(tournament_id, user_id).await?;

        if !tournament.config.rebuy.allowed {
            return Err(TournamentError::RebuysNotAllowed);
        }
        if registration.rebuys_paid {
            return Err(TournamentError::RebuysAlreadySettled);
        }

        match kind {
            RebuyKind::Single => {
                registration.single_rebuys = increment_rebuys(registration.single_rebuys)?
            }
            RebuyKind::Double => {
                registration.double_rebuys = increment_rebuys(registration.double_rebuys)?
            }
        }
        let chips = tournament.config.rebuy.tier(kind).stack;
        registration.current_stack = apply_adjustment(registration.current_stack, chips);
        registration.rebuy_history.push(RebuyEvent {
            timestamp: Utc::now(),
            kind,
            stack: chips,
        });
        self.repo.update_registration(&registration).await?;

        log::info!(
            "User {} took a {} rebuy in tournament {} (stack {})",
            user_id,
            kind,
            tournament_id,
            registration.current_stack
        );
        Ok(registration)
    }

    /// Add the tournament add-on
    ///
    /// # Errors
    ///
    /// * `TournamentError::AddonsNotAllowed` - Tournament has no add-on
    /// * `TournamentError::AddonAlreadyUsed` - Add-on already taken
    pub async fn add_addon(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> TournamentResult<Registration> {
        let _guard = self.locks.acquire(tournament_id).await;

        let tournament = self.tournament(tournament_id).await?;
        let mut registration = self.registration(tournament_id, user_id).await?;

        if !tournament.config.addon.allowed {
            return Err(TournamentError::AddonsNotAllowed);
        }
        if registration.addon_used {
            return Err(TournamentError::AddonAlreadyUsed);
        }

        registration.current_stack =
            apply_adjustment(registration.current_stack, tournament.config.addon.stack);
        registration.addon_used = true;
        self.repo.update_registration(&registration).await?;

        log::info!("User {} took the add-on in tournament {}", user_id, tournament_id);
        Ok(registration)
    }

    /// Correct a player's rebuy counts
    ///
    /// The stack moves by the chip difference between the old and new counts.
    ///
    /// # Errors
    ///
    /// * `TournamentError::NegativeRebuyCount` - Either count below zero
    /// * `TournamentError::InvalidInput` - A count or the chip difference is too large
    /// * `TournamentError::RebuysAlreadySettled` - Rebuys were already paid for
    pub async fn edit_rebuys(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        single_rebuys: i64,
        double_rebuys: i64,
    ) -> TournamentResult<Registration> {
        if single_rebuys < 0 || double_rebuys < 0 {
            return Err(TournamentError::NegativeRebuyCount);
        }
        let single = u32::try_from(single_rebuys)
            .ok()
            .filter(|c| *c <= MAX_COUNT)
            .ok_or_else(|| TournamentError::InvalidInput("single rebuy count too large".to_string()))?;
        let double = u32::try_from(double_rebuys)
            .ok()
            .filter(|c| *c <= MAX_COUNT)
            .ok_or_else(|| TournamentError::InvalidInput("double rebuy count too large".to_string()))?;

        let _guard = self.locks.acquire(tournament_id).await;

        let mut registration = self.registration(tournament_id, user_id).await?;
        let tournament = self.tournament(tournament_id).await?;
        if registration.rebuys_paid {
            return Err(TournamentError::RebuysAlreadySettled);
        }

        let delta = rebuy_count_delta(
            &tournament.config.rebuy,
            (registration.single_rebuys, registration.double_rebuys),
            (single, double),
        )?;
        registration.current_stack = apply_adjustment(registration.current_stack, delta);
        registration.single_rebuys = single;
        registration.double_rebuys = double;
        self.repo.update_registration(&registration).await?;

        log::info!(
            "Rebuys for user {} in tournament {} set to {}/{} (stack {:+})",
            user_id,
            tournament_id,
            single,
            double,
            delta
        );
        Ok(registration)
    }

    /// Knock a player out, crowning the champion when one player is left
    ///
    /// # Errors
    ///
    /// * `TournamentError::RegistrationNotFound` - Unknown registration
    /// * `TournamentError::AlreadyEliminated` - Player already out
    /// * `TournamentError::NotCheckedIn` - Player never checked in
    pub async fn eliminate(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> TournamentResult<EliminationOutcome> {
        let _guard = self.locks.acquire(tournament_id).await;

        let target = self.registration(tournament_id, user_id).await?;
        let registrations = self.repo.list_registrations(tournament_id).await?;

        let outcome = elimination::eliminate(&registrations, &target)?;
        self.repo.update_registrations(&outcome.changed).await?;

        if let Some(champion) = &outcome.champion {
            log::info!(
                "Tournament {} won by user {}",
                tournament_id,
                champion.user_id
            );
        }
        Ok(outcome)
    }

    /// Settle a player's payment
    ///
    /// # Errors
    ///
    /// * `TournamentError::RegistrationNotFound` - Unknown registration
    /// * `TournamentError::InvalidBonusSelection` - Bonus not offered
    pub async fn settle(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        request: SettlementRequest,
    ) -> TournamentResult<SettlementOutcome> {
        let _guard = self.locks.acquire(tournament_id).await;

        let registration = self.registration(tournament_id, user_id).await?;
        let tournament = self.tournament(tournament_id).await?;

        let outcome = settlement::settle(&registration, &tournament, &request, Utc::now())?;
        self.repo.update_registration(&outcome.registration).await?;

        if request.confirm_payment {
            log::info!(
                "Settled user {} in tournament {}: {} due, stack {:+}",
                user_id,
                tournament_id,
                outcome.amount_due,
                outcome.stack_delta
            );
        } else {
            log::info!(
                "User {} withdrawn from tournament {} after declining payment",
                user_id,
                tournament_id
            );
        }
        Ok(outcome)
    }

    /// Set or clear a player's seat and table
    ///
    /// # Errors
    ///
    /// * `TournamentError::InvalidInput` - Seat or table not positive
    pub async fn assign_seat(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
        seat_number: Option<i64>,
        table_number: Option<i64>,
    ) -> TournamentResult<Registration> {
        let seat_number = positive("seat_number", seat_number)?;
        let table_number = positive("table_number", table_number)?;

        let _guard = self.locks.acquire(tournament_id).await;

        let mut registration = self.registration(tournament_id, user_id).await?;
        registration.seat_number = seat_number;
        registration.table_number = table_number;
        self.repo.update_registration(&registration).await?;

        Ok(registration)
    }

    /// Get one registration
    pub async fn get_registration(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> TournamentResult<Registration> {
        self.registration(tournament_id, user_id).await
    }

    /// List a tournament's registrations in registration order
    pub async fn list_registrations(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Registration>> {
        self.tournament(tournament_id).await?;
        Ok(self.repo.list_registrations(tournament_id).await?)
    }

    /// Results sheet as CSV
    pub async fn results_csv(&self, tournament_id: TournamentId) -> TournamentResult<String> {
        let registrations = self.list_registrations(tournament_id).await?;

        let mut rows = Vec::with_capacity(registrations.len());
        for registration in registrations {
            let email = self
                .repo
                .find_user_by_id(registration.user_id)
                .await?
                .map(|u| u.email)
                .unwrap_or_default();
            rows.push(StandingRow {
                finish_place: registration.finish_place,
                email,
                checked_in: registration.checked_in,
                seat_number: registration.seat_number,
                table_number: registration.table_number,
            });
        }

        Ok(results_csv(&rows)?)
    }

    async fn tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.repo
            .get_tournament(tournament_id)
            .await?
            .ok_or(TournamentError::TournamentNotFound(tournament_id))
    }

    async fn registration(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> TournamentResult<Registration> {
        self.repo
            .get_registration(tournament_id, user_id)
            .await?
            .ok_or(TournamentError::RegistrationNotFound {
                tournament_id,
                user_id,
            })
    }
}

fn positive(field: &str, value: Option<i64>) -> TournamentResult<Option<u32>> {
    match value {
        None => Ok(None),
        Some(v) if v > 0 => u32::try_from(v)
            .ok()
            .filter(|n| *n <= MAX_COUNT)
            .map(Some)
            .ok_or_else(|| TournamentError::InvalidInput(format!("{field} is too large"))),
        Some(_) => Err(TournamentError::InvalidInput(format!(
            "{field} must be positive"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{NewUser, User};
    use crate::db::{InMemoryRepository, TournamentRepository};
    use crate::registration::PaymentStatus;
    use crate::tournament::{Bonus, RebuyTier, TournamentConfig};
    use std::sync::Arc;

    struct Fixture {
        manager: RegistrationManager,
        repo: Arc<InMemoryRepository>,
        tournament: Tournament,
    }

    async fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryRepository::new());
        let auth = AuthManager::new(
            repo.clone(),
            "test_pepper_for_testing_only".to_string(),
            "test_secret_key_for_testing_only_0123456789".to_string(),
        );
        let config = TournamentConfig::new("Thursday Turbo".to_string(), Utc::now(), 10_000, 50)
            .with_rebuys(
                RebuyTier {
                    stack: 10_000,
                    price: 50,
                },
                RebuyTier {
                    stack: 20_000,
                    price: 90,
                },
            )
            .with_addon(15_000, 40)
            .with_bonus(Bonus {
                name: "Early Bird".to_string(),
                stack: 2_000,
                price: 0,
                condition: "seated before level 1".to_string(),
                addon: None,
            });
        let tournament = repo.insert_tournament(&config).await.unwrap();
        let manager = RegistrationManager::new(
            repo.clone(),
            auth,
            TournamentLocks::new(),
            "Welcome123".to_string(),
        );
        Fixture {
            manager,
            repo,
            tournament,
        }
    }

    async fn user(repo: &InMemoryRepository, email: &str) -> User {
        repo.insert_user(&NewUser {
            email: email.to_string(),
            name: email.to_string(),
            password_hash: "hash".to_string(),
            is_staff: false,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_register_with_bonus() {
        let f = fixture().await;
        let ada = user(&f.repo, "ada@example.com").await;
        let registration = f
            .manager
            .register(
                f.tournament.id,
                ada.id,
                vec!["Early Bird".to_string(), "Early Bird".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(registration.current_stack, 12_000);
        assert_eq!(registration.selected_bonuses, vec!["Early Bird".to_string()]);
        assert_eq!(registration.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_register_rejects_unknown_bonus() {
        let f = fixture().await;
        let ada = user(&f.repo, "ada@example.com").await;
        let result = f
            .manager
            .register(f.tournament.id, ada.id, vec!["Bounty".to_string()])
            .await;
        assert!(matches!(result, Err(TournamentError::InvalidBonusSelection(_))));
        assert!(f.repo.get_registration(f.tournament.id, ada.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_unknown_tournament() {
        let f = fixture().await;
        let ada = user(&f.repo, "ada@example.com").await;
        assert!(matches!(
            f.manager.register(77, ada.id, vec![]).await,
            Err(TournamentError::TournamentNotFound(77))
        ));
    }

    #[tokio::test]
    async fn test_manual_registration_creates_account_once() {
        let f = fixture().await;
        let request = ManualRegistration {
            name: "Walk In".to_string(),
            email: "Walkin@Example.com".to_string(),
            selected_bonuses: vec![],
        };
        let registration = f
            .manager
            .register_manual(f.tournament.id, request.clone())
            .await
            .unwrap();
        let account = f
            .repo
            .find_user_by_email("walkin@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(registration.user_id, account.id);
        assert!(!account.is_staff);

        assert!(matches!(
            f.manager.register_manual(f.tournament.id, request).await,
            Err(TournamentError::DuplicateRegistration)
        ));
    }

    #[tokio::test]
    async fn test_manual_registration_requires_name_and_email() {
        let f = fixture().await;
        let result = f
            .manager
            .register_manual(
                f.tournament.id,
                ManualRegistration {
                    name: "  ".to_string(),
                    email: "x@example.com".to_string(),
                    selected_bonuses: vec![],
                },
            )
            .await;
        assert!(matches!(result, Err(TournamentError::MissingNameOrEmail)));
    }

    #[tokio::test]
    async fn test_check_in_unknown_registration() {
        let f = fixture().await;
        assert!(matches!(
            f.manager.check_in(f.tournament.id, 42).await,
            Err(TournamentError::RegistrationNotFound { user_id: 42, .. })
        ));
    }

    #[tokio::test]
    async fn test_rebuys_disallowed() {
        let f = fixture().await;
        let config = TournamentConfig::new("Freezeout".to_string(), Utc::now(), 10_000, 50);
        let freezeout = f.repo.insert_tournament(&config).await.unwrap();
        let ada = user(&f.repo, "ada@example.com").await;
        f.manager.register(freezeout.id, ada.id, vec![]).await.unwrap();

        assert!(matches!(
            f.manager.add_rebuy(freezeout.id, ada.id, RebuyKind::Single).await,
            Err(TournamentError::RebuysNotAllowed)
        ));
        assert!(matches!(
            f.manager.add_addon(freezeout.id, ada.id).await,
            Err(TournamentError::AddonsNotAllowed)
        ));
    }

    #[tokio::test]
    async fn test_addon_only_once() {
        let f = fixture().await;
        let ada = user(&f.repo, "ada@example.com").await;
        f.manager.register(f.tournament.id, ada.id, vec![]).await.unwrap();

        let with_addon = f.manager.add_addon(f.tournament.id, ada.id).await.unwrap();
        assert_eq!(with_addon.current_stack, 25_000);
        assert!(with_addon.addon_used);
        assert!(matches!(
            f.manager.add_addon(f.tournament.id, ada.id).await,
            Err(TournamentError::AddonAlreadyUsed)
        ));
    }

    #[tokio::test]
    async fn test_edit_rebuys_validation() {
        let f = fixture().await;
        let ada = user(&f.repo, "ada@example.com").await;
        assert!(matches!(
            f.manager.edit_rebuys(f.tournament.id, ada.id, -1, 0).await,
            Err(TournamentError::NegativeRebuyCount)
        ));
        assert!(matches!(
            f.manager.edit_rebuys(f.tournament.id, ada.id, 1, 0).await,
            Err(TournamentError::RegistrationNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_edit_rebuys_rejects_oversized_correction() {
        let f = fixture().await;
        let config = TournamentConfig::new("High Roller".to_string(), Utc::now(), 10_000, 50)
            .with_rebuys(
                RebuyTier {
                    stack: 10_000_000_000_000,
                    price: 50,
                },
                RebuyTier {
                    stack: 20_000,
                    price: 90,
                },
            );
        let tournament = f.repo.insert_tournament(&config).await.unwrap();
        let ada = user(&f.repo, "ada@example.com").await;
        f.manager.register(tournament.id, ada.id, vec![]).await.unwrap();

        assert!(matches!(
            f.manager.edit_rebuys(tournament.id, ada.id, 4_000_000, 0).await,
            Err(TournamentError::InvalidInput(_))
        ));
        assert!(matches!(
            f.manager
                .edit_rebuys(tournament.id, ada.id, 0, i64::from(i32::MAX) + 1)
                .await,
            Err(TournamentError::InvalidInput(_))
        ));

        let unchanged = f.repo.get_registration(tournament.id, ada.id).await.unwrap().unwrap();
        assert_eq!(unchanged.single_rebuys, 0);
        assert_eq!(unchanged.current_stack, 10_000);
    }

    #[tokio::test]
    async fn test_assign_seat() {
        let f = fixture().await;
        let ada = user(&f.repo, "ada@example.com").await;
        f.manager.register(f.tournament.id, ada.id, vec![]).await.unwrap();

        let seated = f
            .manager
            .assign_seat(f.tournament.id, ada.id, Some(3), Some(2))
            .await
            .unwrap();
        assert_eq!(seated.seat_number, Some(3));
        assert_eq!(seated.table_number, Some(2));

        assert!(matches!(
            f.manager.assign_seat(f.tournament.id, ada.id, Some(0), None).await,
            Err(TournamentError::InvalidInput(_))
        ));
        assert!(matches!(
            f.manager
                .assign_seat(f.tournament.id, ada.id, None, Some(i64::from(i32::MAX) + 1))
                .await,
            Err(TournamentError::InvalidInput(_))
        ));

        let cleared = f
            .manager
            .assign_seat(f.tournament.id, ada.id, None, None)
            .await
            .unwrap();
        assert_eq!(cleared.seat_number, None);
    }

    #[tokio::test]
    async fn test_settle_persists() {
        let f = fixture().await;
        let ada = user(&f.repo, "ada@example.com").await;
        f.manager.register(f.tournament.id, ada.id, vec![]).await.unwrap();
        f.manager
            .add_rebuy(f.tournament.id, ada.id, RebuyKind::Single)
            .await
            .unwrap();

        let outcome = f
            .manager
            .settle(
                f.tournament.id,
                ada.id,
                SettlementRequest {
                    confirm_payment: true,
                    include_buy_in: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.amount_due, 100);

        let stored = f
            .manager
            .get_registration(f.tournament.id, ada.id)
            .await
            .unwrap();
        assert!(stored.rebuys_paid);
        assert!(stored.buy_in_paid);
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_results_csv() {
        let f = fixture().await;
        let ada = user(&f.repo, "ada@example.com").await;
        let bob = user(&f.repo, "bob@example.com").await;
        for id in [ada.id, bob.id] {
            f.manager.register(f.tournament.id, id, vec![]).await.unwrap();
            f.manager.check_in(f.tournament.id, id).await.unwrap();
        }
        f.manager.eliminate(f.tournament.id, ada.id).await.unwrap();

        let csv = f.manager.results_csv(f.tournament.id).await.unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "Place,Email,Checked-In,Seat,Table");
        assert_eq!(lines[1], "1,bob@example.com,Yes,,");
        assert_eq!(lines[2], "2,ada@example.com,Yes,,");
    }
}
