//! Repository trait definitions for testability and dependency injection.
//!
//! The managers only see [`TournamentRepository`]; production wires in
//! [`PgTournamentRepository`] and tests use the in-memory implementation.

use async_trait::async_trait;
use sqlx::{PgExecutor, PgPool, Row, postgres::PgRow};
use std::{sync::Arc, time::Duration};
use thiserror::Error;

use super::timeouts::{DEFAULT_TRANSACTION_TIMEOUT, TimeoutError, with_default_timeout, with_timeout};
use crate::auth::{NewUser, User, UserId};
use crate::error::ErrorKind;
use crate::registration::{NewRegistration, PaymentStatus, RebuyEvent, Registration};
use crate::tournament::{Tournament, TournamentConfig, TournamentId, TournamentStatus};

/// Storage errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unique constraint violated
    #[error("Constraint violation: {0}")]
    Conflict(String),

    /// Row targeted by an update does not exist
    #[error("Record not found")]
    NotFound,

    /// Stored value could not be decoded
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.constraint().unwrap_or("unique").to_string())
            }
            _ => RepositoryError::Database(err),
        }
    }
}

impl From<TimeoutError> for RepositoryError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => RepositoryError::Timeout(duration),
            TimeoutError::Database(e) => e.into(),
        }
    }
}

impl RepositoryError {
    /// Error category for the transport layer
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::Conflict(_) => ErrorKind::Conflict,
            RepositoryError::NotFound => ErrorKind::NotFound,
            _ => ErrorKind::UpstreamFailure,
        }
    }

    /// Get a client-safe error message that doesn't leak SQL details
    pub fn client_message(&self) -> String {
        match self {
            RepositoryError::Timeout(_) => "Storage timed out, try again".to_string(),
            RepositoryError::Conflict(_) => "Conflicting record already exists".to_string(),
            RepositoryError::NotFound => "Record not found".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Data store for users, tournaments and registrations
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Create a user; duplicate emails fail with `Conflict`
    async fn insert_user(&self, user: &NewUser) -> RepositoryResult<User>;

    /// Find user by (lowercase) email
    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>>;

    /// Find user by ID
    async fn find_user_by_id(&self, user_id: UserId) -> RepositoryResult<Option<User>>;

    /// Store a tournament with status `pending`
    async fn insert_tournament(&self, config: &TournamentConfig) -> RepositoryResult<Tournament>;

    async fn get_tournament(&self, id: TournamentId) -> RepositoryResult<Option<Tournament>>;

    /// List tournaments ordered by start time
    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> RepositoryResult<Vec<Tournament>>;

    async fn update_tournament_status(
        &self,
        id: TournamentId,
        status: TournamentStatus,
    ) -> RepositoryResult<Option<Tournament>>;

    /// Delete a tournament and its registrations; returns whether it existed
    async fn delete_tournament(&self, id: TournamentId) -> RepositoryResult<bool>;

    /// Create a registration; a second one for the same user fails with `Conflict`
    async fn insert_registration(
        &self,
        registration: &NewRegistration,
    ) -> RepositoryResult<Registration>;

    async fn get_registration(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> RepositoryResult<Option<Registration>>;

    /// List registrations in registration order
    async fn list_registrations(
        &self,
        tournament_id: TournamentId,
    ) -> RepositoryResult<Vec<Registration>>;

    /// Registration holding finish place 1, if any
    async fn find_champion(
        &self,
        tournament_id: TournamentId,
    ) -> RepositoryResult<Option<Registration>>;

    /// Overwrite the mutable fields of one registration
    async fn update_registration(&self, registration: &Registration) -> RepositoryResult<()>;

    /// Overwrite several registrations atomically
    async fn update_registrations(&self, registrations: &[Registration]) -> RepositoryResult<()>;
}

/// Shared handle used by the managers
pub type SharedRepository = Arc<dyn TournamentRepository>;

const USER_COLUMNS: &str = "id, email, name, password_hash, is_staff, created_at";

const TOURNAMENT_COLUMNS: &str = "id, config, status, created_at";

const REGISTRATION_COLUMNS: &str = "id, tournament_id, user_id, checked_in, current_stack,
    selected_bonuses, bonuses_paid, bonus_addons_used, addon_used, addon_paid,
    single_rebuys, double_rebuys, rebuy_history, eliminated, elimination_order,
    finish_place, payment_status, buy_in_paid, rebuys_paid, payment_timestamp,
    seat_number, table_number, registered_at";

/// Default PostgreSQL implementation of `TournamentRepository`
#[derive(Clone)]
pub struct PgTournamentRepository {
    pool: Arc<PgPool>,
}

impl PgTournamentRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

fn user_from_row(r: &PgRow) -> User {
    User {
        id: r.get("id"),
        email: r.get("email"),
        name: r.get("name"),
        password_hash: r.get("password_hash"),
        is_staff: r.get("is_staff"),
        created_at: r.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    }
}

fn tournament_from_row(r: &PgRow) -> RepositoryResult<Tournament> {
    let config: TournamentConfig = serde_json::from_value(r.get("config"))?;
    let status: String = r.get("status");
    let status = status
        .parse()
        .map_err(|_| RepositoryError::InvalidData(format!("tournament status '{}'", status)))?;

    Ok(Tournament {
        id: r.get("id"),
        config,
        status,
        created_at: r.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    })
}

fn count_from_row(r: &PgRow, column: &str) -> RepositoryResult<u32> {
    let value: i32 = r.get(column);
    u32::try_from(value)
        .map_err(|_| RepositoryError::InvalidData(format!("{} '{}'", column, value)))
}

fn optional_count_from_row(r: &PgRow, column: &str) -> RepositoryResult<Option<u32>> {
    r.get::<Option<i32>, _>(column)
        .map(|value| {
            u32::try_from(value)
                .map_err(|_| RepositoryError::InvalidData(format!("{} '{}'", column, value)))
        })
        .transpose()
}

/// Counts are stored in `INTEGER` columns
fn count_to_column(column: &str, value: u32) -> Result<i32, sqlx::Error> {
    i32::try_from(value).map_err(|_| {
        sqlx::Error::Encode(format!("{} {} does not fit an INTEGER column", column, value).into())
    })
}

fn optional_count_to_column(column: &str, value: Option<u32>) -> Result<Option<i32>, sqlx::Error> {
    value.map(|v| count_to_column(column, v)).transpose()
}

fn registration_from_row(r: &PgRow) -> RepositoryResult<Registration> {
    let payment_status: String = r.get("payment_status");
    let payment_status = PaymentStatus::from_db(&payment_status).ok_or_else(|| {
        RepositoryError::InvalidData(format!("payment status '{}'", payment_status))
    })?;
    let rebuy_history: Vec<RebuyEvent> = serde_json::from_value(r.get("rebuy_history"))?;

    Ok(Registration {
        id: r.get("id"),
        tournament_id: r.get("tournament_id"),
        user_id: r.get("user_id"),
        checked_in: r.get("checked_in"),
        current_stack: r.get("current_stack"),
        selected_bonuses: r.get("selected_bonuses"),
        bonuses_paid: r.get("bonuses_paid"),
        bonus_addons_used: r.get("bonus_addons_used"),
        addon_used: r.get("addon_used"),
        addon_paid: r.get("addon_paid"),
        single_rebuys: count_from_row(r, "single_rebuys")?,
        double_rebuys: count_from_row(r, "double_rebuys")?,
        rebuy_history,
        eliminated: r.get("eliminated"),
        elimination_order: optional_count_from_row(r, "elimination_order")?,
        finish_place: optional_count_from_row(r, "finish_place")?,
        payment_status,
        buy_in_paid: r.get("buy_in_paid"),
        rebuys_paid: r.get("rebuys_paid"),
        payment_timestamp: r
            .get::<Option<chrono::NaiveDateTime>, _>("payment_timestamp")
            .map(|dt| dt.and_utc()),
        seat_number: optional_count_from_row(r, "seat_number")?,
        table_number: optional_count_from_row(r, "table_number")?,
        registered_at: r.get::<chrono::NaiveDateTime, _>("registered_at").and_utc(),
    })
}

/// Write every mutable column of a registration, returning rows affected
async fn write_registration<'e, E>(
    executor: E,
    registration: &Registration,
    rebuy_history: serde_json::Value,
) -> Result<u64, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE tournament_registrations SET
            checked_in = $2, current_stack = $3, selected_bonuses = $4, bonuses_paid = $5,
            bonus_addons_used = $6, addon_used = $7, addon_paid = $8, single_rebuys = $9,
            double_rebuys = $10, rebuy_history = $11, eliminated = $12, elimination_order = $13,
            finish_place = $14, payment_status = $15, buy_in_paid = $16, rebuys_paid = $17,
            payment_timestamp = $18, seat_number = $19, table_number = $20
        WHERE id = $1
        "#,
    )
    .bind(registration.id)
    .bind(registration.checked_in)
    .bind(registration.current_stack)
    .bind(&registration.selected_bonuses)
    .bind(&registration.bonuses_paid)
    .bind(&registration.bonus_addons_used)
    .bind(registration.addon_used)
    .bind(registration.addon_paid)
    .bind(count_to_column("single_rebuys", registration.single_rebuys)?)
    .bind(count_to_column("double_rebuys", registration.double_rebuys)?)
    .bind(rebuy_history)
    .bind(registration.eliminated)
    .bind(optional_count_to_column("elimination_order", registration.elimination_order)?)
    .bind(optional_count_to_column("finish_place", registration.finish_place)?)
    .bind(registration.payment_status.as_str())
    .bind(registration.buy_in_paid)
    .bind(registration.rebuys_paid)
    .bind(registration.payment_timestamp.map(|ts| ts.naive_utc()))
    .bind(optional_count_to_column("seat_number", registration.seat_number)?)
    .bind(optional_count_to_column("table_number", registration.table_number)?)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn insert_user(&self, user: &NewUser) -> RepositoryResult<User> {
        let sql = format!(
            "INSERT INTO users (email, name, password_hash, is_staff) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(&user.email)
                .bind(&user.name)
                .bind(&user.password_hash)
                .bind(user.is_staff)
                .fetch_one(self.pool.as_ref()),
        )
        .await?;

        Ok(user_from_row(&row))
    }

    async fn find_user_by_email(&self, email: &str) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(email.to_lowercase())
                .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_user_by_id(&self, user_id: UserId) -> RepositoryResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(user_id)
                .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn insert_tournament(&self, config: &TournamentConfig) -> RepositoryResult<Tournament> {
        let config_json = serde_json::to_value(config)?;
        let sql = format!(
            r#"
            INSERT INTO tournaments (name, config, status, start_time)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            TOURNAMENT_COLUMNS
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(&config.name)
                .bind(config_json)
                .bind(TournamentStatus::Pending.as_str())
                .bind(config.start_time.naive_utc())
                .fetch_one(self.pool.as_ref()),
        )
        .await?;

        tournament_from_row(&row)
    }

    async fn get_tournament(&self, id: TournamentId) -> RepositoryResult<Option<Tournament>> {
        let sql = format!("SELECT {} FROM tournaments WHERE id = $1", TOURNAMENT_COLUMNS);
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> RepositoryResult<Vec<Tournament>> {
        let sql = format!(
            "SELECT {} FROM tournaments WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY start_time, id",
            TOURNAMENT_COLUMNS
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(status.map(|s| s.as_str()))
                .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter().map(tournament_from_row).collect()
    }

    async fn update_tournament_status(
        &self,
        id: TournamentId,
        status: TournamentStatus,
    ) -> RepositoryResult<Option<Tournament>> {
        let sql = format!(
            "UPDATE tournaments SET status = $2 WHERE id = $1 RETURNING {}",
            TOURNAMENT_COLUMNS
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(id)
                .bind(status.as_str())
                .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn delete_tournament(&self, id: TournamentId) -> RepositoryResult<bool> {
        // Registrations go with it through ON DELETE CASCADE
        let result = with_default_timeout(
            sqlx::query("DELETE FROM tournaments WHERE id = $1")
                .bind(id)
                .execute(self.pool.as_ref()),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_registration(
        &self,
        registration: &NewRegistration,
    ) -> RepositoryResult<Registration> {
        let sql = format!(
            r#"
            INSERT INTO tournament_registrations (tournament_id, user_id, current_stack, selected_bonuses)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            REGISTRATION_COLUMNS
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(registration.tournament_id)
                .bind(registration.user_id)
                .bind(registration.current_stack)
                .bind(&registration.selected_bonuses)
                .fetch_one(self.pool.as_ref()),
        )
        .await?;

        registration_from_row(&row)
    }

    async fn get_registration(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> RepositoryResult<Option<Registration>> {
        let sql = format!(
            "SELECT {} FROM tournament_registrations WHERE tournament_id = $1 AND user_id = $2",
            REGISTRATION_COLUMNS
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(tournament_id)
                .bind(user_id)
                .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        row.as_ref().map(registration_from_row).transpose()
    }

    async fn list_registrations(
        &self,
        tournament_id: TournamentId,
    ) -> RepositoryResult<Vec<Registration>> {
        let sql = format!(
            "SELECT {} FROM tournament_registrations WHERE tournament_id = $1 ORDER BY id",
            REGISTRATION_COLUMNS
        );
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(tournament_id)
                .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter().map(registration_from_row).collect()
    }

    async fn find_champion(
        &self,
        tournament_id: TournamentId,
    ) -> RepositoryResult<Option<Registration>> {
        let sql = format!(
            "SELECT {} FROM tournament_registrations WHERE tournament_id = $1 AND finish_place = 1",
            REGISTRATION_COLUMNS
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(tournament_id)
                .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        row.as_ref().map(registration_from_row).transpose()
    }

    async fn update_registration(&self, registration: &Registration) -> RepositoryResult<()> {
        let history = serde_json::to_value(&registration.rebuy_history)?;
        let affected = with_default_timeout(write_registration(
            self.pool.as_ref(),
            registration,
            history,
        ))
        .await?;

        if affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn update_registrations(&self, registrations: &[Registration]) -> RepositoryResult<()> {
        let histories = registrations
            .iter()
            .map(|r| serde_json::to_value(&r.rebuy_history))
            .collect::<Result<Vec<_>, _>>()?;

        let pool = self.pool.clone();
        let missing = with_timeout(DEFAULT_TRANSACTION_TIMEOUT, async move {
            let mut tx = pool.begin().await?;
            for (registration, history) in registrations.iter().zip(histories) {
                if write_registration(&mut *tx, registration, history).await? == 0 {
                    tx.rollback().await?;
                    return Ok(true);
                }
            }
            tx.commit().await?;
            Ok::<bool, sqlx::Error>(false)
        })
        .await?;

        if missing {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
