//! Registration API handlers.
//!
//! Players register themselves through [`register_self`]. Everything else is
//! the staff desk: walk-in registrations, check-in, rebuys and add-ons,
//! eliminations, payment settlement and seating.
//!
//! Registrations are addressed by `(tournament_id, user_id)`.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use pokerdesk::{
    auth::{AccessTokenClaims, UserId},
    registration::{ManualRegistration, Registration, SettlementOutcome, SettlementRequest},
    tournament::{RebuyKind, TournamentId},
};
use serde::{Deserialize, Serialize};

use super::{AppState, error::ApiResult};
use crate::metrics;

#[derive(Debug, Default, Deserialize)]
pub struct SelfRegistrationPayload {
    #[serde(default)]
    pub selected_bonuses: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct RebuyPayload {
    pub kind: RebuyKind,
}

#[derive(Debug, Deserialize)]
pub struct EditRebuysPayload {
    pub single_rebuys: i64,
    pub double_rebuys: i64,
}

#[derive(Debug, Deserialize)]
pub struct SeatPayload {
    pub seat_number: Option<i64>,
    pub table_number: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct EliminationResponse {
    pub eliminated: Registration,
    /// Set when this elimination left one player standing
    pub champion: Option<Registration>,
}

/// Register the calling user.
///
/// # Request Body
///
/// ```json
/// {"selected_bonuses": ["Early Bird"]}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Unknown bonus
/// - `404 Not Found`: Unknown tournament
/// - `409 Conflict`: Already registered, or the tournament has a champion
pub async fn register_self(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
    Path(tournament_id): Path<TournamentId>,
    Json(payload): Json<SelfRegistrationPayload>,
) -> ApiResult<(StatusCode, Json<Registration>)> {
    let registration = state
        .registration_manager
        .register(tournament_id, claims.sub, payload.selected_bonuses)
        .await?;

    metrics::registrations_total("self");
    Ok((StatusCode::CREATED, Json(registration)))
}

/// Register a walk-in player, creating their account when needed.
pub async fn register_manual(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(payload): Json<ManualRegistration>,
) -> ApiResult<(StatusCode, Json<Registration>)> {
    let registration = state
        .registration_manager
        .register_manual(tournament_id, payload)
        .await?;

    metrics::registrations_total("manual");
    Ok((StatusCode::CREATED, Json(registration)))
}

/// All registrations of a tournament, in registration order.
pub async fn list_registrations(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<Vec<Registration>>> {
    let registrations = state
        .registration_manager
        .list_registrations(tournament_id)
        .await?;
    Ok(Json(registrations))
}

pub async fn get_registration(
    State(state): State<AppState>,
    Path((tournament_id, user_id)): Path<(TournamentId, UserId)>,
) -> ApiResult<Json<Registration>> {
    let registration = state
        .registration_manager
        .get_registration(tournament_id, user_id)
        .await?;
    Ok(Json(registration))
}

pub async fn check_in(
    State(state): State<AppState>,
    Path((tournament_id, user_id)): Path<(TournamentId, UserId)>,
) -> ApiResult<Json<Registration>> {
    let registration = state
        .registration_manager
        .check_in(tournament_id, user_id)
        .await?;
    Ok(Json(registration))
}

/// Add a single or double rebuy.
///
/// # Request Body
///
/// ```json
/// {"kind": "double"}
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Rebuys disabled or already settled
pub async fn add_rebuy(
    State(state): State<AppState>,
    Path((tournament_id, user_id)): Path<(TournamentId, UserId)>,
    Json(payload): Json<RebuyPayload>,
) -> ApiResult<Json<Registration>> {
    let registration = state
        .registration_manager
        .add_rebuy(tournament_id, user_id, payload.kind)
        .await?;
    Ok(Json(registration))
}

/// Add the tournament add-on.
///
/// # Errors
///
/// - `409 Conflict`: Add-on disabled or already used
pub async fn add_addon(
    State(state): State<AppState>,
    Path((tournament_id, user_id)): Path<(TournamentId, UserId)>,
) -> ApiResult<Json<Registration>> {
    let registration = state
        .registration_manager
        .add_addon(tournament_id, user_id)
        .await?;
    Ok(Json(registration))
}

/// Overwrite the rebuy counts, moving the stack by the chip difference.
///
/// # Errors
///
/// - `400 Bad Request`: Negative count
/// - `409 Conflict`: Rebuys already settled
pub async fn edit_rebuys(
    State(state): State<AppState>,
    Path((tournament_id, user_id)): Path<(TournamentId, UserId)>,
    Json(payload): Json<EditRebuysPayload>,
) -> ApiResult<Json<Registration>> {
    let registration = state
        .registration_manager
        .edit_rebuys(
            tournament_id,
            user_id,
            payload.single_rebuys,
            payload.double_rebuys,
        )
        .await?;
    Ok(Json(registration))
}

/// Knock a player out.
///
/// # Response
///
/// ```json
/// {"eliminated": {...}, "champion": null}
/// ```
///
/// # Errors
///
/// - `409 Conflict`: Player already out or never checked in
pub async fn eliminate(
    State(state): State<AppState>,
    Path((tournament_id, user_id)): Path<(TournamentId, UserId)>,
) -> ApiResult<Json<EliminationResponse>> {
    let outcome = state
        .registration_manager
        .eliminate(tournament_id, user_id)
        .await?;

    metrics::eliminations_total(outcome.champion.is_some());
    Ok(Json(EliminationResponse {
        eliminated: outcome.eliminated,
        champion: outcome.champion,
    }))
}

/// Confirm or decline a player's payment.
///
/// # Request Body
///
/// ```json
/// {
///   "confirm_payment": true,
///   "include_buy_in": true,
///   "include_addon": false,
///   "selected_bonuses": ["Early Bird"],
///   "selected_bonus_addons": []
/// }
/// ```
///
/// Declining (`"confirm_payment": false`) withdraws the player.
pub async fn settle(
    State(state): State<AppState>,
    Path((tournament_id, user_id)): Path<(TournamentId, UserId)>,
    Json(request): Json<SettlementRequest>,
) -> ApiResult<Json<SettlementOutcome>> {
    let confirmed = request.confirm_payment;
    let outcome = state
        .registration_manager
        .settle(tournament_id, user_id, request)
        .await?;

    metrics::settlements_total(confirmed);
    if confirmed {
        metrics::settlement_amount(outcome.amount_due);
    }
    Ok(Json(outcome))
}

/// Set or clear the seat and table. `null` clears.
pub async fn assign_seat(
    State(state): State<AppState>,
    Path((tournament_id, user_id)): Path<(TournamentId, UserId)>,
    Json(payload): Json<SeatPayload>,
) -> ApiResult<Json<Registration>> {
    let registration = state
        .registration_manager
        .assign_seat(
            tournament_id,
            user_id,
            payload.seat_number,
            payload.table_number,
        )
        .await?;
    Ok(Json(registration))
}
