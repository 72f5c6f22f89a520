//! Tournament catalog API handlers.
//!
//! Listing and reading tournaments is public. Creating, changing status,
//! deleting and exporting results are staff operations.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use pokerdesk::{
    auth::AccessTokenClaims,
    tournament::{Tournament, TournamentConfig, TournamentId, TournamentStatus},
};
use serde::Deserialize;

use super::{
    AppState,
    error::ApiResult,
    request_id::RequestId,
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusPayload {
    pub status: TournamentStatus,
}

#[derive(Debug, Deserialize)]
pub struct ForceDeletePayload {
    pub password: String,
}

/// List tournaments ordered by start time.
///
/// # Query Parameters
///
/// - `status`: optional `pending`, `active` or `completed`
///
/// # Errors
///
/// - `400 Bad Request`: Unknown status value
pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Tournament>>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<TournamentStatus>)
        .transpose()?;

    let tournaments = state.tournament_manager.list_tournaments(status).await?;
    Ok(Json(tournaments))
}

/// Get one tournament with its full configuration.
pub async fn get_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<Tournament>> {
    let tournament = state.tournament_manager.get_tournament(tournament_id).await?;
    Ok(Json(tournament))
}

/// Create a tournament from a full configuration.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "Friday Deepstack",
///   "start_time": "2026-10-16T19:00:00Z",
///   "starting_stack": 20000,
///   "buy_in": 60,
///   "blind_structure": [{"level": 1, "small_blind": 100, "big_blind": 200, "duration_minutes": 30}],
///   "rebuy": {"allowed": true, "single": {"stack": 20000, "price": 60}, "double": {"stack": 40000, "price": 110}}
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Invalid blind structure, duplicate bonus names or negative amounts
pub async fn create_tournament(
    State(state): State<AppState>,
    Json(config): Json<TournamentConfig>,
) -> ApiResult<(StatusCode, Json<Tournament>)> {
    let tournament = state.tournament_manager.create_tournament(config).await?;
    Ok((StatusCode::CREATED, Json(tournament)))
}

/// Move a tournament to a new status.
pub async fn update_status(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
    Json(payload): Json<StatusPayload>,
) -> ApiResult<Json<Tournament>> {
    let tournament = state
        .tournament_manager
        .update_status(tournament_id, payload.status)
        .await?;
    Ok(Json(tournament))
}

/// Delete a tournament nobody has checked in to.
///
/// # Errors
///
/// - `409 Conflict`: Tournament started or has checked-in players
pub async fn delete_tournament(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<StatusCode> {
    state
        .tournament_manager
        .delete_tournament(tournament_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete a tournament in any state after re-checking the staff password.
///
/// # Errors
///
/// - `401 Unauthorized`: Password does not match
pub async fn force_delete_tournament(
    State(state): State<AppState>,
    Extension(claims): Extension<AccessTokenClaims>,
    request_id: RequestId,
    Path(tournament_id): Path<TournamentId>,
    Json(payload): Json<ForceDeletePayload>,
) -> ApiResult<StatusCode> {
    let result = state
        .tournament_manager
        .force_delete_tournament(tournament_id, claims.sub, &payload.password)
        .await;

    if result.is_err() {
        tracing::warn!(
            request_id = %request_id.as_str(),
            user_id = claims.sub,
            tournament_id,
            "Force delete refused"
        );
    }
    result?;

    Ok(StatusCode::NO_CONTENT)
}

/// Download the results sheet.
///
/// Columns are `Place,Email,Checked-In,Seat,Table`, sorted by finish place
/// with unplaced players last.
pub async fn results_csv(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<impl IntoResponse> {
    let body = state
        .registration_manager
        .results_csv(tournament_id)
        .await?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"tournament_{}_results.csv\"", tournament_id),
        ),
    ];
    Ok((headers, body))
}
