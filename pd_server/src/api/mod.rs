//! HTTP API for the tournament desk.
//!
//! # Modules
//!
//! - [`auth`]: Account registration and login
//! - [`tournaments`]: Tournament catalog and results export
//! - [`registrations`]: Player registration and the staff desk operations
//! - [`middleware`]: Token authentication and the staff gate
//! - [`request_id`]: Correlation ids, request logging and request metrics
//! - [`error`]: Error to response mapping
//!
//! # Endpoints Overview
//!
//! ```text
//! GET    /health                                                        - Health check (public)
//! POST   /api/v1/auth/register                                          - Create account (public)
//! POST   /api/v1/auth/login                                             - Login (public)
//! GET    /api/v1/tournaments                                            - List tournaments (public)
//! GET    /api/v1/tournaments/{id}                                       - Get tournament (public)
//! POST   /api/v1/tournaments/{id}/register                              - Register self (auth)
//! POST   /api/v1/staff/tournaments                                      - Create tournament (staff)
//! PUT    /api/v1/staff/tournaments/{id}/status                          - Set status (staff)
//! DELETE /api/v1/staff/tournaments/{id}                                 - Delete (staff)
//! POST   /api/v1/staff/tournaments/{id}/force-delete                    - Force delete (staff)
//! GET    /api/v1/staff/tournaments/{id}/results.csv                     - Results sheet (staff)
//! GET    /api/v1/staff/tournaments/{id}/registrations                   - List registrations (staff)
//! POST   /api/v1/staff/tournaments/{id}/registrations/manual            - Walk-in registration (staff)
//! GET    /api/v1/staff/tournaments/{id}/registrations/{user_id}         - Get registration (staff)
//! POST   /api/v1/staff/tournaments/{id}/registrations/{user_id}/check-in
//! POST   /api/v1/staff/tournaments/{id}/registrations/{user_id}/rebuy
//! POST   /api/v1/staff/tournaments/{id}/registrations/{user_id}/addon
//! PUT    /api/v1/staff/tournaments/{id}/registrations/{user_id}/rebuys
//! POST   /api/v1/staff/tournaments/{id}/registrations/{user_id}/eliminate
//! POST   /api/v1/staff/tournaments/{id}/registrations/{user_id}/settle
//! PUT    /api/v1/staff/tournaments/{id}/registrations/{user_id}/seat
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively. In production, configure appropriate
//! origins, methods, and headers.

pub mod auth;
pub mod error;
pub mod middleware;
pub mod registrations;
pub mod request_id;
pub mod tournaments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use pokerdesk::{
    auth::AuthManager, db::Database, registration::RegistrationManager,
    tournament::TournamentManager,
};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub auth_manager: Arc<AuthManager>,
    pub tournament_manager: Arc<TournamentManager>,
    pub registration_manager: Arc<RegistrationManager>,
    /// `None` when running on the in-memory repository
    pub database: Option<Database>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use pd_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router(state.clone());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1_routes)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(request_id::request_id_middleware))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn create_v1_router(state: AppState) -> Router<AppState> {
    // Public routes (no authentication middleware)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/tournaments", get(tournaments::list_tournaments))
        .route("/tournaments/{tournament_id}", get(tournaments::get_tournament));

    // Any authenticated user
    let player_routes = Router::new()
        .route(
            "/tournaments/{tournament_id}/register",
            post(registrations::register_self),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let staff_routes = Router::new()
        .route("/tournaments", post(tournaments::create_tournament))
        .route(
            "/tournaments/{tournament_id}",
            axum::routing::delete(tournaments::delete_tournament),
        )
        .route(
            "/tournaments/{tournament_id}/status",
            put(tournaments::update_status),
        )
        .route(
            "/tournaments/{tournament_id}/force-delete",
            post(tournaments::force_delete_tournament),
        )
        .route(
            "/tournaments/{tournament_id}/results.csv",
            get(tournaments::results_csv),
        )
        .route(
            "/tournaments/{tournament_id}/registrations",
            get(registrations::list_registrations),
        )
        .route(
            "/tournaments/{tournament_id}/registrations/manual",
            post(registrations::register_manual),
        )
        .route(
            "/tournaments/{tournament_id}/registrations/{user_id}",
            get(registrations::get_registration),
        )
        .route(
            "/tournaments/{tournament_id}/registrations/{user_id}/check-in",
            post(registrations::check_in),
        )
        .route(
            "/tournaments/{tournament_id}/registrations/{user_id}/rebuy",
            post(registrations::add_rebuy),
        )
        .route(
            "/tournaments/{tournament_id}/registrations/{user_id}/addon",
            post(registrations::add_addon),
        )
        .route(
            "/tournaments/{tournament_id}/registrations/{user_id}/rebuys",
            put(registrations::edit_rebuys),
        )
        .route(
            "/tournaments/{tournament_id}/registrations/{user_id}/eliminate",
            post(registrations::eliminate),
        )
        .route(
            "/tournaments/{tournament_id}/registrations/{user_id}/settle",
            post(registrations::settle),
        )
        .route(
            "/tournaments/{tournament_id}/registrations/{user_id}/seat",
            put(registrations::assign_seat),
        )
        // Layers run bottom-up: authenticate, then check the staff flag
        .layer(axum::middleware::from_fn(middleware::staff_middleware))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(player_routes)
        .nest("/staff", staff_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when storage is reachable, `503 Service Unavailable`
/// otherwise.
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","storage":"postgres","database":true,"timestamp":"2026-10-16T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (storage, healthy) = match &state.database {
        Some(db) => ("postgres", db.health_check().await.is_ok()),
        None => ("memory", true),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage,
        "database": healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
