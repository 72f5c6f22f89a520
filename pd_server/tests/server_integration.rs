//! Integration tests for the HTTP API.
//!
//! The router runs over the in-memory repository and is driven with
//! `tower::ServiceExt::oneshot`, so no database or socket is needed.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use pd_server::api::{AppState, create_router};
use pokerdesk::auth::AuthManager;
use pokerdesk::db::{InMemoryRepository, SharedRepository};
use pokerdesk::registration::RegistrationManager;
use pokerdesk::tournament::{TournamentLocks, TournamentManager};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

const STAFF_EMAIL: &str = "floor@example.com";
const STAFF_PASSWORD: &str = "Fl00rManager";

/// Router plus a ready staff account
async fn create_test_server() -> axum::Router {
    let repo: SharedRepository = Arc::new(InMemoryRepository::new());
    let auth_manager = AuthManager::new(
        repo.clone(),
        "test_pepper_for_testing_only".to_string(),
        "test_secret_key_for_testing_only_0123456789".to_string(),
    );
    auth_manager
        .ensure_staff_account(STAFF_EMAIL, "Floor", STAFF_PASSWORD)
        .await
        .unwrap();

    let locks = TournamentLocks::new();
    let state = AppState {
        tournament_manager: Arc::new(TournamentManager::new(
            repo.clone(),
            auth_manager.clone(),
            locks.clone(),
        )),
        registration_manager: Arc::new(RegistrationManager::new(
            repo,
            auth_manager.clone(),
            locks,
            "Welcome123".to_string(),
        )),
        auth_manager: Arc::new(auth_manager),
        database: None,
    };

    create_router(state)
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn send_json(
    app: &axum::Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, bytes) = send(app, method, uri, token, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &axum::Router, email: &str, password: &str) -> String {
    let (status, body) = send_json(
        app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"email": email, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["access_token"].as_str().unwrap().to_string()
}

async fn register_player(app: &axum::Router, email: &str) -> (String, i64) {
    let (status, body) = send_json(
        app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({"email": email, "name": "Player", "password": "Secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (
        body["access_token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_i64().unwrap(),
    )
}

fn tournament_json() -> Value {
    json!({
        "name": "Friday Deepstack",
        "start_time": "2026-10-16T19:00:00Z",
        "starting_stack": 20000,
        "buy_in": 60,
        "blind_structure": [
            {"level": 1, "small_blind": 100, "big_blind": 200, "duration_minutes": 30},
            {"level": 2, "small_blind": 200, "big_blind": 400, "duration_minutes": 30}
        ],
        "bonuses": [
            {"name": "Early Bird", "stack": 5000, "price": 0, "condition": "seated before level 2"}
        ],
        "rebuy": {
            "allowed": true,
            "single": {"stack": 20000, "price": 60},
            "double": {"stack": 40000, "price": 110}
        }
    })
}

async fn create_tournament(app: &axum::Router, staff: &str) -> i64 {
    let (status, body) = send_json(
        app,
        "POST",
        "/api/v1/staff/tournaments",
        Some(staff),
        Some(tournament_json()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

// ============================================================================
// Health and authentication
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_server().await;

    let (status, body) = send_json(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_server().await;

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "desk-42")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "desk-42");
}

#[tokio::test]
async fn test_register_then_login() {
    let app = create_test_server().await;

    let (token, user_id) = register_player(&app, "Ana@Example.com").await;
    assert!(!token.is_empty());
    assert!(user_id > 0);

    // Stored lowercase, so login works with the normalized address
    let token = login(&app, "ana@example.com", "Secret123").await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = create_test_server().await;
    register_player(&app, "dup@example.com").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/auth/register",
        None,
        Some(json!({"email": "dup@example.com", "name": "Again", "password": "Secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let app = create_test_server().await;
    register_player(&app, "wrong@example.com").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({"email": "wrong@example.com", "password": "Nope12345"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");
}

// ============================================================================
// Access control
// ============================================================================

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = create_test_server().await;

    let (status, _) = send_json(
        &app,
        "POST",
        "/api/v1/tournaments/1/register",
        None,
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_json(
        &app,
        "GET",
        "/api/v1/staff/tournaments/1/registrations",
        Some("not-a-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_staff_routes_reject_players() {
    let app = create_test_server().await;
    let (player, _) = register_player(&app, "player@example.com").await;

    let (status, body) = send_json(
        &app,
        "POST",
        "/api/v1/staff/tournaments",
        Some(&player),
        Some(tournament_json()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Staff access required");
}

// ============================================================================
// Tournament desk
// ============================================================================

#[tokio::test]
async fn test_self_registration_with_bonus() {
    let app = create_test_server().await;
    let staff = login(&app, STAFF_EMAIL, STAFF_PASSWORD).await;
    let tournament_id = create_tournament(&app, &staff).await;
    let (player, user_id) = register_player(&app, "early@example.com").await;

    let uri = format!("/api/v1/tournaments/{tournament_id}/register");
    let (status, body) = send_json(
        &app,
        "POST",
        &uri,
        Some(&player),
        Some(json!({"selected_bonuses": ["Early Bird"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user_id"], user_id);
    assert_eq!(body["current_stack"], 25000);

    let (status, _) = send_json(&app, "POST", &uri, Some(&player), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_bonus_is_bad_request() {
    let app = create_test_server().await;
    let staff = login(&app, STAFF_EMAIL, STAFF_PASSWORD).await;
    let tournament_id = create_tournament(&app, &staff).await;
    let (player, _) = register_player(&app, "greedy@example.com").await;

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("/api/v1/tournaments/{tournament_id}/register"),
        Some(&player),
        Some(json!({"selected_bonuses": ["Free Money"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_tournament_is_not_found() {
    let app = create_test_server().await;

    let (status, body) = send_json(&app, "GET", "/api/v1/tournaments/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Tournament not found: 999");
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let app = create_test_server().await;
    let staff = login(&app, STAFF_EMAIL, STAFF_PASSWORD).await;
    let first = create_tournament(&app, &staff).await;
    create_tournament(&app, &staff).await;

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/v1/staff/tournaments/{first}/status"),
        Some(&staff),
        Some(json!({"status": "active"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
        send_json(&app, "GET", "/api/v1/tournaments?status=active", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], first);

    let (status, _) =
        send_json(&app, "GET", "/api/v1/tournaments?status=paused", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_staff_desk_flow() {
    let app = create_test_server().await;
    let staff = login(&app, STAFF_EMAIL, STAFF_PASSWORD).await;
    let tournament_id = create_tournament(&app, &staff).await;
    let base = format!("/api/v1/staff/tournaments/{tournament_id}/registrations");

    // Two walk-ins
    let mut players = Vec::new();
    for email in ["walkin1@example.com", "walkin2@example.com"] {
        let (status, body) = send_json(
            &app,
            "POST",
            &format!("{base}/manual"),
            Some(&staff),
            Some(json!({"name": "Walk In", "email": email})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        players.push(body["user_id"].as_i64().unwrap());
    }

    for user_id in &players {
        let (status, body) = send_json(
            &app,
            "POST",
            &format!("{base}/{user_id}/check-in"),
            Some(&staff),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checked_in"], true);
    }

    // Rebuy then a correction
    let (status, body) = send_json(
        &app,
        "POST",
        &format!("{base}/{}/rebuy", players[0]),
        Some(&staff),
        Some(json!({"kind": "single"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_stack"], 40000);

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("{base}/{}/rebuys", players[0]),
        Some(&staff),
        Some(json!({"single_rebuys": -1, "double_rebuys": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send_json(
        &app,
        "PUT",
        &format!("{base}/{}/seat", players[1]),
        Some(&staff),
        Some(json!({"seat_number": 4, "table_number": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seat_number"], 4);

    // First walk-in busts, the second is crowned
    let (status, body) = send_json(
        &app,
        "POST",
        &format!("{base}/{}/eliminate", players[0]),
        Some(&staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["eliminated"]["finish_place"], 2);
    assert_eq!(body["champion"]["user_id"], players[1]);
    assert_eq!(body["champion"]["finish_place"], 1);

    let (status, _) = send_json(
        &app,
        "POST",
        &format!("{base}/{}/eliminate", players[0]),
        Some(&staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, csv) = send(
        &app,
        "GET",
        &format!("/api/v1/staff/tournaments/{tournament_id}/results.csv"),
        Some(&staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let csv = String::from_utf8(csv).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Place,Email,Checked-In,Seat,Table");
    assert!(lines[1].starts_with("1,walkin2@example.com,Yes,4,2"));
    assert!(lines[2].starts_with("2,walkin1@example.com,Yes"));
}

#[tokio::test]
async fn test_settlement_and_declined_payment() {
    let app = create_test_server().await;
    let staff = login(&app, STAFF_EMAIL, STAFF_PASSWORD).await;
    let tournament_id = create_tournament(&app, &staff).await;
    let base = format!("/api/v1/staff/tournaments/{tournament_id}/registrations");

    let mut players = Vec::new();
    for email in ["payer@example.com", "decliner@example.com"] {
        let (_, body) = send_json(
            &app,
            "POST",
            &format!("{base}/manual"),
            Some(&staff),
            Some(json!({"name": "Desk", "email": email})),
        )
        .await;
        players.push(body["user_id"].as_i64().unwrap());
    }

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("{base}/{}/settle", players[0]),
        Some(&staff),
        Some(json!({"confirm_payment": true, "include_buy_in": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["amount_due"], 60);
    assert_eq!(body["registration"]["buy_in_paid"], true);

    let (status, body) = send_json(
        &app,
        "POST",
        &format!("{base}/{}/settle", players[1]),
        Some(&staff),
        Some(json!({"confirm_payment": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["registration"]["eliminated"], true);
    assert_eq!(body["registration"]["payment_status"], "eliminated");
}

#[tokio::test]
async fn test_delete_and_force_delete() {
    let app = create_test_server().await;
    let staff = login(&app, STAFF_EMAIL, STAFF_PASSWORD).await;

    let untouched = create_tournament(&app, &staff).await;
    let (status, _) = send_json(
        &app,
        "DELETE",
        &format!("/api/v1/staff/tournaments/{untouched}"),
        Some(&staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let running = create_tournament(&app, &staff).await;
    send_json(
        &app,
        "PUT",
        &format!("/api/v1/staff/tournaments/{running}/status"),
        Some(&staff),
        Some(json!({"status": "active"})),
    )
    .await;

    let (status, _) = send_json(
        &app,
        "DELETE",
        &format!("/api/v1/staff/tournaments/{running}"),
        Some(&staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let force = format!("/api/v1/staff/tournaments/{running}/force-delete");
    let (status, _) = send_json(
        &app,
        "POST",
        &force,
        Some(&staff),
        Some(json!({"password": "WrongPass1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send_json(
        &app,
        "POST",
        &force,
        Some(&staff),
        Some(json!({"password": STAFF_PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) =
        send_json(&app, "GET", &format!("/api/v1/tournaments/{running}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
