// 🌐 HTTP JSON API
//
// Thin handlers over the store, progress calculator, and update guard.
// The router is built here (not in the server binary) so tests can drive
// it end to end with tower's oneshot.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Json, Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::auth::{self, Claims, TOKEN_COOKIE};
use crate::config::ServerConfig;
use crate::db::{self, StationWithHouses};
use crate::entities::{HouseDetail, Role, StationSummary};
use crate::progress::{self, OverallStats, StationStats};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(conn: Connection, config: ServerConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            config: Arc::new(config),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error taxonomy at the HTTP boundary. Every failure is reported once to
/// the caller; nothing here is fatal to the process.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
    NotFound(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Not authenticated".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(err) => {
                tracing::error!("internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

// ============================================================================
// Auth middleware
// ============================================================================

/// Pull the session token out of the request: the `canvass-token` cookie
/// set at login, or an `Authorization: Bearer` header for API clients.
fn extract_token(request: &Request) -> Option<String> {
    if let Some(cookies) = request
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
    {
        for pair in cookies.split(';') {
            if let Some(value) = pair.trim().strip_prefix(TOKEN_COOKIE) {
                if let Some(value) = value.strip_prefix('=') {
                    return Some(value.to_string());
                }
            }
        }
    }

    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// Middleware guarding every non-public route: a valid, unexpired token is
/// required, and its claims are handed to the handlers via extensions.
async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(&request).ok_or(ApiError::Unauthorized)?;

    let claims = auth::verify_token(&token, &state.config.jwt_secret)
        .map_err(|_| ApiError::Unauthorized)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

// ============================================================================
// Auth handlers
// ============================================================================

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// POST /api/auth/login - verify credentials, set the session cookie.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    if body.username.is_empty() || body.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Username and password are required".to_string(),
        ));
    }

    let user = {
        let conn = state.db.lock().unwrap();
        db::find_user_by_username(&conn, &body.username)?
    };

    // Same response for unknown user and wrong password
    let Some(user) = user else {
        return Err(ApiError::Unauthorized);
    };
    if !auth::verify_password(&body.password, &user.password_hash) {
        return Err(ApiError::Unauthorized);
    }

    let token = auth::sign_token(
        &user.id,
        &user.username,
        user.role,
        &state.config.jwt_secret,
        state.config.token_ttl_secs,
    )?;

    tracing::info!(username = %user.username, role = %user.role.as_str(), "login");

    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        TOKEN_COOKIE, token, state.config.token_ttl_secs
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "role": user.role })),
    )
        .into_response())
}

/// POST /api/auth/logout - clear the session cookie. Sessions are
/// stateless, so there is nothing to revoke server-side.
async fn logout() -> Response {
    let cookie = format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", TOKEN_COOKIE);
    ([(header::SET_COOKIE, cookie)], Json(json!({ "ok": true }))).into_response()
}

/// GET /api/auth/me - identify the caller from their token.
async fn me(Extension(claims): Extension<Claims>) -> Json<serde_json::Value> {
    Json(json!({
        "userId": claims.sub,
        "username": claims.username,
        "role": claims.role,
    }))
}

/// GET /api/health
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// ============================================================================
// Station handlers
// ============================================================================

/// One row of the station list: identity plus flattened statistics.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StationRow {
    id: String,
    ps_number: String,
    ps_name: String,
    ward: String,
    incharge_name: String,
    #[serde(flatten)]
    stats: StationStats,
}

#[derive(Debug, Serialize)]
struct StationListResponse {
    stations: Vec<StationRow>,
    overall: OverallStats,
}

fn station_row(s: StationWithHouses) -> StationRow {
    let stats = progress::station_stats(s.houses.iter().map(|h| h.voters.as_slice()));
    StationRow {
        id: s.station.id,
        ps_number: s.station.ps_number,
        ps_name: s.station.ps_name,
        ward: s.station.ward,
        incharge_name: s.station.incharge_name,
        stats,
    }
}

/// GET /api/ps - per-station statistics plus the overall aggregate.
///
/// The overall block is the sum of the per-station stats, never an
/// independent re-derivation, so the two always reconcile.
async fn list_stations(State(state): State<AppState>) -> Result<Json<StationListResponse>, ApiError> {
    let stations = {
        let conn = state.db.lock().unwrap();
        db::load_all_stations(&conn)?
    };

    let rows: Vec<StationRow> = stations.into_iter().map(station_row).collect();
    let per_station: Vec<StationStats> = rows.iter().map(|r| r.stats).collect();
    let overall = progress::overall_stats(&per_station);

    Ok(Json(StationListResponse {
        stations: rows,
        overall,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StationDetailResponse {
    id: String,
    ps_number: String,
    ps_name: String,
    ward: String,
    incharge_name: String,
    houses: Vec<HouseDetail>,
    stats: StationStats,
}

/// GET /api/ps/:ps_id - full station detail: houses in natural number
/// order, each with its voters and derived status.
async fn station_detail(
    State(state): State<AppState>,
    Path(ps_id): Path<String>,
) -> Result<Json<StationDetailResponse>, ApiError> {
    let loaded = {
        let conn = state.db.lock().unwrap();
        db::load_station(&conn, &ps_id)?
    };

    let Some(loaded) = loaded else {
        return Err(ApiError::NotFound("Polling station not found".to_string()));
    };

    let stats = progress::station_stats(loaded.houses.iter().map(|h| h.voters.as_slice()));
    let houses: Vec<HouseDetail> = loaded
        .houses
        .into_iter()
        .map(|h| {
            let status = progress::house_status(&h.voters);
            HouseDetail {
                id: h.house.id,
                house_number: h.house.house_number,
                total_voters: h.house.total_voters,
                status,
                voters: h.voters,
            }
        })
        .collect();

    Ok(Json(StationDetailResponse {
        id: loaded.station.id,
        ps_number: loaded.station.ps_number,
        ps_name: loaded.station.ps_name,
        ward: loaded.station.ward,
        incharge_name: loaded.station.incharge_name,
        houses,
        stats,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateStationRequest {
    #[serde(default)]
    incharge_name: String,
}

/// PUT /api/ps/:ps_id - reassign the incharge. Admin only.
async fn update_station(
    State(state): State<AppState>,
    Path(ps_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<UpdateStationRequest>,
) -> Result<Json<StationSummary>, ApiError> {
    if claims.role != Role::Admin {
        return Err(ApiError::Forbidden);
    }

    let incharge_name = body.incharge_name.trim();
    if incharge_name.is_empty() {
        return Err(ApiError::BadRequest(
            "inchargeName must be a non-empty string".to_string(),
        ));
    }

    let updated = {
        let conn = state.db.lock().unwrap();
        db::update_incharge(&conn, &ps_id, incharge_name)?
    };

    match updated {
        Some(summary) => Ok(Json(summary)),
        None => Err(ApiError::NotFound("Polling station not found".to_string())),
    }
}

// ============================================================================
// Voter marking
// ============================================================================

#[derive(Debug, Deserialize)]
struct UpdateVotersRequest {
    /// Raw entries: malformed ones are skipped, not rejected
    voters: Vec<serde_json::Value>,
}

/// PUT /api/houses/:house_id/voters - apply an agent's submitted marks.
///
/// Returns the fresh house state so the client can reconcile: some of its
/// submitted flips may have been silently rejected by the ratchet.
async fn update_voters(
    State(state): State<AppState>,
    Path(house_id): Path<String>,
    Json(body): Json<UpdateVotersRequest>,
) -> Result<Json<HouseDetail>, ApiError> {
    let marks = db::parse_marks(&body.voters);

    let detail = {
        let conn = state.db.lock().unwrap();
        db::apply_voter_marks(&conn, &house_id, &marks)?
    };

    match detail {
        Some(detail) => Ok(Json(detail)),
        None => Err(ApiError::NotFound("House not found".to_string())),
    }
}

// ============================================================================
// Router
// ============================================================================

/// Build the full API router over the given state.
pub fn build_router(state: AppState) -> Router {
    // Public: login/logout/health. Everything else sits behind the token.
    let public = Router::new()
        .route("/api/health", get(health))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout));

    let protected = Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/ps", get(list_stations))
        .route("/api/ps/:ps_id", get(station_detail).put(update_station))
        .route("/api/houses/:house_id/voters", put(update_voters))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    public
        .merge(protected)
        .with_state(state)
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use tower::util::ServiceExt;

    use crate::entities::{House, PollingStation, User, Voter};

    const SECRET: &str = "test-secret";

    /// App over an in-memory database with one admin, one agent, and one
    /// station holding two houses of three unmet voters each.
    fn test_app() -> (Router, AppState, String, Vec<String>) {
        let conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();

        let admin = User::new("admin", &auth::hash_password("admin123").unwrap(), Role::Admin);
        let agent = User::new("agent", &auth::hash_password("agent123").unwrap(), Role::Agent);
        db::insert_user(&conn, &admin).unwrap();
        db::insert_user(&conn, &agent).unwrap();

        let ps = PollingStation::new("298", "Bhoiguda Municipal School", "Bhoiguda", "Lakshmi Devi");
        db::insert_station(&conn, &ps).unwrap();

        let mut house_ids = Vec::new();
        for number in ["4-1-401", "4-1-402"] {
            let house = House::new(number, 3, &ps.id);
            db::insert_house(&conn, &house).unwrap();
            for serial in 1..=3 {
                db::insert_voter(&conn, &Voter::new(serial, &house.id)).unwrap();
            }
            house_ids.push(house.id);
        }

        let config = ServerConfig {
            jwt_secret: SECRET.to_string(),
            ..ServerConfig::default()
        };
        let state = AppState::new(conn, config);
        let app = build_router(state.clone());
        (app, state, ps.id, house_ids)
    }

    fn bearer(state: &AppState, username: &str, role: Role) -> String {
        let token =
            auth::sign_token("user-test", username, role, &state.config.jwt_secret, 3600).unwrap();
        format!("Bearer {}", token)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, auth_header: Option<&str>, body: serde_json::Value) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(a) = auth_header {
            builder = builder.header(header::AUTHORIZATION, a);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, auth_header: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().method("GET").uri(uri);
        if let Some(a) = auth_header {
            builder = builder.header(header::AUTHORIZATION, a);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_login_sets_cookie_and_returns_role() {
        let (app, _state, _ps, _houses) = test_app();

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({"username": "agent", "password": "agent123"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("canvass-token="));
        assert!(cookie.contains("HttpOnly"));

        let body = body_json(response).await;
        assert_eq!(body["role"], "AGENT");
    }

    #[tokio::test]
    async fn test_login_bad_password_is_unauthorized() {
        let (app, _state, _ps, _houses) = test_app();

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({"username": "agent", "password": "wrong"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cookie_token_accepted() {
        let (app, _state, _ps, _houses) = test_app();

        let login = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                None,
                json!({"username": "admin", "password": "admin123"}),
            ))
            .await
            .unwrap();
        let cookie = login
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .method("GET")
                    .uri("/api/auth/me")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["username"], "admin");
        assert_eq!(body["role"], "ADMIN");
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let (app, _state, ps_id, _houses) = test_app();

        let detail_uri = format!("/api/ps/{}", ps_id);
        for uri in ["/api/auth/me", "/api/ps", detail_uri.as_str()] {
            let response = app
                .clone()
                .oneshot(get_request(uri, None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "uri: {}", uri);
        }
    }

    #[tokio::test]
    async fn test_agent_cannot_reassign_incharge() {
        let (app, state, ps_id, _houses) = test_app();
        let agent = bearer(&state, "agent", Role::Agent);

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/ps/{}", ps_id),
                Some(&agent),
                json!({"inchargeName": "Hijacker"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // Underlying data unchanged
        let token = bearer(&state, "agent", Role::Agent);
        let detail = app
            .oneshot(get_request(&format!("/api/ps/{}", ps_id), Some(&token)))
            .await
            .unwrap();
        let body = body_json(detail).await;
        assert_eq!(body["inchargeName"], "Lakshmi Devi");
    }

    #[tokio::test]
    async fn test_admin_reassigns_incharge() {
        let (app, state, ps_id, _houses) = test_app();
        let admin = bearer(&state, "admin", Role::Admin);

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/ps/{}", ps_id),
                Some(&admin),
                json!({"inchargeName": "Srinivas Murthy"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["inchargeName"], "Srinivas Murthy");

        // Empty name rejected
        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/api/ps/{}", ps_id),
                Some(&admin),
                json!({"inchargeName": "  "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_station_is_404() {
        let (app, state, _ps, _houses) = test_app();
        let token = bearer(&state, "agent", Role::Agent);

        let response = app
            .oneshot(get_request("/api/ps/does-not-exist", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_marking_one_house_complete_moves_station_to_fifty_percent() {
        let (app, state, ps_id, house_ids) = test_app();
        let token = bearer(&state, "agent", Role::Agent);

        // Fresh station: nothing visited
        let detail = app
            .clone()
            .oneshot(get_request(&format!("/api/ps/{}", ps_id), Some(&token)))
            .await
            .unwrap();
        let body = body_json(detail).await;
        assert_eq!(body["stats"]["completionPercentage"], 0);
        assert_eq!(body["stats"]["housesCompleted"], 0);

        // Mark all three voters of house 1 as met
        let voter_ids: Vec<String> = body["houses"][0]["voters"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["id"].as_str().unwrap().to_string())
            .collect();
        let marks: Vec<serde_json::Value> = voter_ids
            .iter()
            .map(|id| json!({"id": id, "met": true}))
            .collect();

        let response = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/houses/{}/voters", house_ids[0]),
                Some(&token),
                json!({ "voters": marks }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let house = body_json(response).await;
        assert_eq!(house["status"], "complete");

        // Re-fetch: one house complete out of two, half the voters met
        let detail = app
            .oneshot(get_request(&format!("/api/ps/{}", ps_id), Some(&token)))
            .await
            .unwrap();
        let body = body_json(detail).await;
        assert_eq!(body["stats"]["housesCompleted"], 1);
        assert_eq!(body["stats"]["housesVisited"], 1);
        assert_eq!(body["stats"]["completionPercentage"], 50);
    }

    #[tokio::test]
    async fn test_station_list_overall_reconciles() {
        let (app, state, _ps, _houses) = test_app();
        let token = bearer(&state, "agent", Role::Agent);

        let response = app
            .oneshot(get_request("/api/ps", Some(&token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;

        let stations = body["stations"].as_array().unwrap();
        assert_eq!(stations.len(), 1);
        assert_eq!(body["overall"]["totalStations"], 1);
        assert_eq!(body["overall"]["totalVoters"], stations[0]["totalVoters"]);
        assert_eq!(body["overall"]["votersMet"], stations[0]["votersMet"]);
    }

    #[tokio::test]
    async fn test_voters_body_must_be_a_list() {
        let (app, state, _ps, house_ids) = test_app();
        let token = bearer(&state, "agent", Role::Agent);

        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/api/houses/{}/voters", house_ids[0]),
                Some(&token),
                json!({ "voters": "not-a-list" }),
            ))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_unknown_house_is_404() {
        let (app, state, _ps, _houses) = test_app();
        let token = bearer(&state, "agent", Role::Agent);

        let response = app
            .oneshot(json_request(
                "PUT",
                "/api/houses/missing/voters",
                Some(&token),
                json!({ "voters": [] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
