//! HTTP route definitions

use std::net::IpAddr;
use std::sync::atomic::Ordering;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};

use crate::app::AppState;
use crate::game::{Event, GameSnapshot, Team, EVENT_LOG_CAPACITY};
use crate::store::{RosterEntry, RosterError};
use crate::udp::protocol::is_reserved;
use crate::udp::BroadcastError;

/// Events included in a scoreboard snapshot
const SNAPSHOT_EVENT_COUNT: usize = 10;
/// Default page size for the events endpoint
const DEFAULT_EVENT_COUNT: usize = 10;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = build_cors(&state.config.client_origin);

    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/players",
            get(list_players_handler)
                .post(add_player_handler)
                .delete(clear_players_handler),
        )
        .route("/players/:id", get(get_player_handler))
        .route("/network", get(get_network_handler).post(set_network_handler))
        .route("/broadcast/:code", post(broadcast_handler))
        .route("/game/start", post(start_game_handler))
        .route("/game/end", post(end_game_handler))
        .route("/game/reset", post(reset_game_handler))
        .route("/game/state", get(game_state_handler))
        .route("/game/events", get(game_events_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// CORS configuration - "*" or a comma-separated origin list
fn build_cors(client_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if client_origin.trim() == "*" {
        return cors.allow_origin(Any);
    }

    let allowed_origins: Vec<HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    cors.allow_origin(allowed_origins)
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    roster_backend: &'static str,
    roster_players: Option<usize>,
    udp_listener: &'static str,
    uptime_secs: u64,
    players_in_match: usize,
    match_active: bool,
}

async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let roster_players = match state.roster.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "Roster health check failed");
            None
        }
    };
    let database_ok = roster_players.is_some();

    let listener_ok = state.listener_active.load(Ordering::Relaxed);

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if database_ok { "healthy" } else { "unhealthy" },
            database: if database_ok { "connected" } else { "disconnected" },
            roster_backend: state.roster.backend(),
            roster_players,
            udp_listener: if listener_ok { "active" } else { "inactive" },
            uptime_secs: state.uptime_secs(),
            players_in_match: state.game.player_count(),
            match_active: state.game.is_active(),
        }),
    )
}

// ============================================================================
// Roster endpoints
// ============================================================================

#[derive(Serialize)]
struct PlayerListResponse {
    players: Vec<RosterEntry>,
    count: usize,
}

async fn list_players_handler(
    State(state): State<AppState>,
) -> Result<Json<PlayerListResponse>, AppError> {
    let players = state.roster.list().await?;
    Ok(Json(PlayerListResponse {
        count: players.len(),
        players,
    }))
}

async fn get_player_handler(
    State(state): State<AppState>,
    path: Result<Path<u32>, PathRejection>,
) -> Result<Json<RosterEntry>, AppError> {
    let Path(player_id) = path?;
    let codename = state
        .roster
        .lookup_codename(player_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Player not found".to_string()))?;

    Ok(Json(RosterEntry {
        id: player_id,
        codename,
    }))
}

#[derive(Deserialize)]
struct AddPlayerRequest {
    id: u32,
    #[serde(default)]
    codename: Option<String>,
    #[serde(default)]
    equipment_id: Option<u32>,
    #[serde(default)]
    team: Team,
}

#[derive(Serialize)]
struct AddPlayerResponse {
    id: u32,
    codename: String,
    equipment_id: Option<u32>,
    team: Team,
    message: &'static str,
}

async fn add_player_handler(
    State(state): State<AppState>,
    body: Result<Json<AddPlayerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AddPlayerResponse>), AppError> {
    let Json(req) = body?;
    if let Some(equipment_id) = req.equipment_id.filter(|id| is_reserved(*id)) {
        return Err(AppError::BadRequest(format!(
            "Equipment ID {} is a reserved code",
            equipment_id
        )));
    }

    let existing = state.roster.lookup_codename(req.id).await?;
    let requested = req
        .codename
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let codename = match (requested, existing) {
        (Some(new), Some(old)) if new == old => old,
        (Some(new), _) => state.roster.upsert(req.id, new).await?,
        (None, Some(old)) => old,
        (None, None) => {
            return Err(AppError::BadRequest(
                "Codename is required for new players".to_string(),
            ))
        }
    };

    if let Some(equipment_id) = req.equipment_id {
        state
            .game
            .add_player(equipment_id, req.id, codename.clone(), req.team);

        // The roster change stands even if hardware misses the announcement
        if let Err(e) = state.dispatcher.send_single(equipment_id).await {
            warn!(equipment_id, error = %e, "Failed to announce equipment ID");
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(AddPlayerResponse {
            id: req.id,
            codename,
            equipment_id: req.equipment_id,
            team: req.team,
            message: "Player added successfully",
        }),
    ))
}

async fn clear_players_handler(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    state.roster.clear().await?;
    state.game.clear_roster();
    Ok(MessageResponse::new("All players cleared successfully"))
}

// ============================================================================
// Network endpoints
// ============================================================================

#[derive(Serialize)]
struct NetworkResponse {
    address: IpAddr,
    broadcast_port: u16,
    receive_port: u16,
}

fn network_info(state: &AppState) -> NetworkResponse {
    NetworkResponse {
        address: state.dispatcher.address(),
        broadcast_port: state.dispatcher.port(),
        receive_port: state.config.udp.receive_addr.port(),
    }
}

async fn get_network_handler(State(state): State<AppState>) -> Json<NetworkResponse> {
    Json(network_info(&state))
}

#[derive(Deserialize)]
struct SetNetworkRequest {
    address: String,
}

async fn set_network_handler(
    State(state): State<AppState>,
    body: Result<Json<SetNetworkRequest>, JsonRejection>,
) -> Result<Json<NetworkResponse>, AppError> {
    let Json(req) = body?;
    let address: IpAddr = req
        .address
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid network address: {}", req.address)))?;

    state.dispatcher.set_address(address);
    Ok(Json(network_info(&state)))
}

async fn broadcast_handler(
    State(state): State<AppState>,
    path: Result<Path<u32>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let Path(code) = path?;
    state.dispatcher.send_single(code).await?;
    Ok(MessageResponse::new(format!(
        "Equipment ID {} broadcasted successfully",
        code
    )))
}

// ============================================================================
// Match endpoints
// ============================================================================

async fn start_game_handler(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    state.game.start_match();
    state.dispatcher.send_match_start().await?;
    Ok(MessageResponse::new("Game started - code 202 broadcasted"))
}

async fn end_game_handler(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    state.game.end_match();
    state.dispatcher.send_match_end().await?;
    Ok(MessageResponse::new("Game ended - code 221 broadcasted 3 times"))
}

async fn reset_game_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.game.reset_match();
    MessageResponse::new("Game state reset successfully")
}

async fn game_state_handler(State(state): State<AppState>) -> Json<GameSnapshot> {
    Json(state.game.snapshot(SNAPSHOT_EVENT_COUNT))
}

/// `count` stays a string so a malformed value falls back to the default
#[derive(Deserialize)]
struct EventsQuery {
    count: Option<String>,
}

#[derive(Serialize)]
struct EventsResponse {
    events: Vec<Event>,
}

async fn game_events_handler(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<EventsResponse> {
    let count = query
        .count
        .and_then(|c| c.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_EVENT_COUNT)
        .min(EVENT_LOG_CAPACITY);
    Json(EventsResponse {
        events: state.game.recent_events(count),
    })
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RosterError> for AppError {
    fn from(e: RosterError) -> Self {
        match e {
            RosterError::InvalidCodename(msg) => AppError::BadRequest(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<BroadcastError> for AppError {
    fn from(e: BroadcastError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
