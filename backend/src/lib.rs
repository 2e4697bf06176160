use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use allowlist_core::{AllowList, PlayerRecord};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    players: Arc<RwLock<AllowList>>,
    persist_path: Option<PathBuf>,
    api_secret: Arc<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            players: Arc::new(RwLock::new(AllowList::new())),
            persist_path: None,
            api_secret: Arc::new(api_secret_from_env()),
        }
    }
}

impl AppState {
    pub async fn with_persistence(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut state = Self::default();
        let loaded = load_players(&path).await;
        state.persist_path = Some(path);
        state.players = Arc::new(RwLock::new(AllowList::from_records(loaded)));
        state
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.api_secret = Arc::new(secret.into());
        self
    }

    pub async fn player_count(&self) -> usize {
        self.players.read().await.len()
    }

    fn authorized(&self, provided: Option<&str>) -> bool {
        provided == Some(self.api_secret.as_str())
    }

    async fn persist(&self) {
        if let Some(path) = &self.persist_path {
            let snapshot = {
                let players = self.players.read().await;
                players.players().to_vec()
            };
            // In-memory state stays authoritative; a failed write only logs.
            let _ = save_players(path, &snapshot).await;
        }
    }
}

fn api_secret_from_env() -> String {
    env::var("API_SECRET").unwrap_or_else(|_| "YOUR_SECRET_KEY_123".to_string())
}

/// Reads the backing file as a JSON array of records. An absent file is a
/// fresh start; an unreadable or corrupt file also yields an empty list
/// rather than blocking startup, which resets state until the next save.
pub async fn load_players(path: &std::path::Path) -> Vec<PlayerRecord> {
    match tokio::fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(players) => players,
            Err(err) => {
                error!(path = %path.display(), %err, "corrupt player file, starting empty");
                Vec::new()
            }
        },
        Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(err) => {
            error!(path = %path.display(), %err, "unreadable player file, starting empty");
            Vec::new()
        }
    }
}

/// Overwrites the backing file with the full list, pretty-printed. Returns
/// whether the write succeeded; failures are logged, never retried.
pub async fn save_players(path: &std::path::Path, players: &[PlayerRecord]) -> bool {
    let json = match serde_json::to_vec_pretty(players) {
        Ok(json) => json,
        Err(err) => {
            error!(%err, "failed to serialize player list");
            return false;
        }
    };
    match tokio::fs::write(path, json).await {
        Ok(()) => true,
        Err(err) => {
            error!(path = %path.display(), %err, "failed to write player file");
            false
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Username required")]
    UsernameRequired,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::FORBIDDEN,
            ApiError::UsernameRequired => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/check-player/:username", get(check_player))
        .route("/add-player", post(add_player))
        .route("/remove-player", post(remove_player))
        .route("/players", get(list_players))
        .route("/reset", post(reset))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckPlayerResponse {
    username: String,
    accepted: bool,
    timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddPlayerRequest {
    #[serde(default)]
    username: String,
    secret: Option<String>,
    discord_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemovePlayerRequest {
    #[serde(default)]
    username: String,
    secret: Option<String>,
}

#[derive(Deserialize)]
struct ResetRequest {
    secret: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MutationResponse {
    success: bool,
    username: String,
    total_accepted: usize,
}

#[derive(Serialize)]
struct PlayersResponse {
    players: Vec<PlayerRecord>,
    total: usize,
}

#[derive(Serialize)]
struct ResetResponse {
    success: bool,
    message: String,
}

async fn check_player(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Json<CheckPlayerResponse> {
    let accepted = state.players.read().await.contains(&username);
    Json(CheckPlayerResponse {
        username,
        accepted,
        timestamp: Utc::now(),
    })
}

async fn add_player(
    State(state): State<AppState>,
    Json(payload): Json<AddPlayerRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    if !state.authorized(payload.secret.as_deref()) {
        return Err(ApiError::Unauthorized);
    }
    if payload.username.is_empty() {
        return Err(ApiError::UsernameRequired);
    }

    let mut players = state.players.write().await;
    let added = players.add(&payload.username, payload.discord_id);
    let total = players.len();
    drop(players);

    if added {
        info!(username = %payload.username, total, "player added");
        state.persist().await;
    } else {
        info!(username = %payload.username, "player already accepted");
    }

    Ok(Json(MutationResponse {
        success: true,
        username: payload.username,
        total_accepted: total,
    }))
}

async fn remove_player(
    State(state): State<AppState>,
    Json(payload): Json<RemovePlayerRequest>,
) -> Result<Json<MutationResponse>, ApiError> {
    if !state.authorized(payload.secret.as_deref()) {
        return Err(ApiError::Unauthorized);
    }

    let mut players = state.players.write().await;
    let removed = players.remove(&payload.username);
    let total = players.len();
    drop(players);

    if removed {
        info!(username = %payload.username, total, "player removed");
        state.persist().await;
    }

    Ok(Json(MutationResponse {
        success: true,
        username: payload.username,
        total_accepted: total,
    }))
}

async fn list_players(State(state): State<AppState>) -> Json<PlayersResponse> {
    let players = state.players.read().await;
    Json(PlayersResponse {
        players: players.players().to_vec(),
        total: players.len(),
    })
}

async fn reset(
    State(state): State<AppState>,
    Json(payload): Json<ResetRequest>,
) -> Result<Json<ResetResponse>, ApiError> {
    if !state.authorized(payload.secret.as_deref()) {
        return Err(ApiError::Unauthorized);
    }

    state.players.write().await.reset();
    info!("player list cleared");
    state.persist().await;

    Ok(Json(ResetResponse {
        success: true,
        message: "All players cleared".to_string(),
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let total = state.players.read().await.len();
    Json(json!({ "status": "OK", "players": total }))
}

async fn index(State(state): State<AppState>) -> Html<String> {
    let total = state.players.read().await.len();
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <title>Player Allow-List API</title>
  <style>
    body {{
      font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
      background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
      color: white;
      padding: 20px;
      text-align: center;
    }}
    .container {{
      background: rgba(255,255,255,0.1);
      border-radius: 20px;
      padding: 30px;
      max-width: 600px;
      margin: 50px auto;
      box-shadow: 0 8px 32px rgba(0,0,0,0.3);
    }}
    .status {{
      background: rgba(0,255,0,0.2);
      padding: 15px;
      border-radius: 10px;
      margin: 20px 0;
      font-size: 1.2em;
    }}
    .endpoints {{
      text-align: left;
      background: rgba(0,0,0,0.3);
      padding: 20px;
      border-radius: 10px;
      margin-top: 20px;
    }}
    .endpoints li {{
      margin: 10px 0;
      font-family: monospace;
      list-style: none;
    }}
  </style>
</head>
<body>
  <div class="container">
    <h1>Player Allow-List API</h1>
    <div class="status">
      <p>API is up</p>
      <p>Accepted players: {total}</p>
    </div>
    <div class="endpoints">
      <h3>Endpoints</h3>
      <ul>
        <li>GET /check-player/:username</li>
        <li>POST /add-player</li>
        <li>POST /remove-player</li>
        <li>GET /players</li>
        <li>POST /reset</li>
        <li>GET /health</li>
      </ul>
    </div>
  </div>
</body>
</html>
"#
    ))
}
