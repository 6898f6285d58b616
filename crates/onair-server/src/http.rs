use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use onair_player::{PlayerEvent, Snapshot, StateManager};
use onair_proto::protocol::{Command, Quality, Visibility};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::chat::{self, ChatStore};
use crate::logging::RecentLogs;
use crate::proxy::{self, ProxyState};

#[derive(Clone)]
struct HttpState {
    state_manager: StateManager,
    event_tx: mpsc::Sender<PlayerEvent>,
    logs: RecentLogs,
}

/// Everything the HTTP surface is built from.
pub struct Services {
    pub state_manager: StateManager,
    pub event_tx: mpsc::Sender<PlayerEvent>,
    pub logs: RecentLogs,
    pub chat: Arc<ChatStore>,
    pub proxy: ProxyState,
}

/// Control API, now-playing proxy and chat on one router, CORS open.
pub fn router(services: Services) -> Router {
    let control = Router::new()
        .route("/api/state", get(get_state))
        .route("/api/logs", get(get_logs))
        .route("/api/connect", post(connect))
        .route("/api/toggle", post(toggle))
        .route("/api/volume/:percent", post(set_volume))
        .route("/api/mute", post(toggle_mute))
        .route("/api/visibility/:visibility", post(set_visibility))
        .route("/api/quality/:quality", post(set_quality))
        .with_state(HttpState {
            state_manager: services.state_manager,
            event_tx: services.event_tx,
            logs: services.logs,
        });

    control
        .merge(proxy::routes(services.proxy))
        .merge(chat::routes(services.chat))
        .layer(CorsLayer::permissive())
}

pub fn start_server(bind_address: String, port: u16, app: Router) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API server listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

async fn get_state(State(state): State<HttpState>) -> Json<Snapshot> {
    Json(state.state_manager.snapshot().await)
}

async fn get_logs(State(state): State<HttpState>) -> Json<Vec<String>> {
    Json(state.logs.snapshot())
}

async fn send(state: &HttpState, cmd: Command) -> StatusCode {
    info!("HTTP API: {:?}", cmd);
    if state.event_tx.send(PlayerEvent::Command(cmd)).await.is_err() {
        error!("HTTP API: player is not running");
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    StatusCode::OK
}

async fn connect(State(state): State<HttpState>) -> StatusCode {
    send(&state, Command::Connect).await
}

async fn toggle(State(state): State<HttpState>) -> StatusCode {
    send(&state, Command::TogglePlayback).await
}

async fn set_volume(State(state): State<HttpState>, Path(percent): Path<i32>) -> StatusCode {
    let value = (percent as f32 / 100.0).clamp(0.0, 1.0);
    send(&state, Command::SetVolume { value }).await
}

async fn toggle_mute(State(state): State<HttpState>) -> StatusCode {
    send(&state, Command::ToggleMute).await
}

async fn set_visibility(
    State(state): State<HttpState>,
    Path(visibility): Path<Visibility>,
) -> StatusCode {
    send(&state, Command::SetVisibility { visibility }).await
}

async fn set_quality(State(state): State<HttpState>, Path(quality): Path<Quality>) -> StatusCode {
    send(&state, Command::SetNetworkQuality { quality }).await
}
