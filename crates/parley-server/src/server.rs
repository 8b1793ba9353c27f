use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use parley_engine::{Engine, Inbound};
use parley_store::BanLedger;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::client::{self, ConnRegistry};
use crate::fanout;

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
    pub bans_file: PathBuf,
    pub public_dir: PathBuf,
    pub max_send_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            bans_file: PathBuf::from("bans.json"),
            public_dir: PathBuf::from("public"),
            max_send_queue: 256,
        }
    }
}

/// Shared state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnRegistry>,
    pub events_tx: mpsc::Sender<Inbound>,
}

/// Build the Axum router: WebSocket endpoint, health check, and the
/// static client assets as a fallback.
pub fn build_router(state: AppState, public_dir: &Path) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .fallback_service(ServeDir::new(public_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Create and start the server. Returns a handle that keeps the
/// background tasks alive.
pub async fn start(config: ServerConfig) -> Result<ServerHandle, std::io::Error> {
    let registry = Arc::new(ConnRegistry::new(config.max_send_queue));
    let (events_tx, events_rx) = mpsc::channel::<Inbound>(1024);

    let engine = Engine::new(BanLedger::load(&config.bans_file));
    let engine_handle = tokio::spawn(process_events(events_rx, engine, Arc::clone(&registry)));

    let cleanup = client::start_cleanup_task(
        Arc::clone(&registry),
        Duration::from_secs(60),
        events_tx.clone(),
    );

    let state = AppState {
        registry: Arc::clone(&registry),
        events_tx,
    };
    let router = build_router(state, &config.public_dir);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "Parley server started");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server_handle,
        _engine: engine_handle,
        _cleanup: cleanup,
    })
}

/// Handle returned by `start()`.
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
    _engine: tokio::task::JoinHandle<()>,
    _cleanup: tokio::task::JoinHandle<()>,
}

/// Single consumer of all inbound events. The engine and every piece of
/// room state live exclusively in this task, so each event is processed
/// to completion before the next is taken.
async fn process_events(
    mut rx: mpsc::Receiver<Inbound>,
    mut engine: Engine,
    registry: Arc<ConnRegistry>,
) {
    while let Some(event) = rx.recv().await {
        let effects = engine.handle(event);
        fanout::apply(&registry, effects);
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (conn_id, rx) = state.registry.register();
    tracing::info!(conn = %conn_id, "WebSocket client connected");

    let _ = state.events_tx.send(Inbound::Connected(conn_id.clone())).await;

    client::handle_ws_connection(socket, conn_id, rx, state.registry, state.events_tx).await;
}

/// Health check HTTP endpoint.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "healthy",
        "connections": state.registry.count(),
    }))
}
