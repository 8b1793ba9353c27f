use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use parley_core::ConnectionId;
use parley_engine::Inbound;
use tokio::sync::mpsc;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const CONN_TIMEOUT: Duration = Duration::from_secs(90);

/// One connected WebSocket client.
pub struct Conn {
    pub id: ConnectionId,
    tx: mpsc::Sender<String>,
    connected: AtomicBool,
    last_pong: AtomicU64,
}

impl Conn {
    fn new(id: ConnectionId, tx: mpsc::Sender<String>) -> Self {
        Self {
            id,
            tx,
            connected: AtomicBool::new(true),
            last_pong: AtomicU64::new(now_secs()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn record_pong(&self) {
        self.last_pong.store(now_secs(), Ordering::Relaxed);
    }

    fn is_alive(&self) -> bool {
        let last = self.last_pong.load(Ordering::Relaxed);
        now_secs().saturating_sub(last) < CONN_TIMEOUT.as_secs()
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Registry of open connections and their outbound send queues. This is
/// the delivery side only; nickname state lives in the engine.
pub struct ConnRegistry {
    conns: DashMap<ConnectionId, Arc<Conn>>,
    max_send_queue: usize,
}

impl ConnRegistry {
    pub fn new(max_send_queue: usize) -> Self {
        Self {
            conns: DashMap::new(),
            max_send_queue,
        }
    }

    /// Register a new connection and return its ID plus the outbound queue
    /// the writer task drains.
    pub fn register(&self) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.max_send_queue);
        self.conns
            .insert(id.clone(), Arc::new(Conn::new(id.clone(), tx)));
        (id, rx)
    }

    pub fn unregister(&self, id: &ConnectionId) {
        if let Some((_, conn)) = self.conns.remove(id) {
            conn.connected.store(false, Ordering::Relaxed);
        }
    }

    /// Deliver to one connection if it is still registered. A closed or
    /// missing connection is a silent no-op; a full queue drops the
    /// message with a warning.
    pub fn send_to(&self, id: &ConnectionId, message: String) -> bool {
        let Some(conn) = self.conns.get(id) else {
            return false;
        };
        match conn.tx.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                tracing::warn!(conn = %id, msg_len = msg.len(), "Send queue full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Best-effort fan-out to every currently open connection.
    pub fn broadcast(&self, message: &str) {
        for entry in self.conns.iter() {
            let conn = entry.value();
            if conn.is_connected() {
                let _ = conn.tx.try_send(message.to_string());
            }
        }
    }

    pub fn count(&self) -> usize {
        self.conns.len()
    }

    fn record_pong(&self, id: &ConnectionId) {
        if let Some(conn) = self.conns.get(id) {
            conn.record_pong();
        }
    }

    /// Drop connections that have not answered a ping within the timeout.
    /// Returns the removed IDs so the caller can retire their sessions.
    pub fn cleanup_dead(&self) -> Vec<ConnectionId> {
        let dead: Vec<ConnectionId> = self
            .conns
            .iter()
            .filter(|entry| !entry.value().is_alive())
            .map(|entry| entry.key().clone())
            .collect();

        for id in &dead {
            self.unregister(id);
            tracing::info!(conn = %id, "Cleaned up dead connection");
        }
        dead
    }
}

/// Handle a WebSocket connection: split into reader/writer tasks with a
/// heartbeat, then retire the session when either side ends.
pub async fn handle_ws_connection(
    socket: WebSocket,
    conn_id: ConnectionId,
    mut rx: mpsc::Receiver<String>,
    registry: Arc<ConnRegistry>,
    events: mpsc::Sender<Inbound>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Writer: drain the outbound queue, ping periodically.
    let writer_id = conn_id.clone();
    let writer_registry = Arc::clone(&registry);
    let writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        ping_interval.tick().await; // consume first immediate tick

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Some(text) => {
                            if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(WsMessage::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }

        writer_registry.unregister(&writer_id);
    });

    // Reader: forward frames to the engine, track pongs.
    let reader_id = conn_id.clone();
    let reader_registry = Arc::clone(&registry);
    let reader_events = events.clone();
    let reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            match msg {
                WsMessage::Text(text) => {
                    let _ = reader_events
                        .send(Inbound::Frame(reader_id.clone(), text.to_string()))
                        .await;
                }
                WsMessage::Pong(_) => reader_registry.record_pong(&reader_id),
                WsMessage::Close(_) => break,
                WsMessage::Ping(_) => {} // axum answers pings itself
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = writer => {},
        _ = reader => {},
    }

    registry.unregister(&conn_id);
    let _ = events.send(Inbound::Closed(conn_id)).await;
}

/// Periodic sweep retiring connections that stopped answering pings. Each
/// removal is reported to the engine as a close so the room stays in sync.
pub fn start_cleanup_task(
    registry: Arc<ConnRegistry>,
    interval: Duration,
    events: mpsc::Sender<Inbound>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            for id in registry.cleanup_dead() {
                let _ = events.send(Inbound::Closed(id)).await;
            }
        }
    })
}
