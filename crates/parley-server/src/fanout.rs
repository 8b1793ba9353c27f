use parley_engine::Effect;

use crate::client::ConnRegistry;

/// Apply the engine's delivery instructions against whatever connections
/// are still open.
pub fn apply(registry: &ConnRegistry, effects: Vec<Effect>) {
    for effect in effects {
        match effect {
            Effect::Broadcast(msg) => {
                if let Ok(json) = serde_json::to_string(&msg) {
                    registry.broadcast(&json);
                }
            }
            Effect::Direct(conn, msg) => {
                if let Ok(json) = serde_json::to_string(&msg) {
                    // Connection may have closed between lookup and send.
                    registry.send_to(&conn, json);
                }
            }
        }
    }
}
