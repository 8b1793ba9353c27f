use std::collections::HashSet;

use parley_core::ConnectionId;

/// Live mapping of open connection -> chosen nickname, plus the mute set
/// and the global freeze flag.
///
/// Sessions are kept in registration order, so the roster reflects claim
/// order. Nickname lookups (`find`, `rename`, taken-check) are exact-match
/// on the displayed string; only the mute set is lowercase-normalized.
#[derive(Default)]
pub(crate) struct Room {
    sessions: Vec<Session>,
    muted: HashSet<String>,
    frozen: bool,
}

struct Session {
    conn: ConnectionId,
    nick: Option<String>,
}

impl Room {
    /// Add a connection with no identity yet.
    pub fn register(&mut self, conn: ConnectionId) {
        self.sessions.push(Session { conn, nick: None });
    }

    /// Remove a connection. If it held an identity, its lowercase mute
    /// entry is dropped and the identity returned.
    pub fn unregister(&mut self, conn: &ConnectionId) -> Option<String> {
        let idx = self.sessions.iter().position(|s| &s.conn == conn)?;
        let nick = self.sessions.remove(idx).nick;
        if let Some(nick) = &nick {
            self.muted.remove(&nick.to_lowercase());
        }
        nick
    }

    /// Bind `nick` to `conn`. Outer None when the connection is unknown;
    /// inner value is the previous identity (None on the very first claim).
    pub fn set_nick(&mut self, conn: &ConnectionId, nick: String) -> Option<Option<String>> {
        let session = self.sessions.iter_mut().find(|s| &s.conn == conn)?;
        Some(session.nick.replace(nick))
    }

    /// True when another open connection currently holds exactly
    /// `candidate`. A connection re-claiming its own identity is not a
    /// collision.
    pub fn taken_by_other(&self, conn: &ConnectionId, candidate: &str) -> bool {
        self.sessions
            .iter()
            .any(|s| &s.conn != conn && s.nick.as_deref() == Some(candidate))
    }

    /// First open connection bound to exactly `nick`.
    pub fn find(&self, nick: &str) -> Option<ConnectionId> {
        self.sessions
            .iter()
            .find(|s| s.nick.as_deref() == Some(nick))
            .map(|s| s.conn.clone())
    }

    /// Rebind the holder of `old` to `new`. False when no connection
    /// currently holds `old`.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        match self
            .sessions
            .iter_mut()
            .find(|s| s.nick.as_deref() == Some(old))
        {
            Some(session) => {
                session.nick = Some(new.to_string());
                true
            }
            None => false,
        }
    }

    /// All claimed nicknames in registration order.
    pub fn roster(&self) -> Vec<String> {
        self.sessions
            .iter()
            .filter_map(|s| s.nick.clone())
            .collect()
    }

    /// Add to the mute set; false when already present. `nick` is
    /// normalized to lowercase here.
    pub fn mute(&mut self, nick: &str) -> bool {
        self.muted.insert(nick.to_lowercase())
    }

    /// Remove from the mute set; false when absent.
    pub fn unmute(&mut self, nick: &str) -> bool {
        self.muted.remove(&nick.to_lowercase())
    }

    pub fn is_muted(&self, nick: &str) -> bool {
        self.muted.contains(&nick.to_lowercase())
    }

    pub fn frozen(&self) -> bool {
        self.frozen
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }
}
