use parley_core::policy::{self, BAN_MINUTES, KICK_MINUTES};
use parley_core::{ClientMessage, ConnectionId, ServerMessage};
use parley_store::BanLedger;

use crate::commands;
use crate::room::Room;

/// One unit of inbound work. Connection open/close and frame receipt are
/// the only event kinds; each is processed to completion before the next.
#[derive(Clone, Debug)]
pub enum Inbound {
    Connected(ConnectionId),
    Frame(ConnectionId, String),
    Closed(ConnectionId),
}

/// Delivery instruction produced by the engine. The transport applies
/// these against whatever connections are still open; a `Direct` to a
/// connection that has since closed is a silent no-op.
#[derive(Clone, Debug)]
pub enum Effect {
    Broadcast(ServerMessage),
    Direct(ConnectionId, ServerMessage),
}

/// Owns all room state: session registry, mute set, freeze flag, and the
/// durable ban ledger.
pub struct Engine {
    pub(crate) room: Room,
    pub(crate) bans: BanLedger,
}

impl Engine {
    pub fn new(bans: BanLedger) -> Self {
        Self {
            room: Room::default(),
            bans,
        }
    }

    pub fn handle(&mut self, event: Inbound) -> Vec<Effect> {
        match event {
            Inbound::Connected(conn) => self.on_connected(conn),
            Inbound::Frame(conn, raw) => self.on_frame(conn, &raw),
            Inbound::Closed(conn) => self.on_closed(&conn),
        }
    }

    fn on_connected(&mut self, conn: ConnectionId) -> Vec<Effect> {
        self.room.register(conn);
        vec![self.roster_effect()]
    }

    fn on_frame(&mut self, conn: ConnectionId, raw: &str) -> Vec<Effect> {
        let message: ClientMessage = match serde_json::from_str(raw) {
            Ok(m) => m,
            Err(e) => {
                // Malformed input is discarded without a reply.
                tracing::debug!(conn = %conn, error = %e, "Discarding malformed frame");
                return Vec::new();
            }
        };

        match message {
            ClientMessage::Nick { nick } => self.claim(conn, nick),
            ClientMessage::Chat { nick, text } => self.chat(nick, text),
        }
    }

    fn on_closed(&mut self, conn: &ConnectionId) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(nick) = self.room.unregister(conn) {
            effects.push(Effect::Broadcast(ServerMessage::system(format!(
                "{nick} has left the chat."
            ))));
        }
        effects.push(self.roster_effect());
        effects
    }

    /// Nickname claim: ban check first, then collision against other open
    /// connections. Only the very first successful claim announces a join.
    fn claim(&mut self, conn: ConnectionId, nick: String) -> Vec<Effect> {
        if self.bans.is_banned(&nick) {
            let minutes = self.bans.remaining_minutes(&nick).unwrap_or(0);
            return vec![Effect::Direct(
                conn,
                ServerMessage::Error {
                    message: format!("You are banned for {minutes} more minutes."),
                },
            )];
        }

        if self.room.taken_by_other(&conn, &nick) {
            return vec![Effect::Direct(
                conn,
                ServerMessage::Error {
                    message: format!("Nickname '{nick}' is already taken!"),
                },
            )];
        }

        let Some(previous) = self.room.set_nick(&conn, nick.clone()) else {
            // Frame from a connection we never registered.
            return Vec::new();
        };

        let mut effects = vec![self.roster_effect()];
        if previous.is_none() {
            effects.push(Effect::Broadcast(ServerMessage::system(format!(
                "{nick} has joined the chat."
            ))));
        }
        effects
    }

    /// Inbound chat, evaluated in strict order; first match wins.
    fn chat(&mut self, nick: String, text: String) -> Vec<Effect> {
        // 1. Banned
        if self.bans.is_banned(&nick) {
            let minutes = self.bans.remaining_minutes(&nick).unwrap_or(0);
            return self.notice_to(&nick, format!("You are banned for {minutes} more minutes."));
        }

        // 2. Muted
        if self.room.is_muted(&nick) {
            return self.notice_to(&nick, "You are currently muted and cannot send messages.");
        }

        // 3. Frozen (admin exempt)
        if self.room.frozen() && !policy::is_admin(&nick) {
            return self.notice_to(
                &nick,
                "The chat is currently frozen by the Administrator. Your message was not sent.",
            );
        }

        // 4. Prohibited content. Applies to the admin as well.
        if policy::contains_prohibited(&text) {
            let (_, direct) = self.ban_action(&nick, BAN_MINUTES);
            let mut effects: Vec<Effect> = direct.into_iter().collect();
            effects.push(Effect::Broadcast(ServerMessage::system(format!(
                "User {nick} was auto-banned for using prohibited language."
            ))));
            return effects;
        }

        // 5. Admin command
        if policy::is_admin(&nick) && text.starts_with('/') {
            return commands::dispatch(self, &text);
        }

        // 6. Ordinary message
        vec![Effect::Broadcast(ServerMessage::chat(nick, text))]
    }

    /// Record a ban, then attempt direct delivery of the ban event. The
    /// ledger mutation happens first, so banning a name with no live
    /// connection still persists. Returns whether delivery was possible.
    pub(crate) fn ban_action(&mut self, target: &str, minutes: i64) -> (bool, Option<Effect>) {
        self.bans.ban(target, minutes);
        match self.room.find(target) {
            Some(conn) => (true, Some(Effect::Direct(conn, ServerMessage::Ban { minutes }))),
            None => (false, None),
        }
    }

    /// Kick is advisory only: a direct event, nothing recorded.
    pub(crate) fn kick_action(&self, target: &str) -> Option<Effect> {
        self.room.find(target).map(|conn| {
            Effect::Direct(
                conn,
                ServerMessage::Kick {
                    minutes: KICK_MINUTES,
                },
            )
        })
    }

    pub(crate) fn roster_effect(&self) -> Effect {
        Effect::Broadcast(ServerMessage::Users {
            users: self.room.roster(),
        })
    }

    /// Targeted SYSTEM chat to whichever connection currently holds
    /// exactly `nick`; nothing when no such connection is open.
    fn notice_to(&self, nick: &str, text: impl Into<String>) -> Vec<Effect> {
        match self.room.find(nick) {
            Some(conn) => vec![Effect::Direct(conn, ServerMessage::system(text))],
            None => Vec::new(),
        }
    }
}
