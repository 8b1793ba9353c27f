use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::policy::SYSTEM_NICK;

/// Envelopes a client may send. Anything that fails to parse into one of
/// these is discarded without a reply.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "nick")]
    Nick { nick: String },

    #[serde(rename = "chat")]
    Chat { nick: String, text: String },
}

/// Envelopes the server delivers, broadcast or targeted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Roster of currently claimed nicknames, in claim order.
    #[serde(rename = "users")]
    Users { users: Vec<String> },

    #[serde(rename = "chat")]
    Chat {
        nick: String,
        text: String,
        timestamp: String,
    },

    #[serde(rename = "error")]
    Error { message: String },

    /// Advisory: the client is banned for `minutes`. The server never
    /// force-closes the socket.
    #[serde(rename = "ban")]
    Ban { minutes: i64 },

    #[serde(rename = "kick")]
    Kick { minutes: i64 },

    #[serde(rename = "highlight")]
    Highlight { text: String },

    #[serde(rename = "clear")]
    Clear,
}

impl ServerMessage {
    /// Chat envelope stamped with the current local wall-clock time.
    pub fn chat(nick: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Chat {
            nick: nick.into(),
            text: text.into(),
            timestamp: Local::now().format("%I:%M:%S %p").to_string(),
        }
    }

    /// Chat envelope attributed to SYSTEM.
    pub fn system(text: impl Into<String>) -> Self {
        Self::chat(SYSTEM_NICK, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nick_message() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"nick","nick":"alice"}"#).unwrap();
        match msg {
            ClientMessage::Nick { nick } => assert_eq!(nick, "alice"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parse_chat_message() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"chat","nick":"bob","text":"hi"}"#).unwrap();
        match msg {
            ClientMessage::Chat { nick, text } => {
                assert_eq!(nick, "bob");
                assert_eq!(text, "hi");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_fails_to_parse() {
        let res = serde_json::from_str::<ClientMessage>(r#"{"type":"emote","nick":"x"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn users_envelope_wire_shape() {
        let msg = ServerMessage::Users {
            users: vec!["alice".into(), "bob".into()],
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"users","users":["alice","bob"]}"#);
    }

    #[test]
    fn clear_envelope_carries_only_type() {
        let json = serde_json::to_string(&ServerMessage::Clear).unwrap();
        assert_eq!(json, r#"{"type":"clear"}"#);
    }

    #[test]
    fn ban_and_kick_carry_minutes() {
        let json = serde_json::to_string(&ServerMessage::Ban { minutes: 35 }).unwrap();
        assert_eq!(json, r#"{"type":"ban","minutes":35}"#);
        let json = serde_json::to_string(&ServerMessage::Kick { minutes: 5 }).unwrap();
        assert_eq!(json, r#"{"type":"kick","minutes":5}"#);
    }

    #[test]
    fn chat_helper_stamps_timestamp() {
        let msg = ServerMessage::chat("alice", "hello");
        match msg {
            ServerMessage::Chat {
                nick,
                text,
                timestamp,
            } => {
                assert_eq!(nick, "alice");
                assert_eq!(text, "hello");
                assert!(!timestamp.is_empty());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn system_helper_attributes_to_system() {
        let json = serde_json::to_string(&ServerMessage::system("hi")).unwrap();
        assert!(json.contains("\"nick\":\"SYSTEM\""));
    }
}
