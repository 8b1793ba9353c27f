//! Fixed moderation policy: the admin identity, penalty durations, and the
//! prohibited-word list.

/// The single privileged nickname, compared lowercase.
pub const ADMIN_NICK: &str = "nimda";

/// Attribution used for server-generated chat announcements.
pub const SYSTEM_NICK: &str = "SYSTEM";

/// Minutes applied by both auto-moderation and admin `/ban`.
pub const BAN_MINUTES: i64 = 35;

/// Minutes reported with a kick event. Advisory only, never recorded.
pub const KICK_MINUTES: i64 = 5;

/// Words that trigger an automatic ban when they appear anywhere in a
/// message, case-insensitively.
pub const PROHIBITED_WORDS: &[&str] = &[
    "stupid",
    "idiot",
    "dumb",
    "fuck",
    "bitch",
    "motherfucker",
    "mf",
    "dick",
    "pussy",
];

/// True when `nick` is the admin identity. Lowercase comparison; display
/// case is irrelevant for the privilege check.
pub fn is_admin(nick: &str) -> bool {
    nick.to_lowercase() == ADMIN_NICK
}

/// Case-insensitive substring scan against the prohibited-word list.
pub fn contains_prohibited(text: &str) -> bool {
    let lower = text.to_lowercase();
    PROHIBITED_WORDS.iter().any(|w| lower.contains(w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_check_is_case_insensitive() {
        assert!(is_admin("nimda"));
        assert!(is_admin("NiMdA"));
        assert!(!is_admin("admin"));
    }

    #[test]
    fn prohibited_matches_substrings_any_case() {
        assert!(contains_prohibited("you are So Stupid"));
        assert!(contains_prohibited("whatIDIOTs"));
        assert!(!contains_prohibited("hello there"));
    }

    #[test]
    fn clean_text_passes() {
        assert!(!contains_prohibited(""));
        assert!(!contains_prohibited("stup id"));
    }
}
