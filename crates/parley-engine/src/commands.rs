use parley_core::policy::{BAN_MINUTES, KICK_MINUTES};
use parley_core::ServerMessage;

use crate::engine::{Effect, Engine};

/// Admin command processor. Token 0 is the command, token 1 the primary
/// target, token 2 the new name for `/rename`. Unknown commands and
/// missing arguments produce a room-wide SYSTEM notice naming the command.
pub(crate) fn dispatch(engine: &mut Engine, text: &str) -> Vec<Effect> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    let cmd = parts.first().copied().unwrap_or("");
    let target = parts.get(1).copied();

    match (cmd, target) {
        ("/freeze", _) => freeze(engine, true),
        ("/unfreeze", _) => freeze(engine, false),
        ("/ban", Some(target)) => ban(engine, target),
        ("/kick", Some(target)) => kick(engine, target),
        ("/rename", Some(target)) => match parts.get(2) {
            Some(new) => rename(engine, target, new),
            None => unknown(cmd),
        },
        ("/mute", Some(target)) => mute(engine, target),
        ("/unmute", Some(target)) => unmute(engine, target),
        ("/highlight", Some(_)) => {
            vec![Effect::Broadcast(ServerMessage::Highlight {
                text: parts[1..].join(" "),
            })]
        }
        ("/clear", _) => vec![
            Effect::Broadcast(ServerMessage::Clear),
            system("Admin cleared the chat history for everyone."),
        ],
        ("/unban", Some(target)) => unban(engine, target),
        _ => unknown(cmd),
    }
}

fn system(text: impl Into<String>) -> Effect {
    Effect::Broadcast(ServerMessage::system(text))
}

fn unknown(cmd: &str) -> Vec<Effect> {
    vec![system(format!(
        "Admin command error: Unknown command or missing arguments for {cmd}."
    ))]
}

fn freeze(engine: &mut Engine, desired: bool) -> Vec<Effect> {
    if engine.room.frozen() == desired {
        let state = if desired { "frozen" } else { "unfrozen" };
        return vec![system(format!("Chat is already {state}."))];
    }
    engine.room.set_frozen(desired);
    let verb = if desired { "FROZEN" } else { "UNFROZEN" };
    vec![system(format!("Admin has {verb} the chat."))]
}

fn ban(engine: &mut Engine, target: &str) -> Vec<Effect> {
    // The ledger records the ban whether or not the target is connected;
    // "not found" reports only that no direct event could be delivered.
    let (delivered, direct) = engine.ban_action(target, BAN_MINUTES);
    let mut effects: Vec<Effect> = direct.into_iter().collect();
    effects.push(if delivered {
        system(format!("Admin banned {target} for {BAN_MINUTES} minutes."))
    } else {
        system(format!("User {target} not found."))
    });
    effects
}

fn kick(engine: &mut Engine, target: &str) -> Vec<Effect> {
    match engine.kick_action(target) {
        Some(direct) => vec![
            direct,
            system(format!("Admin kicked {target} for {KICK_MINUTES} minutes.")),
        ],
        None => vec![system(format!("User {target} not found."))],
    }
}

fn rename(engine: &mut Engine, target: &str, new: &str) -> Vec<Effect> {
    if engine.room.rename(target, new) {
        vec![
            engine.roster_effect(),
            system(format!("{target} has been renamed to {new} by Admin.")),
        ]
    } else {
        vec![system(format!("User {target} not found for rename."))]
    }
}

fn mute(engine: &mut Engine, target: &str) -> Vec<Effect> {
    if engine.room.mute(target) {
        vec![system(format!("Admin muted {target}."))]
    } else {
        vec![system(format!("User {target} is already muted."))]
    }
}

fn unmute(engine: &mut Engine, target: &str) -> Vec<Effect> {
    if engine.room.unmute(target) {
        vec![system(format!("Admin unmuted {target}."))]
    } else {
        vec![system(format!("User {target} is not currently muted."))]
    }
}

fn unban(engine: &mut Engine, target: &str) -> Vec<Effect> {
    if engine.bans.unban(target) {
        vec![system(format!("Admin manually unbanned {target}."))]
    } else {
        vec![system(format!("User {target} is not currently banned."))]
    }
}
