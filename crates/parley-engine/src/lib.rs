//! Session and moderation state machine.
//!
//! The engine is pure with respect to transport: it consumes [`Inbound`]
//! events (connection opened, raw frame received, connection closed) and
//! returns [`Effect`]s for the caller to deliver. All room state is owned
//! here, so driving the engine from a single task gives run-to-completion
//! processing per event with no locks around moderation state.

mod commands;
mod engine;
mod room;

pub use engine::{Effect, Engine, Inbound};
