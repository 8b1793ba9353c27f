pub mod client;
pub mod fanout;
pub mod server;

pub use client::ConnRegistry;
pub use server::{start, AppState, ServerConfig, ServerHandle};
