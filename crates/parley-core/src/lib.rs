pub mod ids;
pub mod policy;
pub mod protocol;

pub use ids::ConnectionId;
pub use protocol::{ClientMessage, ServerMessage};
