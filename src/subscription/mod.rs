// WebSocket subscription management

pub mod manager;
pub mod protocol;

pub use manager::ConnectionManager;
pub use protocol::{subject_matches, ClientMessage, ErrorMessage, EventMessage};
