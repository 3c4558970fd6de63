// src/neighbor/mod.rs

mod connection;
mod message_handler;
mod session;
mod timers;
mod types;

// Public exports
pub use connection::{run_session, send_keepalive, send_notification, send_open, BGPFramed};
pub use message_handler::{dispatch, Action, MessageHandler};
pub use session::PeerSession;
pub use timers::{keepalive_period, KeepaliveTimer};
pub use types::{BGPState, DisconnectReason, Event};
