// src/neighbor/types.rs

use std::fmt;

use crate::bgp;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BGPState {
    /// Transport up, our OPEN sent, waiting for the peer's.
    #[default]
    OpenSent,
    Established,
    /// Disconnected. Nothing is written to the transport any more.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    KeepaliveTimerExpires,
    ManualStop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisconnectReason {
    /// The peer closed the transport.
    PeerClosed,
    ManualStop,
    NotificationReceived(bgp::BGPNotificationMessage),
    /// The stream could not be framed any more; a NOTIFICATION was sent.
    FramingError(bgp::BgpValidationError),
    TransportError(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DisconnectReason::PeerClosed => write!(f, "connection closed by peer"),
            DisconnectReason::ManualStop => write!(f, "manual stop"),
            DisconnectReason::NotificationReceived(n) => {
                write!(f, "peer sent NOTIFICATION {}", n)
            }
            DisconnectReason::FramingError(e) => write!(f, "framing error: {}", e),
            DisconnectReason::TransportError(e) => write!(f, "transport error: {}", e),
        }
    }
}
