// src/neighbor/message_handler.rs

use super::types::DisconnectReason;
use crate::bgp;

/// What the connection loop should do after a message was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Continue,
    /// The peer's OPEN was accepted: start the keepalive cycle.
    Established,
    Disconnect(DisconnectReason),
}

/// Receives decoded messages for one session.
pub trait MessageHandler {
    fn open_received(&mut self, open: bgp::BGPOpenMessage) -> Action;
    fn message_received(&mut self, message: bgp::Message) -> Action;
}

pub fn dispatch<H: MessageHandler + ?Sized>(handler: &mut H, message: bgp::Message) -> Action {
    match message {
        bgp::Message::Open(open) => handler.open_received(open),
        message => handler.message_received(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;

    #[derive(Default)]
    struct Recorder {
        opens: Vec<bgp::BGPOpenMessage>,
        others: Vec<bgp::MessageType>,
    }

    impl MessageHandler for Recorder {
        fn open_received(&mut self, open: bgp::BGPOpenMessage) -> Action {
            self.opens.push(open);
            Action::Established
        }

        fn message_received(&mut self, message: bgp::Message) -> Action {
            self.others.push(message.message_type());
            Action::Continue
        }
    }

    #[test]
    fn test_dispatch_routes_open_separately() {
        let mut r = Recorder::default();
        let open = bgp::BGPOpenMessage::new(64496, Ipv4Addr::LOCALHOST, 180);

        assert_eq!(
            dispatch(&mut r, bgp::Message::Open(open.clone())),
            Action::Established
        );
        assert_eq!(dispatch(&mut r, bgp::Message::Keepalive), Action::Continue);
        assert_eq!(
            dispatch(&mut r, bgp::Message::Update(bgp::BGPUpdateMessage::new())),
            Action::Continue
        );

        assert_eq!(r.opens, vec![open]);
        assert_eq!(
            r.others,
            vec![bgp::MessageType::Keepalive, bgp::MessageType::Update]
        );
    }
}
