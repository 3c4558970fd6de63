// src/neighbor/session.rs

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use super::message_handler::{Action, MessageHandler};
use super::timers;
use super::types::{BGPState, DisconnectReason};
use crate::bgp::{self, Flatten};
use crate::rib::{AdjRib, PeerIdentity};
use crate::speaker::{Context, RouteAttributes, RouteSink, Update};

/// Protocol state of one peer connection, independent of the transport.
pub struct PeerSession {
    ctx: Arc<Context>,
    sink: Arc<dyn RouteSink>,
    remote: Option<SocketAddr>,
    state: BGPState,
    peer: Option<PeerIdentity>,
    adj_rib: Option<AdjRib>,
}

impl PeerSession {
    pub fn new(ctx: Arc<Context>, sink: Arc<dyn RouteSink>, remote: Option<SocketAddr>) -> Self {
        PeerSession {
            ctx,
            sink,
            remote,
            state: BGPState::OpenSent,
            peer: None,
            adj_rib: None,
        }
    }

    /// The OPEN sent as soon as the transport is up.
    pub fn local_open(&self) -> bgp::BGPOpenMessage {
        let config = &self.ctx.config;
        bgp::BGPOpenMessage::new(config.asn, config.rid, config.hold_time())
    }

    pub fn keepalive_period(&self) -> Option<Duration> {
        timers::keepalive_period(self.ctx.config.hold_time())
    }

    /// Period of the statistics log, when enabled.
    pub fn statistics_interval(&self) -> Option<Duration> {
        let config = &self.ctx.config;
        config.statistics().then(|| config.statistics_interval())
    }

    pub fn state(&self) -> BGPState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != BGPState::Idle
    }

    pub fn is_established(&self) -> bool {
        self.state == BGPState::Established
    }

    pub fn peer(&self) -> Option<&PeerIdentity> {
        self.peer.as_ref()
    }

    pub fn remote(&self) -> Option<SocketAddr> {
        self.remote
    }

    pub fn adj_rib(&self) -> Option<&AdjRib> {
        self.adj_rib.as_ref()
    }

    pub fn log_statistics(&self) {
        if let Some(rib) = &self.adj_rib {
            log::info!(
                "STATS ({}): adj_rib: {} routes, total: {} routes",
                rib.peer(),
                rib.count(),
                self.ctx.total_routes()
            );
        }
    }

    /// Marks the session inactive and discards its Adj-RIB-In.
    pub fn close(&mut self, reason: &DisconnectReason) {
        if !self.is_active() {
            return;
        }
        match self.remote {
            Some(addr) => log::info!("connection to {} lost: {}", addr, reason),
            None => log::info!("connection lost: {}", reason),
        }
        if self.ctx.config.statistics() {
            self.log_statistics();
        }
        self.state = BGPState::Idle;
        self.adj_rib = None;
    }

    fn update_received(&mut self, update: bgp::BGPUpdateMessage) {
        let (rib, peer) = match (self.adj_rib.as_mut(), self.peer) {
            (Some(rib), Some(peer)) => (rib, peer),
            _ => {
                log::warn!("UPDATE received before OPEN, ignoring");
                return;
            }
        };
        let update = Arc::new(update);

        for prefix in &update.withdrawn_routes {
            rib.withdraw(prefix);
        }
        if !update.withdrawn_routes.is_empty() {
            self.sink.withdraw(&update.withdrawn_routes, peer.router_id);
        }

        if update.nlri.is_empty() {
            return;
        }
        let next_hop = update.next_hop();
        let as_path = update.as_path().cloned().unwrap_or_default();
        let hops = as_path.flatten_aspath();
        if let (Some(origin_as), Some(dest_as)) = (hops.first(), hops.last()) {
            log::debug!("learned route to {} via {}", dest_as, origin_as);
        }

        let mut routes = Vec::with_capacity(update.nlri.len());
        for prefix in &update.nlri {
            rib.update(*prefix, next_hop, as_path.clone(), update.clone());
            routes.push((
                *prefix,
                RouteAttributes {
                    next_hop,
                    as_path: as_path.clone(),
                },
            ));
        }
        self.sink.update(Update {
            routes,
            community: update.community_for(self.ctx.config.asn),
            local_pref: update.local_pref(),
            rid: peer.router_id,
        });
    }
}

impl MessageHandler for PeerSession {
    fn open_received(&mut self, open: bgp::BGPOpenMessage) -> Action {
        if self.peer.is_some() {
            log::warn!("ignoring second OPEN from {}", open.router_id);
            return Action::Continue;
        }
        log::info!("OPEN received: {}", open);
        let peer = PeerIdentity::from(&open);
        self.peer = Some(peer);
        self.adj_rib = Some(AdjRib::new(peer, self.ctx.stats.clone()));
        self.state = BGPState::Established;
        Action::Established
    }

    fn message_received(&mut self, message: bgp::Message) -> Action {
        match message {
            bgp::Message::Update(update) => {
                self.update_received(update);
                Action::Continue
            }
            bgp::Message::Keepalive => {
                log::debug!("KEEPALIVE received");
                Action::Continue
            }
            bgp::Message::Notification(notification) => {
                log::warn!("NOTIFICATION received: {}", notification);
                Action::Disconnect(DisconnectReason::NotificationReceived(notification))
            }
            bgp::Message::Open(open) => self.open_received(open),
        }
    }
}
