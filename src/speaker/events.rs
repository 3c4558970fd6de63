// File: src/speaker/events.rs
//
// Route notifications handed from sessions to an external route store.

use std::net::Ipv4Addr;

use crate::bgp;

#[derive(Debug, Clone, PartialEq)]
pub struct RouteAttributes {
    pub next_hop: Option<Ipv4Addr>,
    pub as_path: bgp::Aspath,
}

/// Routes announced by one UPDATE.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub routes: Vec<(bgp::Prefix, RouteAttributes)>,
    /// Community value tagged with the local AS, 0 when absent.
    pub community: u16,
    pub local_pref: Option<u32>,
    /// BGP identifier of the announcing peer.
    pub rid: Ipv4Addr,
}

/// Receives every route change a session applies to its Adj-RIB-In.
///
/// Called from the session task, so implementations must not block.
pub trait RouteSink: Send + Sync {
    fn update(&self, update: Update);
    fn withdraw(&self, prefixes: &[bgp::Prefix], rid: Ipv4Addr);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl RouteSink for NoopSink {
    fn update(&self, _update: Update) {}
    fn withdraw(&self, _prefixes: &[bgp::Prefix], _rid: Ipv4Addr) {}
}
