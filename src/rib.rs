use std::collections::HashMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::bgp;

/// Process-wide route statistics, shared by every session.
#[derive(Debug, Default)]
pub struct RouteStats {
    total_routes: AtomicU64,
}

impl RouteStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one received route and returns the new total.
    pub fn record_route(&self) -> u64 {
        self.total_routes.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn total_routes(&self) -> u64 {
        self.total_routes.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerIdentity {
    pub asn: u16,
    pub router_id: Ipv4Addr,
    pub hold_time: u16,
}

impl From<&bgp::BGPOpenMessage> for PeerIdentity {
    fn from(open: &bgp::BGPOpenMessage) -> Self {
        PeerIdentity {
            asn: open.asn,
            router_id: open.router_id,
            hold_time: open.hold_time,
        }
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.router_id, self.asn)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteEntry {
    pub next_hop: Option<Ipv4Addr>,
    pub as_path: bgp::Aspath,
    /// The UPDATE that last announced this prefix.
    pub message: Arc<bgp::BGPUpdateMessage>,
}

/// Adj-RIB-In for one peer session: the latest route per prefix.
#[derive(Debug)]
pub struct AdjRib {
    peer: PeerIdentity,
    table: HashMap<bgp::Prefix, RouteEntry>,
    routes_received: u64,
    stats: Arc<RouteStats>,
}

impl AdjRib {
    pub fn new(peer: PeerIdentity, stats: Arc<RouteStats>) -> Self {
        AdjRib {
            peer,
            table: HashMap::new(),
            routes_received: 0,
            stats,
        }
    }

    pub fn peer(&self) -> &PeerIdentity {
        &self.peer
    }

    pub fn update(
        &mut self,
        prefix: bgp::Prefix,
        next_hop: Option<Ipv4Addr>,
        as_path: bgp::Aspath,
        message: Arc<bgp::BGPUpdateMessage>,
    ) {
        log::debug!(
            "UPDATE ({}): {} {} {:?}",
            self.peer,
            prefix,
            next_hop.map(|nh| nh.to_string()).unwrap_or_default(),
            bgp::Flatten::flatten_aspath(&as_path)
        );
        self.routes_received += 1;
        self.stats.record_route();
        self.table.insert(
            prefix,
            RouteEntry {
                next_hop,
                as_path,
                message,
            },
        );
    }

    /// Removes `prefix`. Withdrawing a prefix that is not held is logged and
    /// otherwise ignored.
    pub fn withdraw(&mut self, prefix: &bgp::Prefix) -> Option<RouteEntry> {
        match self.table.remove(prefix) {
            Some(entry) => {
                log::debug!("WITHDRAW ({}): {}", self.peer, prefix);
                Some(entry)
            }
            None => {
                log::warn!("{} cannot be removed (not in RIB of {})", prefix, self.peer);
                None
            }
        }
    }

    pub fn count(&self) -> usize {
        self.table.len()
    }

    pub fn get(&self, prefix: &bgp::Prefix) -> Option<&RouteEntry> {
        self.table.get(prefix)
    }

    pub fn contains(&self, prefix: &bgp::Prefix) -> bool {
        self.table.contains_key(prefix)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&bgp::Prefix, &RouteEntry)> {
        self.table.iter()
    }

    /// Announcements applied to this table, including overwrites.
    pub fn routes_received(&self) -> u64 {
        self.routes_received
    }
}
