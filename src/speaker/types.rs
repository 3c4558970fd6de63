// File: src/speaker/types.rs
//
// Process-wide state shared by every session.

use std::sync::Arc;

use crate::config::Config;
use crate::rib::RouteStats;

/// Created once at startup and handed to each session.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub stats: Arc<RouteStats>,
}

impl Context {
    pub fn new(config: Config) -> Self {
        Context {
            config,
            stats: Arc::new(RouteStats::new()),
        }
    }

    pub fn total_routes(&self) -> u64 {
        self.stats.total_routes()
    }
}
