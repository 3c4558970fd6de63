// File: src/speaker/mod.rs
//
// This file serves as the main module entry point that re-exports
// the public API from the submodules.

mod connection;
mod events;
mod types;

// Re-export the public types and functions
pub use connection::{add_incoming, bind, listen, serve};
pub use events::{NoopSink, RouteAttributes, RouteSink, Update};
pub use types::Context;
