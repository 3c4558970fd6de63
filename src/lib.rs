pub mod bgp;
pub mod config;
pub mod error;
pub mod neighbor;
pub mod rib;
pub mod speaker;

pub use error::{BgpError, ConfigError};
