use std::io;
use thiserror::Error;

use crate::bgp::BgpValidationError;

#[derive(Error, Debug)]
pub enum BgpError {
    #[error("BGP framing error: {0}")]
    Framing(#[from] BgpValidationError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
