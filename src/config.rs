use serde_derive::Deserialize;
use std::net::Ipv4Addr;
use std::path::Path;
use std::time::Duration;

use crate::bgp;
use crate::error::ConfigError;

pub const DEFAULT_PORT: u16 = 179;
pub const DEFAULT_HOLD_TIME: u16 = 180;
pub const DEFAULT_STATISTICS_INTERVAL: u16 = 5;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub asn: u16,
    pub rid: Ipv4Addr,
    pub localip: Option<Ipv4Addr>,
    pub port: Option<u16>,
    pub hold_time: Option<u16>,
    pub statistics: Option<bool>,
    pub statistics_interval: Option<u16>,
}

impl Config {
    pub fn new(asn: u16, rid: Ipv4Addr) -> Self {
        Config {
            asn,
            rid,
            localip: None,
            port: None,
            hold_time: None,
            statistics: None,
            statistics_interval: None,
        }
    }

    pub fn local_ip(&self) -> Ipv4Addr {
        self.localip.unwrap_or(Ipv4Addr::LOCALHOST)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn hold_time(&self) -> u16 {
        self.hold_time.unwrap_or(DEFAULT_HOLD_TIME)
    }

    pub fn statistics(&self) -> bool {
        self.statistics.unwrap_or(false)
    }

    pub fn statistics_interval(&self) -> Duration {
        Duration::from_secs(
            self.statistics_interval
                .unwrap_or(DEFAULT_STATISTICS_INTERVAL)
                .max(1) as u64,
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        bgp::validate_asn(self.asn).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        bgp::validate_hold_time(self.hold_time())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}

pub fn parse_config(src: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(src)?;
    config.validate()?;
    Ok(config)
}

pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let c = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = parse_config("asn = 64496\nrid = \"127.0.0.1\"\n").unwrap();
        assert_eq!(config.asn, 64496);
        assert_eq!(config.rid, Ipv4Addr::LOCALHOST);
        assert_eq!(config.port(), 179);
        assert_eq!(config.hold_time(), 180);
        assert_eq!(config.local_ip(), Ipv4Addr::LOCALHOST);
        assert!(!config.statistics());
        assert_eq!(config.statistics_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_parse_full_config() {
        let src = r#"
            asn = 65001
            rid = "10.0.0.1"
            localip = "0.0.0.0"
            port = 1179
            hold_time = 90
            statistics = true
            statistics_interval = 10
        "#;
        let config = parse_config(src).unwrap();
        assert_eq!(config.local_ip(), Ipv4Addr::UNSPECIFIED);
        assert_eq!(config.port(), 1179);
        assert_eq!(config.hold_time(), 90);
        assert!(config.statistics());
        assert_eq!(config.statistics_interval(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_rejects_bad_hold_time() {
        let err = parse_config("asn = 1\nrid = \"1.1.1.1\"\nhold_time = 2\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_parse_rejects_zero_asn() {
        let err = parse_config("asn = 0\nrid = \"1.1.1.1\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_parse_rejects_missing_rid() {
        let err = parse_config("asn = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_read_config_missing_file() {
        let err = read_config(Path::new("/nonexistent/kbgpd.conf")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
