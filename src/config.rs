//! On-disk configuration
//!
//! Grounded on the teacher's TOML-based configuration loading (its
//! `ServerContext` construction reads a config file the same way), using
//! `serde`/`toml` rather than the teacher's ad hoc flag parsing.

use std::fs;
use std::path::Path;

use derive_more::{Display, Error, From};
use serde::Deserialize;

#[derive(Debug, Display, From, Error)]
pub enum ConfigError {
    #[display(fmt = "failed to read config file: {}", _0)]
    Read(std::io::Error),

    #[display(fmt = "failed to parse config file: {}", _0)]
    Parse(toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LatencyConfig {
    pub max_latency_ms: f64,
    pub min_samples: u32,
}

impl Default for LatencyConfig {
    fn default() -> Self {
        LatencyConfig {
            max_latency_ms: 500.0,
            min_samples: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LearnedLatencyConfig {
    pub max_latency_ms: f64,
    pub min_samples: u32,
    pub stale_threshold_hours: u64,
}

impl Default for LearnedLatencyConfig {
    fn default() -> Self {
        LearnedLatencyConfig {
            max_latency_ms: 500.0,
            min_samples: 5,
            stale_threshold_hours: 168,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind_host: String,
    pub dns_port: u16,
    pub default_ttl_seconds: u32,
    pub ecs_enabled: bool,
    pub edns_udp_size: u16,
    pub default_region: Option<String>,
    pub latency: LatencyConfig,
    pub learned_latency: LearnedLatencyConfig,
    pub tcp_read_timeout_secs: u64,
    pub shutdown_drain_secs: u64,
    pub geoip_database_path: Option<String>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_host: "0.0.0.0".to_string(),
            dns_port: 53,
            default_ttl_seconds: 30,
            ecs_enabled: true,
            edns_udp_size: 4096,
            default_region: None,
            latency: LatencyConfig::default(),
            learned_latency: LearnedLatencyConfig::default(),
            tcp_read_timeout_secs: 5,
            shutdown_drain_secs: 5,
            geoip_database_path: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.dns_port, 53);
        assert!(config.ecs_enabled);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let toml_str = r#"
            dns_port = 5300
            [latency]
            min_samples = 10
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.dns_port, 5300);
        assert_eq!(config.latency.min_samples, 10);
        assert_eq!(config.bind_host, "0.0.0.0");
    }
}
