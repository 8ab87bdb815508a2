//! Node configuration loading and management.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sluice_core::{AccountId, Amount, EngineConfig};
use std::path::Path;

/// Full configuration for the Sluice node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SluiceConfig {
    /// API server settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Channel engine tunables.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Time source for timelocks.
    #[serde(default)]
    pub clock: ClockConfig,

    /// In-memory settlement rail.
    #[serde(default)]
    pub rail: RailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API listen address.
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    /// API port.
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockSource {
    /// Ticks advanced explicitly through the API (block-height style).
    Manual,
    /// Wall clock, seconds since the UNIX epoch.
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_clock_source")]
    pub source: ClockSource,
    /// Initial tick of a manual clock.
    #[serde(default)]
    pub start: u64,
}

/// An account funded on the rail at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub account: AccountId,
    pub balance: Amount,
    /// Also register the account as a channel participant.
    #[serde(default = "default_true")]
    pub register: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RailConfig {
    #[serde(default)]
    pub genesis: Vec<GenesisAccount>,
}

// Default value functions
fn default_api_addr() -> String {
    "127.0.0.1".into()
}
fn default_api_port() -> u16 {
    9101
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> LogFormat {
    LogFormat::Text
}
fn default_clock_source() -> ClockSource {
    ClockSource::Manual
}
fn default_true() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: default_api_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            source: default_clock_source(),
            start: 0,
        }
    }
}

impl SluiceConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: SluiceConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// `listen_addr:port` of the HTTP API.
    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.listen_addr, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SluiceConfig::default();
        assert_eq!(config.api.port, 9101);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.clock.source, ClockSource::Manual);
        assert_eq!(config.engine, EngineConfig::default());
        assert!(config.rail.genesis.is_empty());
    }

    #[test]
    fn test_api_addr() {
        let config = SluiceConfig::default();
        assert_eq!(config.api_addr(), "127.0.0.1:9101");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = SluiceConfig::default();
        config.rail.genesis.push(GenesisAccount {
            account: AccountId::from("alice"),
            balance: 1_000_000,
            register: true,
        });
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let decoded: SluiceConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(decoded.api.port, config.api.port);
        assert_eq!(decoded.engine, config.engine);
        assert_eq!(decoded.rail.genesis.len(), 1);
        assert_eq!(decoded.rail.genesis[0].balance, 1_000_000);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let config = SluiceConfig::load(Path::new("/nonexistent/sluice.toml")).unwrap();
        assert_eq!(config.api.port, 9101);
    }

    #[test]
    fn test_config_from_toml_partial() {
        let toml_str = r#"
[api]
port = 8001

[engine]
fee_rate_bps = 50

[logging]
format = "json"

[clock]
source = "system"

[[rail.genesis]]
account = "bob"
balance = 5000
"#;
        let config: SluiceConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.api.port, 8001);
        assert_eq!(config.engine.fee_rate_bps, 50);
        assert_eq!(config.engine.min_deposit, 10_000);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.clock.source, ClockSource::System);
        assert!(config.rail.genesis[0].register);
        // Defaults for unspecified
        assert_eq!(config.api.listen_addr, "127.0.0.1");
    }
}
