use serde::{Deserialize, Serialize};

use crate::common::types::AnyResult;
use crate::configs::*;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
}

impl Config {
    /// Load `config.toml` (or `config.default.toml`) from the working
    /// directory.
    pub fn load() -> AnyResult<Self> {
        let config_path = if std::path::Path::new("config.toml").exists() {
            "config.toml"
        } else if std::path::Path::new("config.default.toml").exists() {
            "config.default.toml"
        } else {
            return Err("config.toml or config.default.toml not found".into());
        };

        Self::from_path(config_path)
    }

    pub fn from_path(path: &str) -> AnyResult<Self> {
        tracing::debug!("Loading configuration from: {}", path);

        let config_str = std::fs::read_to_string(path)?;
        if config_str.is_empty() {
            return Err(format!("{} is empty", path).into());
        }

        let config: Config = toml::from_str(&config_str)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.player.load_timeout_ms, 12_000);
        assert_eq!(config.upstream.servers.len(), 3);
        assert!(config.logging.is_none());
    }

    #[test]
    fn test_partial_override() {
        let config: Config = toml::from_str(
            r#"
            [player]
            max_retries = 4

            [upstream]
            base_url = "http://localhost:4000/api"
            servers = ["vidcloud"]
            "#,
        )
        .unwrap();

        assert_eq!(config.player.max_retries, 4);
        assert_eq!(config.player.verify_delay_ms, 3_000);
        assert_eq!(config.upstream.base_url, "http://localhost:4000/api");
        assert_eq!(config.upstream.servers, vec!["vidcloud".to_string()]);
    }
}
