//! Configuration loading and validation.

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::Taxonomy;
use crate::fetch::HttpSourceConfig;
use crate::models::TimeWindow;
use crate::retrieve::RetrievalStrategy;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Unknown season: {0}")]
    UnknownSeason(String),
}

/// Upstream API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the stats proxy
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Environment variable holding the bearer token
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    /// Timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "https://statsproxy-public-service-live.ol.epicgames.com".to_string()
}

fn default_access_token_env() -> String {
    "STATS_ACCESS_TOKEN".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("stats-window/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            access_token_env: default_access_token_env(),
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    /// HTTP source settings, reading the token from the environment.
    pub fn source_config(&self) -> HttpSourceConfig {
        HttpSourceConfig {
            base_url: self.base_url.clone(),
            access_token: std::env::var(&self.access_token_env).ok(),
            timeout: Duration::from_secs(self.timeout_seconds),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Window retrieval configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Epoch seconds where the game's recorded history starts
    #[serde(default)]
    pub origin_time: i64,

    #[serde(default)]
    pub strategy: RetrievalStrategy,
}

/// A named reporting period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonConfig {
    pub name: String,
    pub start: NaiveDate,
    /// Last day of the season, inclusive
    pub end: NaiveDate,
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub seasons: Vec<SeasonConfig>,

    #[serde(default)]
    pub taxonomy: Taxonomy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api: ApiConfig::default(),
            retrieval: RetrievalConfig::default(),
            seasons: Vec::new(),
            taxonomy: Taxonomy::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "API timeout must be greater than 0".to_string(),
            ));
        }

        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "API base URL must not be empty".to_string(),
            ));
        }

        for (i, season) in self.seasons.iter().enumerate() {
            if season.end < season.start {
                return Err(ConfigError::ValidationError(format!(
                    "Season '{}' ends before it starts",
                    season.name
                )));
            }
            if self.seasons[..i].iter().any(|s| s.name == season.name) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate season '{}'",
                    season.name
                )));
            }
        }

        Ok(())
    }

    /// Time window covering a configured season.
    pub fn season_window(&self, name: &str) -> Result<TimeWindow, ConfigError> {
        let season = self
            .seasons
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownSeason(name.to_string()))?;

        TimeWindow::from_dates(season.start, season.end)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
log_level = "debug"

[api]
base_url = "https://stats.example.com"
timeout_seconds = 10

[retrieval]
origin_time = 1506384000
strategy = "direct"

[[seasons]]
name = "c5s1"
start = "2023-12-03"
end = "2024-03-08"

[[seasons]]
name = "c5s2"
start = "2024-03-08"
end = "2024-05-24"
"#;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.api.access_token_env, "STATS_ACCESS_TOKEN");
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.retrieval.origin_time, 0);
        assert_eq!(config.retrieval.strategy, RetrievalStrategy::Triple);
        assert!(config.seasons.is_empty());
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_timeout() {
        let mut config = AppConfig::default();
        config.api.timeout_seconds = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_inverted_season() {
        let mut config = AppConfig::default();
        config.seasons.push(SeasonConfig {
            name: "bad".to_string(),
            start: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        });

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_config_validation_duplicate_season() {
        let season = SeasonConfig {
            name: "s1".to_string(),
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        };
        let mut config = AppConfig::default();
        config.seasons = vec![season.clone(), season];

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.api.base_url, "https://stats.example.com");
        assert_eq!(config.api.timeout_seconds, 10);
        assert_eq!(config.api.access_token_env, "STATS_ACCESS_TOKEN");
        assert_eq!(config.retrieval.origin_time, 1_506_384_000);
        assert_eq!(config.retrieval.strategy, RetrievalStrategy::Direct);
        assert_eq!(config.seasons.len(), 2);
        assert_eq!(config.taxonomy, Taxonomy::default());
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::from_file(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }

    #[test]
    fn test_season_window() {
        let config: AppConfig = toml::from_str(SAMPLE).unwrap();

        let window = config.season_window("C5S1").unwrap();
        assert_eq!(window.start_time, 1_701_561_600);
        // 2024-03-09 00:00 UTC, the day after the inclusive end
        assert_eq!(window.end_time, 1_709_942_400);

        assert!(matches!(
            config.season_window("c9s9"),
            Err(ConfigError::UnknownSeason(_))
        ));
    }

    #[test]
    fn test_source_config() {
        let mut config = AppConfig::default();
        config.api.access_token_env = "STATS_WINDOW_TEST_UNSET_TOKEN".to_string();

        let source = config.api.source_config();
        assert!(source.access_token.is_none());
        assert_eq!(source.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.log_level, parsed.log_level);
        assert_eq!(parsed.taxonomy, Taxonomy::default());
    }
}
