//! Configuration module for the welcome bot.
//!
//! Loads configuration from environment variables (a `.env` file is honoured),
//! with the greeting itself optionally coming from a JSON file.

mod reload;
mod shared;
mod welcome;

use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub use reload::spawn_sighup_reload;
pub use shared::SharedConfig;
pub use welcome::{ensure_data_dir, WelcomeConfig};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Bot running mode
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BotMode {
    #[default]
    Polling,
    Webhook,
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    pub bot_mode: BotMode,
    pub webhook_url: Option<String>,
    pub webhook_port: u16,
    pub webhook_secret: Option<String>,

    /// Directory holding the default welcome image (`welcome/welcome.jpg`).
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bot_mode = match lookup("BOT_MODE")
            .unwrap_or_default()
            .trim()
            .to_lowercase()
            .as_str()
        {
            "webhook" => BotMode::Webhook,
            _ => BotMode::Polling,
        };

        let webhook_url = lookup("WEBHOOK_URL").filter(|s| !s.trim().is_empty());
        if bot_mode == BotMode::Webhook && webhook_url.is_none() {
            return Err(ConfigError::MissingEnvVar("WEBHOOK_URL"));
        }

        let webhook_port = match lookup("WEBHOOK_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "WEBHOOK_PORT",
                message: format!("{raw:?}: {e}"),
            })?,
            None => 8443,
        };

        let bot_token = lookup("BOT_TOKEN")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingEnvVar("BOT_TOKEN"))?;

        Ok(Self {
            bot_token,
            bot_mode,
            webhook_url,
            webhook_port,
            webhook_secret: lookup("WEBHOOK_SECRET").filter(|s| !s.is_empty()),
            data_dir: lookup("DATA_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Build a lookup closure over a fixed set of variables.
    pub(crate) fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(vars(&[("BOT_TOKEN", "123:abc")])).unwrap();
        assert_eq!(config.bot_mode, BotMode::Polling);
        assert_eq!(config.webhook_port, 8443);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert!(config.webhook_secret.is_none());
    }

    #[test]
    fn test_missing_token() {
        let err = Config::from_lookup(vars(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar("BOT_TOKEN")));
    }

    #[test]
    fn test_webhook_requires_url() {
        let err = Config::from_lookup(vars(&[("BOT_TOKEN", "t"), ("BOT_MODE", "Webhook")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar("WEBHOOK_URL")));

        let config = Config::from_lookup(vars(&[
            ("BOT_TOKEN", "t"),
            ("BOT_MODE", "webhook"),
            ("WEBHOOK_URL", "https://bot.example.com/hook"),
            ("WEBHOOK_PORT", "9000"),
        ]))
        .unwrap();
        assert_eq!(config.bot_mode, BotMode::Webhook);
        assert_eq!(config.webhook_port, 9000);
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(vars(&[("BOT_TOKEN", "t"), ("WEBHOOK_PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "WEBHOOK_PORT", .. }));
    }
}
