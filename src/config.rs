use std::collections::HashMap;
use std::env;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

use crate::clients::anthropic_client::DEFAULT_MODEL;
use crate::clients::google_calendar_client::DEFAULT_CALENDAR_ID;
use crate::error::ConfigError;
use crate::handlers::dispatch::DEFAULT_CALENDAR_TIMEOUT;
use crate::service::event_extractor::DEFAULT_COMPLETION_TIMEOUT;
use crate::service::guest_directory::GuestDirectory;
use crate::tasks::ingestion_loop::{LoopSettings, DEFAULT_BACKOFF, DEFAULT_POLL_WAIT};

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
    use_env: bool,
}

impl AppConfig {
    /// Process environment only.
    pub fn from_env() -> Self {
        Self {
            values: HashMap::new(),
            use_env: true,
        }
    }

    /// `KEY=value` lines from `path`, falling back to the environment.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        let mut config = Self::parse(&content)?;
        config.use_env = true;
        Ok(config)
    }

    /// Parses config file content without consulting the environment.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(ConfigError::Syntax {
                    line: idx + 1,
                    content: line.to_string(),
                });
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self {
            values,
            use_env: false,
        })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values
            .get(key)
            .cloned()
            .or_else(|| if self.use_env { env::var(key).ok() } else { None })
            .filter(|value| !value.trim().is_empty())
    }

    fn require(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    fn parse_or<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
            None => Ok(default),
        }
    }

    fn seconds_or(&self, key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        self.parse_or(key, default.as_secs()).map(Duration::from_secs)
    }
}

/// Everything the extractor needs; enough for the `parse` command.
#[derive(Debug, Clone)]
pub struct ExtractionSettings {
    pub anthropic_api_key: String,
    pub completion_model: String,
    pub completion_timeout: Duration,
    pub guests: GuestDirectory,
}

impl ExtractionSettings {
    pub fn load(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            anthropic_api_key: config.require("ANTHROPIC_API_KEY")?,
            completion_model: config
                .get("COMPLETION_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            completion_timeout: config
                .seconds_or("COMPLETION_TIMEOUT_SECS", DEFAULT_COMPLETION_TIMEOUT)?,
            guests: match config.get("GUESTS") {
                Some(raw) => GuestDirectory::parse(&raw)?,
                None => GuestDirectory::default(),
            },
        })
    }
}

/// Full bot configuration for the `run` command.
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub telegram_token: String,
    pub calendar_token: String,
    pub calendar_id: String,
    pub calendar_timeout: Duration,
    /// `None` when unset or `0`: anyone may use the bot.
    pub allowed_sender: Option<String>,
    pub extraction: ExtractionSettings,
    pub ingestion: LoopSettings,
}

impl BotSettings {
    pub fn load(config: &AppConfig) -> Result<Self, ConfigError> {
        let allowed_sender = match config.get("ALLOWED_USER_ID") {
            Some(raw) => {
                let id: i64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    key: "ALLOWED_USER_ID",
                    value: raw.clone(),
                })?;
                (id != 0).then(|| id.to_string())
            }
            None => None,
        };

        Ok(Self {
            telegram_token: config.require("TELEGRAM_TOKEN")?,
            calendar_token: config.require("GOOGLE_CALENDAR_TOKEN")?,
            calendar_id: config
                .get("GOOGLE_CALENDAR_ID")
                .unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string()),
            calendar_timeout: config.seconds_or("CALENDAR_TIMEOUT_SECS", DEFAULT_CALENDAR_TIMEOUT)?,
            allowed_sender,
            extraction: ExtractionSettings::load(config)?,
            ingestion: LoopSettings {
                initial_offset: config.parse_or("INITIAL_OFFSET", 0)?,
                poll_wait: config.seconds_or("POLL_WAIT_SECS", DEFAULT_POLL_WAIT)?,
                backoff: config.seconds_or("BACKOFF_SECS", DEFAULT_BACKOFF)?,
            },
        })
    }
}

pub fn log_level(config: &AppConfig) -> String {
    config
        .get("LOG_LEVEL")
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}
