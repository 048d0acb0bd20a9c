//! Client configuration, read from the environment

use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
/// Generous so slow answer generation is not cut off
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
/// Speaker id the service records for the human user
pub const DEFAULT_USER_SPEAKER_ID: &str = "用户";
pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_millis(3000);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid URL: {value}")]
    InvalidUrl { var: &'static str, value: String },
    #[error("{var} must be a positive integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub request_timeout: Duration,
    pub user_speaker_id: String,
    pub notice_ttl: Duration,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; unset variables take their default
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("QA_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self {
            base_url: parse_url("QA_API_URL", base_url)?,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_speaker_id: DEFAULT_USER_SPEAKER_ID.to_string(),
            notice_ttl: DEFAULT_NOTICE_TTL,
        };

        if let Some(value) = lookup("QA_REQUEST_TIMEOUT_SECS") {
            config.request_timeout =
                Duration::from_secs(parse_positive("QA_REQUEST_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = lookup("QA_USER_SPEAKER_ID") {
            config.user_speaker_id = value;
        }
        if let Some(value) = lookup("QA_NOTICE_TTL_MS") {
            config.notice_ttl = Duration::from_millis(parse_positive("QA_NOTICE_TTL_MS", &value)?);
        }

        Ok(config)
    }
}

fn parse_url(var: &'static str, value: String) -> Result<Url, ConfigError> {
    match Url::parse(value.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        _ => Err(ConfigError::InvalidUrl { var, value }),
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::InvalidNumber {
            var,
            value: value.to_string(),
        })
}
