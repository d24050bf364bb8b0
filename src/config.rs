//! Environment configuration

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_RUN_TIMEOUT_SECS: u64 = 120;
const DEFAULT_PURCHASE_STEP_DELAY_MS: u64 = 1000;
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 1800;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("ASSISTANT_ID is not set; the assistant to run cannot be chosen")]
    MissingAssistantId,
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}

/// Settings for the hosted assistant
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub api_key: String,
    pub assistant_id: String,
    pub base_url: String,
    pub poll_interval: Duration,
    /// Upper bound on one turn, covering every poll
    pub run_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub assistant: AssistantConfig,
    pub purchase_step_delay: Duration,
    /// How long an unwatched, idle session stays in memory
    pub session_idle_ttl: Duration,
    pub port: u16,
    pub db_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let assistant_id = var("ASSISTANT_ID").ok_or(ConfigError::MissingAssistantId)?;
        let api_key = var("OPENAI_API_KEY").ok_or(ConfigError::MissingApiKey)?;

        let poll_ms = parse_or(&var, "ASSISTANT_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        let timeout_secs = parse_or(&var, "ASSISTANT_RUN_TIMEOUT_SECS", DEFAULT_RUN_TIMEOUT_SECS)?;
        let step_ms = parse_or(&var, "PURCHASE_STEP_DELAY_MS", DEFAULT_PURCHASE_STEP_DELAY_MS)?;
        let port = parse_or(&var, "STOCK_ASSISTANT_PORT", DEFAULT_PORT)?;
        let idle_ttl_secs = parse_or(&var, "SESSION_IDLE_TTL_SECS", DEFAULT_SESSION_IDLE_TTL_SECS)?;

        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "ASSISTANT_RUN_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }

        let db_path = var("STOCK_ASSISTANT_DB_PATH").map_or_else(
            || {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.stock-assistant/chats.db"))
            },
            PathBuf::from,
        );

        Ok(Self {
            assistant: AssistantConfig {
                api_key,
                assistant_id,
                base_url: var("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                poll_interval: Duration::from_millis(poll_ms),
                run_timeout: Duration::from_secs(timeout_secs),
            },
            purchase_step_delay: Duration::from_millis(step_ms),
            session_idle_ttl: Duration::from_secs(idle_ttl_secs),
            port,
            db_path,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}
