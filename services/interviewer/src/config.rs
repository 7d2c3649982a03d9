//! Application Configuration Module
//!
//! Loads the interviewer's settings from the environment (and a `.env` file
//! when present) into a single struct passed to the rest of the binary.

use interview_core::evaluator::Provider;
use secrecy::SecretString;
use std::path::PathBuf;
use tracing::Level;

pub const DEFAULT_DATA_PATH: &str = "data/store.jsonl";
pub const DEFAULT_VOICE_GATEWAY_URL: &str = "ws://127.0.0.1:8787/v1/calls";

/// Holds all configuration loaded from the environment.
#[derive(Debug)]
pub struct Config {
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub chat_model: String,
    pub log_level: Level,
    pub data_path: PathBuf,
    pub voice_gateway_url: String,
    pub voice_api_key: SecretString,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// *   `EVALUATION_PROVIDER`: "openai" or "gemini". Defaults to "openai".
    /// *   `OPENAI_API_KEY` / `GEMINI_API_KEY`: required for the selected provider.
    /// *   `CHAT_MODEL`: (Optional) defaults to the provider's model.
    /// *   `RUST_LOG`: (Optional) TRACE, DEBUG, INFO, WARN or ERROR. Defaults to INFO.
    /// *   `DATA_PATH`: (Optional) the JSONL document store.
    /// *   `VOICE_GATEWAY_URL` / `VOICE_API_KEY`: the voice call gateway.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let provider = Provider::from_name(
            &lookup("EVALUATION_PROVIDER").unwrap_or_else(|| "openai".to_string()),
        );

        let openai_api_key = lookup("OPENAI_API_KEY").filter(|k| !k.is_empty());
        let gemini_api_key = lookup("GEMINI_API_KEY").filter(|k| !k.is_empty());

        let chat_model =
            lookup("CHAT_MODEL").unwrap_or_else(|| provider.default_model().to_string());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        let data_path = lookup("DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));
        let voice_gateway_url = lookup("VOICE_GATEWAY_URL")
            .unwrap_or_else(|| DEFAULT_VOICE_GATEWAY_URL.to_string());
        let voice_api_key = SecretString::from(lookup("VOICE_API_KEY").unwrap_or_default());

        let config = Self {
            provider,
            openai_api_key,
            gemini_api_key,
            chat_model,
            log_level,
            data_path,
            voice_gateway_url,
            voice_api_key,
        };
        config.api_key()?;
        Ok(config)
    }

    /// The key for the selected provider.
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        match self.provider {
            Provider::OpenAI => self.openai_api_key.as_deref().ok_or_else(|| {
                ConfigError::MissingVar("OPENAI_API_KEY must be set for openai provider".to_string())
            }),
            Provider::Gemini => self.gemini_api_key.as_deref().ok_or_else(|| {
                ConfigError::MissingVar("GEMINI_API_KEY must be set for gemini provider".to_string())
            }),
        }
    }
}
