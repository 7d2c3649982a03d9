use interview_core::evaluator::Provider;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub provider: Provider,
    pub api_key: String,
    pub chat_model: String,
    pub log_level: Level,
    pub data_path: PathBuf,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// This function will look for a `.env` file in the current directory
    /// and load the following variables:
    ///
    /// *   `BIND_ADDRESS`: The address and port to bind the server to. Defaults to "0.0.0.0:3000".
    /// *   `EVALUATION_PROVIDER`: "openai" or "gemini". Defaults to "openai".
    /// *   `OPENAI_API_KEY` / `GEMINI_API_KEY`: required for the selected provider.
    /// *   `CHAT_MODEL`: (Optional) defaults to the provider's model.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    /// *   `DATA_PATH`: (Optional) The JSONL document store. Defaults to "data/store.jsonl".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let provider = Provider::from_name(
            &lookup("EVALUATION_PROVIDER").unwrap_or_else(|| "openai".to_string()),
        );
        let key_var = match provider {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        };
        let api_key = lookup(key_var).filter(|k| !k.is_empty()).ok_or_else(|| {
            ConfigError::MissingVar(format!("{key_var} must be set for the {provider:?} provider"))
        })?;

        let chat_model =
            lookup("CHAT_MODEL").unwrap_or_else(|| provider.default_model().to_string());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let data_path = lookup("DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data/store.jsonl"));

        Ok(Self {
            bind_address,
            provider,
            api_key,
            chat_model,
            log_level,
            data_path,
        })
    }
}
