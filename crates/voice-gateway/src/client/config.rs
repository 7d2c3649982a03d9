use super::consts;
use secrecy::SecretString;

pub struct Config {
    url: String,
    api_key: SecretString,
}

pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.config.url = url.to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: SecretString) -> Self {
        self.config.api_key = api_key;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Defaults, overridden by `VOICE_GATEWAY_URL` and `VOICE_API_KEY` when set.
    pub fn new() -> Self {
        Self {
            url: std::env::var(consts::VOICE_GATEWAY_URL)
                .unwrap_or_else(|_| consts::DEFAULT_URL.to_string()),
            api_key: std::env::var(consts::VOICE_API_KEY)
                .unwrap_or_default()
                .into(),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }
}
