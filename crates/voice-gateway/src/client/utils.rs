use super::config::Config;
use super::consts::AUTHORIZATION_HEADER;
use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;

/// Builds the WebSocket handshake request, with a bearer token when a key is set.
pub(crate) fn build_request(config: &Config) -> Result<Request> {
    let mut request = config
        .url()
        .into_client_request()
        .with_context(|| format!("Invalid voice gateway URL '{}'", config.url()))?;

    let key = config.api_key().expose_secret();
    if !key.is_empty() {
        let value = format!("Bearer {key}")
            .parse::<HeaderValue>()
            .context("API key is not a valid header value")?;
        request.headers_mut().insert(AUTHORIZATION_HEADER, value);
    }
    Ok(request)
}
