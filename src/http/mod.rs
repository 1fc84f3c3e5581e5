use crate::config::Config;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Failure of a single status fetch. Backoff and retry policy live in the
/// monitor loop, not here.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed JSON body: {0}")]
    Decode(#[source] serde_json::Error),
}

pub fn build_client(cfg: &Config) -> reqwest::Result<Client> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(USER_AGENT, HeaderValue::from_str(&cfg.user_agent).unwrap());
    let builder = Client::builder()
        .default_headers(default_headers)
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .use_rustls_tls();
    builder.build()
}

/// One GET against the status endpoint. Transport errors, non-2xx statuses
/// and malformed bodies all surface as `FetchError`; nothing escapes past
/// this boundary.
pub async fn fetch_status(client: &Client, cfg: &Config) -> Result<serde_json::Value, FetchError> {
    let res = client.get(&cfg.api_url).send().await?;
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(FetchError::Status { status, body });
    }
    let text = res.text().await?;
    debug!("fetched {} bytes from {}", text.len(), cfg.api_url);
    serde_json::from_str(&text).map_err(FetchError::Decode)
}
