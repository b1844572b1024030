// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::ClientConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &ClientConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Parse the base URL, making sure relative joins append to its path.
pub fn base_url(raw: &str) -> Result<url::Url> {
    if raw.ends_with('/') {
        Ok(url::Url::parse(raw)?)
    } else {
        Ok(url::Url::parse(&format!("{raw}/"))?)
    }
}
