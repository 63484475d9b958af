//! Page fetching.
//!
//! A single timed GET with a fixed identity header. Failures are classified,
//! never retried; the caller decides disposition.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::Result;
use crate::models::CrawlerConfig;

/// Classified page fetch failure.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// The request exceeded the configured timeout
    #[error("Timeout fetching {url}")]
    Timeout { url: String },

    /// The server answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    /// Connection, TLS, or protocol failure
    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },
}

/// Source of raw page markup.
///
/// The production implementation is [`PageFetcher`]; tests substitute a
/// canned source.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the body at `url`, or a classified failure.
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError>;
}

/// HTTP page fetcher built from the crawler configuration.
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    /// Create a fetcher with the configured identity and timeout.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    fn classify(url: &str, error: &reqwest::Error) -> FetchError {
        if error.is_timeout() {
            return FetchError::Timeout {
                url: url.to_string(),
            };
        }
        if let Some(status) = error.status() {
            return FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            };
        }
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::classify(url, &e))?;

        let response = response
            .error_for_status()
            .map_err(|e| Self::classify(url, &e))?;

        response.text().await.map_err(|e| Self::classify(url, &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_builds_from_default_config() {
        assert!(PageFetcher::new(&CrawlerConfig::default()).is_ok());
    }
}
