//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Target storefront settings
    #[serde(default)]
    pub site: SiteConfig,

    /// Translation provider settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Image canonicalization settings
    #[serde(default)]
    pub images: ImageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.batch_size == 0 {
            return Err(AppError::validation("crawler.batch_size must be > 0"));
        }
        if self.site.base_url.trim().is_empty() {
            return Err(AppError::validation("site.base_url is empty"));
        }
        if url::Url::parse(&self.site.base_url).is_err() {
            return Err(AppError::validation("site.base_url is not a valid URL"));
        }
        if self.site.catalog_url.trim().is_empty() {
            return Err(AppError::validation("site.catalog_url is empty"));
        }
        if self.translation.batch_limit == 0 {
            return Err(AppError::validation("translation.batch_limit must be > 0"));
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between category fetches in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Concurrent detail fetches per product batch
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            batch_size: defaults::batch_size(),
        }
    }
}

/// Target storefront settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Origin used to resolve relative links and images
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Page listing every category
    #[serde(default = "defaults::catalog_url")]
    pub catalog_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            catalog_url: defaults::catalog_url(),
        }
    }
}

/// Translation provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Provider endpoint; empty disables translation entirely
    #[serde(default)]
    pub endpoint: String,

    /// API key sent in the Authorization header
    #[serde(default)]
    pub api_key: String,

    /// Source language code
    #[serde(default = "defaults::source_lang")]
    pub source_lang: String,

    /// Target language code
    #[serde(default = "defaults::target_lang")]
    pub target_lang: String,

    /// Maximum texts per provider call
    #[serde(default = "defaults::batch_limit")]
    pub batch_limit: usize,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            source_lang: defaults::source_lang(),
            target_lang: defaults::target_lang(),
            batch_limit: defaults::batch_limit(),
        }
    }
}

/// Image canonicalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Substrings identifying placeholder images to drop
    #[serde(default = "defaults::placeholder_patterns")]
    pub placeholder_patterns: Vec<String>,

    /// Query parameters stripped during normalization
    #[serde(default = "defaults::strip_params")]
    pub strip_params: Vec<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            placeholder_patterns: defaults::placeholder_patterns(),
            strip_params: defaults::strip_params(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; catalog-ingest/1.0)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        100
    }
    pub fn batch_size() -> usize {
        5
    }

    // Site defaults
    pub fn base_url() -> String {
        "https://shop.example.com".into()
    }
    pub fn catalog_url() -> String {
        "https://shop.example.com/category/all".into()
    }

    // Translation defaults
    pub fn source_lang() -> String {
        "ko".into()
    }
    pub fn target_lang() -> String {
        "en".into()
    }
    pub fn batch_limit() -> usize {
        50
    }

    // Image defaults
    pub fn placeholder_patterns() -> Vec<String> {
        vec![
            "placeholder".into(),
            "no-image".into(),
            "no_image".into(),
            "blank".into(),
            "1x1".into(),
            "spacer".into(),
        ]
    }
    pub fn strip_params() -> Vec<String> {
        vec![
            "w".into(),
            "h".into(),
            "width".into(),
            "height".into(),
            "crop".into(),
            "scale".into(),
            "fit".into(),
            "resize".into(),
            "q".into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.crawler.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut config = Config::default();
        config.crawler.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.site.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            batch_size = 8

            [site]
            base_url = "https://store.example.org"
            catalog_url = "https://store.example.org/all"
            "#,
        )
        .unwrap();
        assert_eq!(config.crawler.batch_size, 8);
        assert_eq!(config.crawler.timeout_secs, 30);
        assert!(!config.images.placeholder_patterns.is_empty());
    }
}
