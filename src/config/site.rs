//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Environment variable overriding `prismic.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_ENDPOINT";

/// Environment variable overriding `prismic.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub timezone: String,
    pub logo: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,

    // Content source
    #[serde(default)]
    pub prismic: PrismicConfig,

    // Post pages
    #[serde(default)]
    pub reading: ReadingConfig,

    // Atom feed
    #[serde(default)]
    pub feed: FeedConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            description: String::new(),
            author: String::new(),
            language: "pt-BR".to_string(),
            timezone: "America/Sao_Paulo".to_string(),
            logo: "/Logo.svg".to_string(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            prismic: PrismicConfig::default(),
            reading: ReadingConfig::default(),
            feed: FeedConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut config: SiteConfig = serde_yaml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Let `PRISMIC_ENDPOINT` and `PRISMIC_ACCESS_TOKEN` take precedence over the file
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            tracing::debug!("Using Prismic endpoint from {}", ENDPOINT_ENV);
            self.prismic.endpoint = endpoint;
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            tracing::debug!("Using Prismic access token from {}", ACCESS_TOKEN_ENV);
            self.prismic.access_token = Some(token);
        }
    }

    /// Timezone used when displaying publication dates, UTC if unknown
    pub fn tz(&self) -> chrono_tz::Tz {
        match self.timezone.parse::<chrono_tz::Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                if !self.timezone.is_empty() {
                    tracing::warn!("Unknown timezone {:?}, using UTC", self.timezone);
                }
                chrono_tz::UTC
            }
        }
    }
}

/// Prismic repository settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismicConfig {
    /// API entry point, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    /// Custom type holding blog posts
    pub document_type: String,
    /// Posts per "load more" step
    pub page_size: usize,
    /// Upper bound on result pages followed during a build (list and uid listing)
    pub max_pages: usize,
    pub orderings: Option<String>,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl Default for PrismicConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 1,
            max_pages: 100,
            orderings: Some("[document.first_publication_date desc]".to_string()),
            timeout: 30,
        }
    }
}

/// Reading time estimation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingConfig {
    pub words_per_minute: usize,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 200,
        }
    }
}

/// Atom feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub enable: bool,
    pub limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enable: true,
            limit: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.language, "pt-BR");
        assert_eq!(config.prismic.document_type, "posts");
        assert_eq!(config.prismic.page_size, 1);
        assert_eq!(config.reading.words_per_minute, 200);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
language: en
prismic:
  endpoint: https://blog.cdn.prismic.io/api/v2
  page_size: 5
reading:
  words_per_minute: 250
github_username: someone
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.language, "en");
        assert_eq!(config.prismic.endpoint, "https://blog.cdn.prismic.io/api/v2");
        assert_eq!(config.prismic.page_size, 5);
        assert_eq!(config.prismic.document_type, "posts");
        assert_eq!(config.reading.words_per_minute, 250);
        assert!(config.extra.contains_key("github_username"));
    }

    #[test]
    fn test_overrides() {
        let mut config = SiteConfig::default();
        config.apply_overrides(
            Some("https://other.cdn.prismic.io/api/v2".to_string()),
            Some("secret".to_string()),
        );
        assert_eq!(config.prismic.endpoint, "https://other.cdn.prismic.io/api/v2");
        assert_eq!(config.prismic.access_token.as_deref(), Some("secret"));

        config.apply_overrides(Some("  ".to_string()), None);
        assert_eq!(config.prismic.endpoint, "https://other.cdn.prismic.io/api/v2");
    }

    #[test]
    fn test_timezone() {
        let mut config = SiteConfig::default();
        assert_eq!(config.tz(), chrono_tz::America::Sao_Paulo);
        config.timezone = "Mars/Olympus".to_string();
        assert_eq!(config.tz(), chrono_tz::UTC);
    }
}
