//! spacetraveling-rs: a static blog generator backed by a Prismic repository
//!
//! Posts are fetched from the Prismic REST API, their rich text is rendered
//! to HTML and the site is written out with embedded Tera templates.

pub mod cache;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod prismic;
pub mod server;
pub mod templates;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Config file name inside the site directory
pub const CONFIG_FILE: &str = "_config.yml";

/// The blog application
#[derive(Debug, Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Static files copied verbatim into the output
    pub static_dir: PathBuf,
    /// Optional interface label overrides
    pub languages_dir: PathBuf,
}

impl Blog {
    /// Create a blog from a directory, using defaults when `_config.yml` is missing
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            let mut config = config::SiteConfig::default();
            config.apply_env_overrides();
            config
        };

        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);
        let languages_dir = base_dir.join("languages");

        Ok(Self {
            config,
            base_dir,
            public_dir,
            static_dir,
            languages_dir,
        })
    }

    /// Path of the config file
    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE)
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self).await
    }

    /// Clean the public directory and cache
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
