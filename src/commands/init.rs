//! Initialize a new site

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::Blog;

const DEFAULT_CONFIG: &str = r#"# spacetraveling configuration

# Site
title: spacetraveling
description: ''
author: ''
language: pt-BR
timezone: America/Sao_Paulo
logo: /Logo.svg

# URL
url: http://localhost:4000
root: /

# Directory
public_dir: public
static_dir: static

# Content source
## The endpoint and token can also come from PRISMIC_ENDPOINT and
## PRISMIC_ACCESS_TOKEN.
prismic:
  endpoint: https://your-repo.cdn.prismic.io/api/v2
  access_token:
  document_type: posts
  page_size: 1
  max_pages: 100
  orderings: '[document.first_publication_date desc]'
  timeout: 30

# Post pages
reading:
  words_per_minute: 200

# Atom feed
feed:
  enable: true
  limit: 20
"#;

const DEFAULT_LOGO: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="239" height="27" viewBox="0 0 239 27"><text x="0" y="22" font-family="Inter, sans-serif" font-size="24" fill="#F9F9F9">spacetraveling<tspan fill="#FF57B2">.</tspan></text></svg>
"##;

/// Initialize a new site in the given directory.
///
/// Existing files are left untouched.
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir.join("static"))?;

    write_if_missing(&target_dir.join("_config.yml"), DEFAULT_CONFIG)?;
    write_if_missing(&target_dir.join("static").join("Logo.svg"), DEFAULT_LOGO)?;

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        tracing::info!("Keeping existing {:?}", path);
        return Ok(());
    }
    fs::write(path, content)?;
    tracing::debug!("Created {:?}", path);
    Ok(())
}

/// Run the init command with an existing blog
pub fn run(blog: &Blog) -> Result<()> {
    init_site(&blog.base_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_site() {
        let dir = TempDir::new().unwrap();
        init_site(dir.path()).unwrap();

        assert!(dir.path().join("static/Logo.svg").exists());
        let blog = Blog::new(dir.path()).unwrap();
        assert_eq!(blog.config.prismic.document_type, "posts");
        assert_eq!(blog.config.reading.words_per_minute, 200);
        assert_eq!(blog.config.prismic.page_size, 1);
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("_config.yml"), "title: Mine\n").unwrap();
        init_site(dir.path()).unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("_config.yml")).unwrap(),
            "title: Mine\n"
        );
    }
}
