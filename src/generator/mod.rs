//! Generator module - writes the static site using built-in Tera templates

use anyhow::{Context as _, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tera::Context;
use walkdir::WalkDir;

use crate::content::richtext::DocumentLink;
use crate::content::{as_html, reading_time, Post, PostSummary, PostsPagination};
use crate::helpers::{
    date_xml, format_publication_date, full_url_for, page_path, post_path, publication_date_xml,
    url_for,
};
use crate::i18n::I18n;
use crate::templates::{
    PaginationData, PostListItem, PostPageData, SectionData, SiteData, TemplateRenderer,
    STYLESHEET,
};
use crate::Blog;

/// Static site generator using Tera templates
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
    labels: HashMap<String, String>,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;

        let mut i18n = I18n::new(&blog.config.language);
        i18n.load_languages(&blog.languages_dir)?;

        Ok(Self {
            blog: blog.clone(),
            renderer,
            labels: i18n.get_all_translations(),
        })
    }

    /// Generate the entire site.
    ///
    /// `pages` are the successive list states (first page, then after each
    /// "load more"); `posts` are the full posts to render.
    pub fn generate(&self, pages: &[PostsPagination], posts: &[Post]) -> Result<()> {
        fs::create_dir_all(&self.blog.public_dir)?;

        // Drop post pages left over from earlier builds
        let live: Vec<&str> = posts.iter().map(|p| p.uid.as_str()).collect();
        self.remove_stale_posts(&live)?;

        self.write_assets()?;
        self.generate_index_pages(pages)?;

        for post in posts {
            self.generate_post_page(post)?;
        }
        tracing::info!("Generated {} post pages", posts.len());

        self.generate_not_found_page()?;
        self.generate_atom_feed(pages)?;

        Ok(())
    }

    /// Regenerate list pages, changed posts and removed posts only
    pub fn generate_incremental(
        &self,
        pages: &[PostsPagination],
        changed_posts: &[Post],
        deleted_posts: &[String],
    ) -> Result<()> {
        fs::create_dir_all(&self.blog.public_dir)?;

        for uid in deleted_posts {
            self.remove_post_page(uid)?;
        }

        self.generate_index_pages(pages)?;

        for post in changed_posts {
            self.generate_post_page(post)?;
        }
        tracing::info!(
            "Regenerated {} post pages, removed {}",
            changed_posts.len(),
            deleted_posts.len()
        );

        self.generate_not_found_page()?;
        self.generate_atom_feed(pages)?;

        Ok(())
    }

    /// Build site data for templates
    fn build_site_data(&self) -> SiteData {
        let config = &self.blog.config;
        SiteData {
            title: config.title.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            language: config.language.clone(),
            home_url: url_for(config, "/"),
            logo_url: url_for(config, &config.logo),
            css_url: url_for(config, "css/style.css"),
            feed_url: if config.feed.enable {
                url_for(config, "atom.xml")
            } else {
                String::new()
            },
        }
    }

    /// Create a base context with common variables
    fn create_base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.build_site_data());
        context.insert("i18n", &self.labels);
        context.insert("show_reading_time", &false);
        context
    }

    fn format_date(&self, date: Option<&str>) -> String {
        format_publication_date(date, &self.blog.config.language, &self.blog.config.tz())
    }

    fn list_item(&self, post: &PostSummary) -> PostListItem {
        PostListItem {
            uid: post.uid.clone(),
            path: url_for(&self.blog.config, &post_path(&post.uid)),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date: self.format_date(post.first_publication_date.as_deref()),
            date_iso: publication_date_xml(post.first_publication_date.as_deref()),
        }
    }

    /// Generate one list page per pagination state.
    ///
    /// Page N shows every post loaded after N-1 "load more" steps; its button
    /// links to page N+1, anchored at the first post that step adds.
    fn generate_index_pages(&self, pages: &[PostsPagination]) -> Result<()> {
        let empty = [PostsPagination::default()];
        let pages = if pages.is_empty() { &empty[..] } else { pages };
        let total = pages.len();

        for (i, state) in pages.iter().enumerate() {
            let page_num = i + 1;

            let next_link = match pages.get(i + 1) {
                Some(next) if state.has_more() => {
                    let link = url_for(&self.blog.config, &page_path(page_num + 1));
                    match next.results.get(state.results.len()) {
                        Some(first_new) => format!("{}#{}", link, first_new.uid),
                        None => link,
                    }
                }
                _ => String::new(),
            };

            let posts: Vec<PostListItem> =
                state.results.iter().map(|p| self.list_item(p)).collect();
            let pagination = PaginationData {
                current: page_num,
                total,
                next_link,
            };

            let mut context = self.create_base_context();
            context.insert("posts", &posts);
            context.insert("pagination", &pagination);

            let html = self.renderer.render("index.html", &context)?;
            let output_path = self
                .blog
                .public_dir
                .join(page_path(page_num))
                .join("index.html");
            write_file(&output_path, &html)?;
            tracing::debug!("Generated: {:?}", output_path);
        }

        self.remove_stale_index_pages(total)?;
        tracing::info!("Generated {} list pages", total);
        Ok(())
    }

    /// Remove `page/N/` directories beyond the current page count
    fn remove_stale_index_pages(&self, total: usize) -> Result<()> {
        let page_dir = self.blog.public_dir.join("page");
        if !page_dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(&page_dir)? {
            let entry = entry?;
            let stale = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<usize>().ok())
                .is_some_and(|n| n > total);
            if stale {
                fs::remove_dir_all(entry.path())?;
                tracing::debug!("Removed stale list page {:?}", entry.path());
            }
        }
        Ok(())
    }

    /// Generate an individual post page
    fn generate_post_page(&self, post: &Post) -> Result<()> {
        if !is_safe_segment(&post.uid) {
            tracing::warn!("Skipping post with unusable uid {:?}", post.uid);
            return Ok(());
        }

        let config = &self.blog.config;
        let resolver = |link: &DocumentLink| match &link.uid {
            Some(uid) if !link.is_broken && link.doc_type == config.prismic.document_type => {
                url_for(config, &post_path(uid))
            }
            _ => url_for(config, "/"),
        };

        let sections = post
            .content
            .iter()
            .map(|group| SectionData {
                heading: group.heading.clone(),
                html: as_html(&group.body, &resolver),
            })
            .collect();

        let data = PostPageData {
            uid: post.uid.clone(),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date: self.format_date(post.first_publication_date.as_deref()),
            date_iso: publication_date_xml(post.first_publication_date.as_deref()),
            reading_time: reading_time(&post.content, config.reading.words_per_minute),
            banner_url: post.banner.url.clone(),
            banner_alt: post.banner.alt.clone().unwrap_or_default(),
            sections,
        };

        let mut context = self.create_base_context();
        context.insert("post", &data);
        context.insert("show_reading_time", &true);

        let html = self.renderer.render("post.html", &context)?;
        let output_path = self
            .blog
            .public_dir
            .join(post_path(&post.uid))
            .join("index.html");
        write_file(&output_path, &html)?;
        tracing::debug!("Generated post: {:?}", output_path);

        Ok(())
    }

    fn remove_post_page(&self, uid: &str) -> Result<()> {
        if !is_safe_segment(uid) {
            return Ok(());
        }
        let dir = self.blog.public_dir.join(post_path(uid));
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            tracing::info!("Removed unpublished post: {}", uid);
        }
        Ok(())
    }

    fn remove_stale_posts(&self, live: &[&str]) -> Result<()> {
        let post_dir = self.blog.public_dir.join("post");
        if !post_dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(&post_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let keep = name.to_str().is_some_and(|uid| live.contains(&uid));
            if !keep && entry.path().is_dir() {
                fs::remove_dir_all(entry.path())?;
                tracing::debug!("Removed stale post page {:?}", entry.path());
            }
        }
        Ok(())
    }

    /// Page served for unknown post URLs
    fn generate_not_found_page(&self) -> Result<()> {
        let context = self.create_base_context();
        let html = self.renderer.render("404.html", &context)?;
        write_file(&self.blog.public_dir.join("404.html"), &html)
    }

    /// Generate Atom feed from the fullest list state
    fn generate_atom_feed(&self, pages: &[PostsPagination]) -> Result<()> {
        let config = &self.blog.config;
        let output_path = self.blog.public_dir.join("atom.xml");
        if !config.feed.enable {
            if output_path.exists() {
                fs::remove_file(&output_path)?;
            }
            return Ok(());
        }

        let posts: &[PostSummary] = pages.last().map(|p| &p.results[..]).unwrap_or(&[]);
        let updated = posts
            .iter()
            .filter_map(|p| p.first_publication_date.as_deref())
            .filter_map(crate::helpers::parse_prismic_date)
            .max()
            .map(|d| date_xml(&d))
            .unwrap_or_else(|| date_xml(&chrono::Utc::now()));

        let mut feed = String::new();
        feed.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
        feed.push('\n');
        feed.push_str(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#);
        feed.push('\n');
        feed.push_str(&format!("  <title>{}</title>\n", escape_xml(&config.title)));
        feed.push_str(&format!(
            "  <link href=\"{}\" rel=\"self\"/>\n",
            escape_xml(&full_url_for(config, "atom.xml"))
        ));
        feed.push_str(&format!(
            "  <link href=\"{}\"/>\n",
            escape_xml(&full_url_for(config, "/"))
        ));
        feed.push_str(&format!("  <updated>{}</updated>\n", updated));
        feed.push_str(&format!(
            "  <id>{}</id>\n",
            escape_xml(&full_url_for(config, "/"))
        ));
        if !config.author.is_empty() {
            feed.push_str(&format!(
                "  <author><name>{}</name></author>\n",
                escape_xml(&config.author)
            ));
        }

        for post in posts.iter().take(config.feed.limit) {
            let link = escape_xml(&full_url_for(config, &post_path(&post.uid)));
            let published = publication_date_xml(post.first_publication_date.as_deref());

            feed.push_str("  <entry>\n");
            feed.push_str(&format!("    <title>{}</title>\n", escape_xml(&post.title)));
            feed.push_str(&format!("    <link href=\"{}\"/>\n", link));
            feed.push_str(&format!("    <id>{}</id>\n", link));
            if !published.is_empty() {
                feed.push_str(&format!("    <published>{}</published>\n", published));
                feed.push_str(&format!("    <updated>{}</updated>\n", published));
            }
            if !post.author.is_empty() {
                feed.push_str(&format!(
                    "    <author><name>{}</name></author>\n",
                    escape_xml(&post.author)
                ));
            }
            feed.push_str(&format!(
                "    <summary>{}</summary>\n",
                escape_xml(&strip_invalid_xml_chars(&post.subtitle))
            ));
            feed.push_str("  </entry>\n");
        }

        feed.push_str("</feed>\n");

        write_file(&output_path, &feed)?;
        tracing::info!("Generated atom.xml");

        Ok(())
    }

    /// Write the stylesheet and copy the static directory
    fn write_assets(&self) -> Result<()> {
        write_file(
            &self.blog.public_dir.join("css").join("style.css"),
            STYLESHEET,
        )?;

        let static_dir = &self.blog.static_dir;
        if !static_dir.exists() {
            return Ok(());
        }

        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest = self.blog.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)
                .with_context(|| format!("Failed to copy {:?} to {:?}", path, dest))?;
        }

        Ok(())
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create dir {:?}", parent))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))
}

/// A uid usable as a single path segment
fn is_safe_segment(uid: &str) -> bool {
    !uid.is_empty()
        && uid != "."
        && uid != ".."
        && uid
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Strip invalid XML control characters (except tab, newline, carriage return)
fn strip_invalid_xml_chars(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            c == '\t'
                || c == '\n'
                || c == '\r'
                || ('\u{0020}'..='\u{D7FF}').contains(&c)
                || ('\u{E000}'..='\u{FFFD}').contains(&c)
                || ('\u{10000}'..='\u{10FFFF}').contains(&c)
        })
        .collect()
}
