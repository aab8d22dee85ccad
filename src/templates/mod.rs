//! Built-in spacetraveling theme using the Tera template engine
//!
//! Templates and the stylesheet are embedded in the binary.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::helpers;

/// Stylesheet written to `css/style.css`
pub const STYLESHEET: &str = include_str!("spacetraveling/style.css");

/// Template renderer with the embedded theme
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // CMS text goes through escaping; rendered rich text is marked `safe`
        tera.autoescape_on(vec![".html"]);
        tera.set_escape_fn(helpers::escape_html);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("spacetraveling/layout.html")),
            ("index.html", include_str!("spacetraveling/index.html")),
            ("post.html", include_str!("spacetraveling/post.html")),
            ("404.html", include_str!("spacetraveling/404.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("spacetraveling/partials/header.html"),
            ),
            (
                "partials/post_info.html",
                include_str!("spacetraveling/partials/post_info.html"),
            ),
            (
                "partials/load_more.html",
                include_str!("spacetraveling/partials/load_more.html"),
            ),
        ])?;

        tera.register_filter("truncate_chars", truncate_chars_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };

    Ok(tera::Value::String(helpers::truncate_chars(
        &s, length, &omission,
    )))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub home_url: String,
    pub logo_url: String,
    pub css_url: String,
    /// Empty when the feed is disabled
    pub feed_url: String,
}

/// A post in the list
#[derive(Debug, Clone, Serialize)]
pub struct PostListItem {
    pub uid: String,
    pub path: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: String,
    pub date_iso: String,
}

/// A full post page
#[derive(Debug, Clone, Serialize)]
pub struct PostPageData {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: String,
    pub date_iso: String,
    pub reading_time: usize,
    pub banner_url: String,
    pub banner_alt: String,
    pub sections: Vec<SectionData>,
}

/// One heading with its rendered body
#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    pub heading: String,
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationData {
    /// 1-based list page number
    pub current: usize,
    pub total: usize,
    /// Link to the next list state, empty on the last one
    pub next_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> SiteData {
        SiteData {
            title: "spacetraveling".to_string(),
            description: "Blog".to_string(),
            author: String::new(),
            language: "pt-BR".to_string(),
            home_url: "/".to_string(),
            logo_url: "/Logo.svg".to_string(),
            css_url: "/css/style.css".to_string(),
            feed_url: String::new(),
        }
    }

    fn labels() -> HashMap<String, String> {
        crate::i18n::I18n::new("pt-BR").get_all_translations()
    }

    #[test]
    fn test_render_index() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = Context::new();
        context.insert("site", &site());
        context.insert("i18n", &labels());
        context.insert("show_reading_time", &false);
        context.insert(
            "posts",
            &vec![PostListItem {
                uid: "hooks".to_string(),
                path: "/post/hooks/".to_string(),
                title: "Hooks <3".to_string(),
                subtitle: "Sub".to_string(),
                author: "Joseph".to_string(),
                date: "15 mar 2021".to_string(),
                date_iso: "2021-03-15T19:25:28+00:00".to_string(),
            }],
        );
        context.insert(
            "pagination",
            &PaginationData {
                current: 1,
                total: 2,
                next_link: "/page/2/#next".to_string(),
            },
        );

        let html = renderer.render("index.html", &context).unwrap();
        assert!(html.contains(r#"<a href="/post/hooks/"><h1>Hooks &lt;3</h1></a>"#));
        assert!(html.contains("15 mar 2021"));
        assert!(html.contains("Carregar mais posts"));
        assert!(html.contains(r#"href="/page/2/#next""#));
        assert!(!html.contains("reading-time"));
    }

    #[test]
    fn test_render_post() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = Context::new();
        context.insert("site", &site());
        context.insert("i18n", &labels());
        context.insert("show_reading_time", &true);
        context.insert(
            "post",
            &PostPageData {
                uid: "hooks".to_string(),
                title: "Hooks".to_string(),
                subtitle: "Sub".to_string(),
                author: "Joseph".to_string(),
                date: "15 mar 2021".to_string(),
                date_iso: String::new(),
                reading_time: 4,
                banner_url: "https://images.prismic.io/b.png".to_string(),
                banner_alt: String::new(),
                sections: vec![SectionData {
                    heading: "Intro".to_string(),
                    html: "<p><strong>Hi</strong></p>".to_string(),
                }],
            },
        );

        let html = renderer.render("post.html", &context).unwrap();
        assert!(html.contains("<title>Hooks | spacetraveling</title>"));
        assert!(html.contains("4 min"));
        assert!(html.contains("<p><strong>Hi</strong></p>"));
        assert!(html.contains(r#"src="https://images.prismic.io/b.png""#));
    }

    #[test]
    fn test_truncate_filter() {
        let mut args = HashMap::new();
        args.insert("length".to_string(), tera::Value::from(3));
        let value = truncate_chars_filter(&tera::Value::from("abcdef"), &args).unwrap();
        assert_eq!(value, tera::Value::from("abc..."));
    }
}
