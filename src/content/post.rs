//! Post models built from Prismic documents

use anyhow::{Context as _, Result};
use serde::{Deserialize, Deserializer, Serialize};

use super::richtext::{self, RichTextBlock};
use crate::prismic::Document;

/// A post as shown in the list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: String,
    pub first_publication_date: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

impl PostSummary {
    /// Map a search result to a list entry
    pub fn from_document(doc: &Document) -> Result<Self> {
        Ok(Self {
            uid: require_uid(doc)?,
            first_publication_date: doc.first_publication_date.clone(),
            title: text_value(doc, "title"),
            subtitle: text_value(doc, "subtitle"),
            author: text_value(doc, "author"),
        })
    }
}

/// A full post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub uid: String,
    pub first_publication_date: Option<String>,
    pub last_publication_date: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub banner: Banner,
    pub author: String,
    pub content: Vec<ContentGroup>,
}

impl Post {
    /// Map a document with the full `posts` data shape
    pub fn from_document(doc: &Document) -> Result<Self> {
        let uid = require_uid(doc)?;

        let banner = match doc.data.get("banner") {
            Some(value) if !value.is_null() => serde_json::from_value(value.clone())
                .with_context(|| format!("Invalid banner in post {}", uid))?,
            _ => Banner::default(),
        };

        let content = match doc.data.get("content") {
            Some(value) if !value.is_null() => serde_json::from_value(value.clone())
                .with_context(|| format!("Invalid content in post {}", uid))?,
            _ => Vec::new(),
        };

        Ok(Self {
            first_publication_date: doc.first_publication_date.clone(),
            last_publication_date: doc.last_publication_date.clone(),
            title: text_value(doc, "title"),
            subtitle: text_value(doc, "subtitle"),
            author: text_value(doc, "author"),
            banner,
            content,
            uid,
        })
    }

    /// The list entry for this post
    pub fn summary(&self) -> PostSummary {
        PostSummary {
            uid: self.uid.clone(),
            first_publication_date: self.first_publication_date.clone(),
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            author: self.author.clone(),
        }
    }
}

/// Header image of a post
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Banner {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

/// One section of a post: a heading followed by rich text
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentGroup {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub heading: String,
    #[serde(default)]
    pub body: Vec<RichTextBlock>,
}

fn require_uid(doc: &Document) -> Result<String> {
    doc.uid
        .clone()
        .filter(|uid| !uid.is_empty())
        .with_context(|| format!("Document {} has no uid", doc.id))
}

/// Read a text field that may be stored as key text or as rich text
fn text_value(doc: &Document, field: &str) -> String {
    match doc.data.get(field) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(value @ serde_json::Value::Array(_)) => {
            serde_json::from_value::<Vec<RichTextBlock>>(value.clone())
                .map(|blocks| richtext::as_text(&blocks))
                .unwrap_or_default()
        }
        _ => String::new(),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::post_doc;

    fn document(value: serde_json::Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_summary_from_document() {
        let doc = document(post_doc(
            "como-utilizar-hooks",
            "Como utilizar Hooks",
            "2021-03-15T19:25:28+0000",
        ));
        let summary = PostSummary::from_document(&doc).unwrap();
        assert_eq!(summary.uid, "como-utilizar-hooks");
        assert_eq!(summary.title, "Como utilizar Hooks");
        assert_eq!(summary.subtitle, "About Como utilizar Hooks");
        assert_eq!(summary.author, "Joseph Oliveira");
        assert_eq!(
            summary.first_publication_date.as_deref(),
            Some("2021-03-15T19:25:28+0000")
        );
    }

    #[test]
    fn test_post_from_document() {
        let doc = document(post_doc("hooks", "Hooks", "2021-03-15T19:25:28+0000"));
        let post = Post::from_document(&doc).unwrap();
        assert_eq!(post.banner.url, "https://images.prismic.io/hooks.png");
        assert_eq!(post.content.len(), 2);
        assert_eq!(post.content[0].heading, "Proin et varius");
        assert_eq!(post.content[1].body.len(), 2);
        assert_eq!(post.summary().title, "Hooks");
    }

    #[test]
    fn test_missing_fields_default() {
        let doc = document(serde_json::json!({
            "id": "X1",
            "uid": "bare",
            "type": "posts",
            "first_publication_date": null,
            "last_publication_date": null,
            "data": {
                "title": [{"type": "heading1", "text": "Rich title", "spans": []}],
                "banner": {"url": null},
                "content": [{"heading": null, "body": []}]
            }
        }));
        let post = Post::from_document(&doc).unwrap();
        assert_eq!(post.title, "Rich title");
        assert_eq!(post.author, "");
        assert_eq!(post.banner.url, "");
        assert_eq!(post.content[0].heading, "");
        assert!(post.first_publication_date.is_none());
    }

    #[test]
    fn test_uid_required() {
        let doc = document(serde_json::json!({
            "id": "X2",
            "uid": null,
            "type": "posts",
            "first_publication_date": null,
            "last_publication_date": null,
            "data": {}
        }));
        let err = PostSummary::from_document(&doc).unwrap_err();
        assert!(err.to_string().contains("X2"));
    }
}
