//! Prismic structured text ("rich text") model and HTML serializer
//!
//! A rich text field is a list of blocks. Text blocks carry their plain text
//! plus a list of spans (bold, italic, links, labels) addressed by UTF-16
//! offsets, the same offsets a browser would use.

use serde::{Deserialize, Serialize};

use crate::helpers::escape_html;

/// One block of a rich text field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RichTextBlock {
    #[serde(rename = "heading1")]
    Heading1(TextBlock),
    #[serde(rename = "heading2")]
    Heading2(TextBlock),
    #[serde(rename = "heading3")]
    Heading3(TextBlock),
    #[serde(rename = "heading4")]
    Heading4(TextBlock),
    #[serde(rename = "heading5")]
    Heading5(TextBlock),
    #[serde(rename = "heading6")]
    Heading6(TextBlock),
    #[serde(rename = "paragraph")]
    Paragraph(TextBlock),
    #[serde(rename = "preformatted")]
    Preformatted(TextBlock),
    #[serde(rename = "list-item")]
    ListItem(TextBlock),
    #[serde(rename = "o-list-item")]
    OListItem(TextBlock),
    #[serde(rename = "image")]
    Image(ImageBlock),
    #[serde(rename = "embed")]
    Embed(EmbedBlock),
    #[serde(other)]
    Unsupported,
}

impl RichTextBlock {
    /// The block's text, if it is a text block
    pub fn text(&self) -> Option<&str> {
        self.text_block().map(|b| b.text.as_str())
    }

    fn text_block(&self) -> Option<&TextBlock> {
        match self {
            RichTextBlock::Heading1(b)
            | RichTextBlock::Heading2(b)
            | RichTextBlock::Heading3(b)
            | RichTextBlock::Heading4(b)
            | RichTextBlock::Heading5(b)
            | RichTextBlock::Heading6(b)
            | RichTextBlock::Paragraph(b)
            | RichTextBlock::Preformatted(b)
            | RichTextBlock::ListItem(b)
            | RichTextBlock::OListItem(b) => Some(b),
            _ => None,
        }
    }

    /// Shorthand for a paragraph without spans
    pub fn paragraph(text: impl Into<String>) -> Self {
        RichTextBlock::Paragraph(TextBlock::new(text))
    }
}

/// Text content of a block
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    /// Block-level label, rendered as a CSS class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl TextBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            spans: Vec::new(),
            label: None,
        }
    }

    pub fn with_span(mut self, start: usize, end: usize, kind: SpanKind) -> Self {
        self.spans.push(Span { start, end, kind });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default, rename = "linkTo")]
    pub link_to: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedBlock {
    #[serde(default)]
    pub oembed: serde_json::Value,
}

/// An inline annotation over `[start, end)` of a block's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSpan", into = "RawSpan")]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink(Link),
    Label(String),
    /// Span type this renderer does not know, kept as a plain `<span>`
    Other(String),
}

/// Target of a hyperlink span or an image link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "link_type")]
pub enum Link {
    Web {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
    Document(DocumentLink),
    Media {
        url: String,
    },
    #[serde(other)]
    Any,
}

/// Link to another document of the repository
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentLink {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default, rename = "type")]
    pub doc_type: String,
    #[serde(default, rename = "isBroken")]
    pub is_broken: bool,
}

/// Wire shape of a span
#[derive(Serialize, Deserialize)]
struct RawSpan {
    start: usize,
    end: usize,
    #[serde(rename = "type")]
    span_type: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    data: serde_json::Value,
}

impl From<RawSpan> for Span {
    fn from(raw: RawSpan) -> Self {
        let kind = match raw.span_type.as_str() {
            "strong" => SpanKind::Strong,
            "em" => SpanKind::Em,
            "hyperlink" => match serde_json::from_value::<Link>(raw.data) {
                Ok(link) => SpanKind::Hyperlink(link),
                Err(e) => {
                    tracing::warn!("Ignoring malformed hyperlink span: {}", e);
                    SpanKind::Other("hyperlink".to_string())
                }
            },
            "label" => SpanKind::Label(
                raw.data
                    .get("label")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            ),
            other => SpanKind::Other(other.to_string()),
        };
        Span {
            start: raw.start,
            end: raw.end,
            kind,
        }
    }
}

impl From<Span> for RawSpan {
    fn from(span: Span) -> Self {
        let (span_type, data) = match span.kind {
            SpanKind::Strong => ("strong".to_string(), serde_json::Value::Null),
            SpanKind::Em => ("em".to_string(), serde_json::Value::Null),
            SpanKind::Hyperlink(link) => (
                "hyperlink".to_string(),
                serde_json::to_value(link).unwrap_or_default(),
            ),
            SpanKind::Label(label) => ("label".to_string(), serde_json::json!({ "label": label })),
            SpanKind::Other(name) => (name, serde_json::Value::Null),
        };
        RawSpan {
            start: span.start,
            end: span.end,
            span_type,
            data,
        }
    }
}

/// Turns links to other documents into URLs
pub trait LinkResolver {
    fn resolve(&self, link: &DocumentLink) -> String;
}

impl<F> LinkResolver for F
where
    F: Fn(&DocumentLink) -> String,
{
    fn resolve(&self, link: &DocumentLink) -> String {
        self(link)
    }
}

/// Render blocks to HTML
pub fn as_html(blocks: &[RichTextBlock], resolver: &dyn LinkResolver) -> String {
    let mut html = String::new();
    let mut i = 0;

    while i < blocks.len() {
        match &blocks[i] {
            RichTextBlock::ListItem(_) | RichTextBlock::OListItem(_) => {
                let ordered = matches!(blocks[i], RichTextBlock::OListItem(_));
                let tag = if ordered { "ol" } else { "ul" };
                html.push_str(&format!("<{}>", tag));
                while i < blocks.len() && is_list_item(&blocks[i], ordered) {
                    if let Some(block) = blocks[i].text_block() {
                        html.push_str(&text_element("li", block, resolver));
                    }
                    i += 1;
                }
                html.push_str(&format!("</{}>", tag));
                continue;
            }
            RichTextBlock::Heading1(b) => html.push_str(&text_element("h1", b, resolver)),
            RichTextBlock::Heading2(b) => html.push_str(&text_element("h2", b, resolver)),
            RichTextBlock::Heading3(b) => html.push_str(&text_element("h3", b, resolver)),
            RichTextBlock::Heading4(b) => html.push_str(&text_element("h4", b, resolver)),
            RichTextBlock::Heading5(b) => html.push_str(&text_element("h5", b, resolver)),
            RichTextBlock::Heading6(b) => html.push_str(&text_element("h6", b, resolver)),
            RichTextBlock::Paragraph(b) => html.push_str(&text_element("p", b, resolver)),
            RichTextBlock::Preformatted(b) => html.push_str(&text_element("pre", b, resolver)),
            RichTextBlock::Image(image) => html.push_str(&image_element(image, resolver)),
            RichTextBlock::Embed(embed) => html.push_str(&embed_element(embed)),
            RichTextBlock::Unsupported => {}
        }
        i += 1;
    }

    html
}

/// Plain text of all text blocks, separated by single spaces
pub fn as_text(blocks: &[RichTextBlock]) -> String {
    blocks
        .iter()
        .filter_map(RichTextBlock::text)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_list_item(block: &RichTextBlock, ordered: bool) -> bool {
    match block {
        RichTextBlock::ListItem(_) => !ordered,
        RichTextBlock::OListItem(_) => ordered,
        _ => false,
    }
}

fn text_element(tag: &str, block: &TextBlock, resolver: &dyn LinkResolver) -> String {
    let class = match &block.label {
        Some(label) => format!(r#" class="{}""#, escape_html(label)),
        None => String::new(),
    };
    format!(
        "<{tag}{class}>{}</{tag}>",
        render_spans(&block.text, &block.spans, resolver)
    )
}

fn image_element(image: &ImageBlock, resolver: &dyn LinkResolver) -> String {
    let mut img = format!(
        r#"<img src="{}" alt="{}""#,
        escape_html(&image.url),
        escape_html(image.alt.as_deref().unwrap_or_default())
    );
    if let Some(copyright) = &image.copyright {
        img.push_str(&format!(r#" copyright="{}""#, escape_html(copyright)));
    }
    img.push_str(" />");

    let inner = match &image.link_to {
        Some(link) => format!("{}{}</a>", link_open_tag(link, resolver), img),
        None => img,
    };
    format!(r#"<p class="block-img">{}</p>"#, inner)
}

fn embed_element(embed: &EmbedBlock) -> String {
    let field = |name: &str| {
        embed
            .oembed
            .get(name)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    format!(
        r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
        escape_html(&field("embed_url")),
        escape_html(&field("type")),
        escape_html(&field("provider_name").to_lowercase()),
        field("html")
    )
}

fn link_open_tag(link: &Link, resolver: &dyn LinkResolver) -> String {
    match link {
        Link::Web {
            url,
            target: Some(target),
        } => format!(
            r#"<a href="{}" target="{}" rel="noopener">"#,
            escape_html(url),
            escape_html(target)
        ),
        Link::Web { url, target: None } | Link::Media { url } => {
            format!(r#"<a href="{}">"#, escape_html(url))
        }
        Link::Document(doc) => format!(r#"<a href="{}">"#, escape_html(&resolver.resolve(doc))),
        Link::Any => "<a>".to_string(),
    }
}

fn open_tag(kind: &SpanKind, resolver: &dyn LinkResolver) -> String {
    match kind {
        SpanKind::Strong => "<strong>".to_string(),
        SpanKind::Em => "<em>".to_string(),
        SpanKind::Hyperlink(link) => link_open_tag(link, resolver),
        SpanKind::Label(label) => format!(r#"<span class="{}">"#, escape_html(label)),
        SpanKind::Other(_) => "<span>".to_string(),
    }
}

fn close_tag(kind: &SpanKind) -> &'static str {
    match kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink(_) => "</a>",
        SpanKind::Label(_) | SpanKind::Other(_) => "</span>",
    }
}

/// Render text with its spans as properly nested HTML.
///
/// The text is cut at every span boundary. For each segment the covering
/// spans are ordered outermost first; the open-tag stack is reconciled with
/// that order, closing and reopening spans that overlap without nesting.
fn render_spans(text: &str, spans: &[Span], resolver: &dyn LinkResolver) -> String {
    let units: Vec<u16> = text.encode_utf16().collect();
    let len = units.len();

    let mut spans: Vec<(usize, &Span)> = spans
        .iter()
        .filter(|s| s.start < s.end.min(len))
        .enumerate()
        .collect();
    spans.sort_by(|(ia, a), (ib, b)| {
        a.start
            .cmp(&b.start)
            .then(b.end.cmp(&a.end))
            .then(ia.cmp(ib))
    });

    let mut bounds: Vec<usize> = vec![0, len];
    for (_, span) in &spans {
        bounds.push(span.start);
        bounds.push(span.end.min(len));
    }
    bounds.sort_unstable();
    bounds.dedup();

    let mut html = String::new();
    let mut stack: Vec<usize> = Vec::new();

    for window in bounds.windows(2) {
        let (from, to) = (window[0], window[1]);
        let wanted: Vec<usize> = spans
            .iter()
            .enumerate()
            .filter(|(_, (_, s))| s.start <= from && s.end.min(len) >= to)
            .map(|(pos, _)| pos)
            .collect();

        let common = stack
            .iter()
            .zip(wanted.iter())
            .take_while(|(a, b)| a == b)
            .count();
        while stack.len() > common {
            if let Some(pos) = stack.pop() {
                html.push_str(close_tag(&spans[pos].1.kind));
            }
        }
        for &pos in &wanted[common..] {
            html.push_str(&open_tag(&spans[pos].1.kind, resolver));
            stack.push(pos);
        }

        let segment = String::from_utf16_lossy(&units[from..to]);
        html.push_str(&escape_html(&segment).replace('\n', "<br />"));
    }

    while let Some(pos) = stack.pop() {
        html.push_str(close_tag(&spans[pos].1.kind));
    }

    html
}
