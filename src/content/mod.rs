//! Content module - blog models, rich text and the fetch adapter

pub mod loader;
mod pagination;
mod post;
pub mod reading_time;
pub mod richtext;

pub use loader::{ContentLoader, PostStamp};
pub use pagination::PostsPagination;
pub use post::{Banner, ContentGroup, Post, PostSummary};
pub use reading_time::{reading_time, word_count};
pub use richtext::{as_html, as_text, LinkResolver, RichTextBlock};
