//! Helper functions for rendering
//!
//! Date formatting, HTML escaping and URL generation shared by the
//! generator and the templates.

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
