//! Prismic REST API v2 client

mod client;
mod error;
mod predicate;
mod types;

pub use client::{PrismicClient, QueryOptions};
pub use error::PrismicError;
pub use predicate::{render_query, Predicate, PredicateValue};
pub use types::{ApiInfo, ApiRef, Document, SearchResponse};
