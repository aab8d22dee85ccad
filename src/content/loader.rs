//! Content loader - fetches posts from the Prismic repository

use anyhow::{Context as _, Result};
use std::time::Duration;

use super::{Post, PostSummary, PostsPagination};
use crate::prismic::{Document, Predicate, PrismicClient, QueryOptions, SearchResponse};
use crate::Blog;

/// Largest page size the search API accepts
const MAX_PAGE_SIZE: usize = 100;

/// Publication stamp of a post, used to detect edits between builds
#[derive(Debug, Clone, PartialEq)]
pub struct PostStamp {
    pub uid: String,
    pub last_publication_date: Option<String>,
}

/// Loads content from the configured repository
pub struct ContentLoader<'a> {
    blog: &'a Blog,
    client: PrismicClient,
}

impl<'a> ContentLoader<'a> {
    /// Create a loader for the blog's repository
    pub fn new(blog: &'a Blog) -> Result<Self> {
        let prismic = &blog.config.prismic;
        if prismic.endpoint.trim().is_empty() {
            anyhow::bail!(
                "No Prismic endpoint configured. Set prismic.endpoint in _config.yml or {}",
                crate::config::ENDPOINT_ENV
            );
        }

        let client = PrismicClient::new(
            &prismic.endpoint,
            prismic.access_token.clone(),
            Duration::from_secs(prismic.timeout.max(1)),
        )?;

        Ok(Self { blog, client })
    }

    /// The underlying API client
    pub fn client(&self) -> &PrismicClient {
        &self.client
    }

    fn document_type(&self) -> &str {
        &self.blog.config.prismic.document_type
    }

    /// Fetch the first batch of the post list
    pub async fn load_first_page(&self) -> Result<PostsPagination> {
        let prismic = &self.blog.config.prismic;
        let options = QueryOptions::default()
            .page_size(prismic.page_size.clamp(1, MAX_PAGE_SIZE))
            .orderings(prismic.orderings.clone());

        let response = self
            .client
            .query(&[Predicate::document_type(self.document_type())], &options)
            .await
            .context("Failed to fetch the post list")?;

        tracing::debug!(
            "First page: {} of {} posts",
            response.results_size,
            response.total_results_size
        );

        Ok(PostsPagination::new(
            summaries(&response.results),
            response.next_page,
        ))
    }

    /// Fetch the next batch and merge it into `pagination`.
    ///
    /// Returns `false` without fetching when there is no next page.
    pub async fn load_more(&self, pagination: &mut PostsPagination) -> Result<bool> {
        let Some(next_page) = pagination.next_page.clone() else {
            tracing::info!("No next page to load");
            return Ok(false);
        };

        let response = self
            .client
            .fetch_page(&next_page)
            .await
            .with_context(|| format!("Failed to load more posts from {}", next_page))?;

        let added = pagination.merge(summaries(&response.results), response.next_page);
        tracing::debug!("Loaded {} more posts (page {})", added, response.page);
        Ok(true)
    }

    /// Every state the list goes through while loading more until exhausted.
    ///
    /// The first element is the initial list; each following element is the
    /// list after one more "load more". Stops after `max_pages` states.
    pub async fn load_all_pages(&self) -> Result<Vec<PostsPagination>> {
        let max_pages = self.blog.config.prismic.max_pages.max(1);
        let mut current = self.load_first_page().await?;
        let mut states = vec![current.clone()];

        while current.has_more() {
            if states.len() >= max_pages {
                tracing::warn!(
                    "Stopped after {} list pages (prismic.max_pages); older posts are not listed",
                    max_pages
                );
                break;
            }
            self.load_more(&mut current).await?;
            states.push(current.clone());
        }

        Ok(states)
    }

    /// Uid and last publication date of every post.
    ///
    /// Walks result pages by number, at most `max_pages` of them.
    pub async fn load_post_uids(&self) -> Result<Vec<PostStamp>> {
        let max_pages = self.blog.config.prismic.max_pages.max(1);
        let predicates = [Predicate::document_type(self.document_type())];
        let options = QueryOptions::default()
            .page_size(MAX_PAGE_SIZE)
            .fetch(format!("{}.uid", self.document_type()));

        let mut stamps = Vec::new();
        let mut page = 1;
        loop {
            let response = self
                .client
                .query(&predicates, &options.clone().page(page))
                .await
                .with_context(|| format!("Failed to fetch post uids (page {})", page))?;
            stamps.extend(stamps_of(&response));

            if response.next_page.is_none() {
                break;
            }
            if page >= max_pages {
                tracing::warn!(
                    "Stopped listing post uids after {} pages (prismic.max_pages)",
                    max_pages
                );
                break;
            }
            page += 1;
        }

        Ok(stamps)
    }

    /// Fetch a full post, `None` when no post has this uid
    pub async fn load_post(&self, uid: &str) -> Result<Option<Post>> {
        let doc = self
            .client
            .get_by_uid(self.document_type(), uid)
            .await
            .with_context(|| format!("Failed to fetch post {}", uid))?;

        match doc {
            Some(doc) => Ok(Some(Post::from_document(&doc)?)),
            None => Ok(None),
        }
    }
}

/// Map search results, skipping documents that cannot be listed
fn summaries(docs: &[Document]) -> Vec<PostSummary> {
    docs.iter()
        .filter_map(|doc| match PostSummary::from_document(doc) {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!("Skipping document {}: {}", doc.id, e);
                None
            }
        })
        .collect()
}

fn stamps_of(response: &SearchResponse) -> Vec<PostStamp> {
    response
        .results
        .iter()
        .filter_map(|doc| {
            Some(PostStamp {
                uid: doc.uid.clone().filter(|uid| !uid.is_empty())?,
                last_publication_date: doc.last_publication_date.clone(),
            })
        })
        .collect()
}
